//! Bridge credential resolution and persistence.

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::debug;

/// Environment variable consulted for the bridge credential.
pub const CREDENTIAL_ENV: &str = "HUE_USER";

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("no bridge credential found: pass --user, set {CREDENTIAL_ENV}, or run --register")]
    Missing,
}

/// Resolve the bridge credential.
///
/// Precedence, first non-empty wins: explicit value, environment value,
/// contents of the key file. A key file that cannot be read is treated as
/// absent, not as an error.
pub fn resolve(
    explicit: Option<&str>,
    env_value: Option<&str>,
    key_path: Option<&Path>,
) -> Result<String, CredentialError> {
    if let Some(user) = explicit.filter(|u| !u.is_empty()) {
        return Ok(user.to_string());
    }

    if let Some(user) = env_value.filter(|u| !u.is_empty()) {
        debug!("using credential from environment");
        return Ok(user.to_string());
    }

    if let Some(path) = key_path {
        match fs::read_to_string(path) {
            Ok(contents) if !contents.is_empty() => {
                debug!(path = %path.display(), "using credential from key file");
                return Ok(contents);
            }
            Ok(_) => debug!(path = %path.display(), "key file is empty"),
            Err(e) => debug!(path = %path.display(), error = %e, "could not read key file"),
        }
    }

    Err(CredentialError::Missing)
}

/// Persist a credential, readable and writable by the owner only.
pub fn save(path: &Path, credential: &str) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(credential.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_value_wins() {
        let dir = tempfile::tempdir().unwrap();
        let key_file = dir.path().join("key");
        fs::write(&key_file, "Z").unwrap();

        let user = resolve(Some("X"), Some("Y"), Some(&key_file)).unwrap();
        assert_eq!(user, "X");
    }

    #[test]
    fn empty_explicit_falls_through_to_environment() {
        let dir = tempfile::tempdir().unwrap();
        let key_file = dir.path().join("key");
        fs::write(&key_file, "Z").unwrap();

        let user = resolve(Some(""), Some("Y"), Some(&key_file)).unwrap();
        assert_eq!(user, "Y");
    }

    #[test]
    fn key_file_used_last() {
        let dir = tempfile::tempdir().unwrap();
        let key_file = dir.path().join("key");
        fs::write(&key_file, "Z").unwrap();

        let user = resolve(None, None, Some(&key_file)).unwrap();
        assert_eq!(user, "Z");
    }

    #[test]
    fn unreadable_key_file_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");

        let result = resolve(None, None, Some(&missing));
        assert!(matches!(result, Err(CredentialError::Missing)));
    }

    #[test]
    fn all_sources_absent_fails() {
        assert!(matches!(
            resolve(None, None, None),
            Err(CredentialError::Missing)
        ));
    }

    #[test]
    fn save_then_resolve_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let key_file = dir.path().join("key");

        save(&key_file, "abcdef0123").unwrap();
        let user = resolve(None, None, Some(&key_file)).unwrap();
        assert_eq!(user, "abcdef0123");
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let key_file = dir.path().join("key");
        save(&key_file, "abcdef0123").unwrap();

        let mode = fs::metadata(&key_file).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
