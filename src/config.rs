//! Exporter configuration assembled from the command line.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Settings for the metrics exposition endpoint.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Address the HTTP server listens on.
    pub listen: SocketAddr,
    /// Path for the metrics endpoint.
    pub path: String,
}

impl ExporterConfig {
    /// Build the exposition settings from the CLI flags.
    pub fn new(port: u16, path: &str) -> Result<Self, ConfigError> {
        let config = Self {
            listen: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
            path: path.to_string(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "Metrics path must start with /".to_string(),
            ));
        }

        Ok(())
    }
}
