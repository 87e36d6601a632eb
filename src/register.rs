//! One-time credential registration against the bridge.
//!
//! Creating a bridge user requires the operator to press the physical link
//! button, so the bridge is polled with a short fixed interval until it
//! accepts the request, bounded by an overall deadline.

use std::time::Duration;

use tracing::{debug, info};

use crate::bridge::{BridgeClient, BridgeError};

/// Application identifier registered with the bridge.
pub const DEVICE_TYPE: &str = "hue-exporter-prometheus";

/// How long to wait between attempts while the link button is unpressed.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("registration deadline exceeded, try again later")]
    TimedOut,
    #[error("registration failed: {0}")]
    Bridge(#[from] BridgeError),
}

/// Obtain a fresh credential from the bridge.
///
/// Retries every [`RETRY_INTERVAL`] while the bridge reports the link
/// button unpressed. Any other bridge error is terminal. When `deadline`
/// elapses first, returns [`RegisterError::TimedOut`] and the in-flight
/// attempt is cancelled.
pub async fn register<C: BridgeClient>(
    client: &C,
    deadline: Duration,
) -> Result<String, RegisterError> {
    match tokio::time::timeout(deadline, attempt_loop(client)).await {
        Ok(result) => result,
        Err(_) => Err(RegisterError::TimedOut),
    }
}

async fn attempt_loop<C: BridgeClient>(client: &C) -> Result<String, RegisterError> {
    loop {
        match client.create_user(DEVICE_TYPE).await {
            Ok(user) => {
                debug!("bridge accepted registration");
                return Ok(user);
            }
            Err(BridgeError::ButtonNotPressed) => {
                info!("waiting for link button, press the button on the bridge");
                tokio::time::sleep(RETRY_INTERVAL).await;
            }
            Err(e) => return Err(RegisterError::Bridge(e)),
        }
    }
}
