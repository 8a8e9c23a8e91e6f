//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::{config::ServerConfig, error::ServerError};

/// Installs the global tracing subscriber.
///
/// An unparseable `log_level` falls back to `info`. Fails if a subscriber is already set.
pub fn init_tracing(config: &ServerConfig) -> Result<(), ServerError> {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
    };

    installed.map_err(|e| ServerError::Telemetry(e.to_string()))
}
