//! Configuration management using Figment
//!
//! Sources, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. `modelrest.toml` in the working directory, when present
//! 3. `MODELREST_`-prefixed environment variables (`MODELREST_PORT=9000`)

use std::net::SocketAddr;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use tokio::net::lookup_host;

use crate::error::ServerError;

/// Configuration file read from the working directory.
pub const CONFIG_FILE: &str = "modelrest.toml";

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "MODELREST_";

/// Server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind, as an IP literal or a resolvable hostname
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// `EnvFilter` directive, e.g. `info` or `modelrest=debug,tower_http=info`
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text
    pub json_logs: bool,
    /// Page size used when a request gives `page` without `page_size`
    pub default_page_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            json_logs: false,
            default_page_size: 10,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from the default sources.
    pub fn load() -> Result<Self, ServerError> {
        Self::from_figment(Self::figment())
    }

    /// The layered provider stack used by [`ServerConfig::load`].
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Extracts and checks configuration from an arbitrary figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ServerError> {
        let config: Self = figment.extract()?;

        if config.default_page_size == 0 {
            return Err(ServerError::InvalidConfig(
                "default_page_size must be greater than zero".to_string(),
            ));
        }

        Ok(config)
    }

    /// Resolves the address the server binds to. Hostnames take their first resolved address.
    pub async fn resolve_addr(&self) -> Result<SocketAddr, ServerError> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(ServerError::InvalidConfig("host must not be empty".to_string()));
        }

        let invalid = |reason: String| {
            ServerError::InvalidConfig(format!("cannot resolve '{host}:{}': {reason}", self.port))
        };

        lookup_host((host, self.port))
            .await
            .map_err(|e| invalid(e.to_string()))?
            .next()
            .ok_or_else(|| invalid("no addresses found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_toml(toml: &str) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(ServerConfig::default()))
            .merge(Toml::string(toml))
    }

    #[tokio::test]
    async fn defaults_apply_without_sources() {
        let config =
            ServerConfig::from_figment(Figment::from(Serialized::defaults(ServerConfig::default())))
                .unwrap();

        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.resolve_addr().await.unwrap().to_string(), "127.0.0.1:8080");
    }

    #[tokio::test]
    async fn hostnames_resolve() {
        let config = ServerConfig::from_figment(with_toml(r#"host = "localhost""#)).unwrap();

        let addr = config.resolve_addr().await.unwrap();

        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = ServerConfig::from_figment(with_toml(
            r#"
                port = 9090
                log_level = "debug"
                json_logs = true
            "#,
        ))
        .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.log_level, "debug");
        assert!(config.json_logs);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.default_page_size, 10);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let result = ServerConfig::from_figment(with_toml("default_page_size = 0"));

        assert!(matches!(result, Err(ServerError::InvalidConfig(_))));
    }

    #[test]
    fn wrong_type_is_a_config_error() {
        let result = ServerConfig::from_figment(with_toml(r#"port = "eighty""#));

        assert!(matches!(result, Err(ServerError::Config(_))));
    }

    #[tokio::test]
    async fn empty_host_is_rejected() {
        let config = ServerConfig {
            host: " ".to_string(),
            ..ServerConfig::default()
        };

        assert!(matches!(config.resolve_addr().await, Err(ServerError::InvalidConfig(_))));
    }
}
