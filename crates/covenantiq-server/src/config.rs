//! Server configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use covenantiq_traits::config::EngineConfig;

use crate::error::ServerError;

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// JSON seed file with loans and their covenants
    pub data_file: Option<String>,

    /// CSV file of covenant measurements
    pub measurements_file: Option<String>,

    /// Engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_file: None,
            measurements_file: None,
            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ServerError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ServerError> {
        let config: Self = toml::from_str(content)?;
        config.engine.validate().map_err(ServerError::Config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_toml("").unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.data_file.is_none());
        assert_eq!(config.engine.alerts.horizon_days, 90);
    }

    #[test]
    fn test_nested_engine_section() {
        let config = ServerConfig::from_toml(
            r#"
            port = 9000
            data_file = "data/portfolio.json"

            [engine]
            refresh_interval_secs = 0

            [engine.alerts]
            high_days = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.data_file.as_deref(), Some("data/portfolio.json"));
        assert_eq!(config.engine.refresh_interval_secs, 0);
        assert_eq!(config.engine.alerts.high_days, 7);
        assert_eq!(config.engine.alerts.medium_days, 45);
    }

    #[test]
    fn test_invalid_engine_section_rejected() {
        let err = ServerConfig::from_toml(
            r#"
            [engine.alerts]
            high_days = 60
            medium_days = 30
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }
}
