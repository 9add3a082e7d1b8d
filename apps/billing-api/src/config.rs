//! Billing API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use tavola_core::TaxRate;

/// Billing API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP server port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub db_max_connections: u32,

    /// Tax percentage used when a create request omits `tax_rate`
    pub default_tax_rate: f64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            http_port: 8080,
            database_path: "./tavola.db".to_string(),
            db_max_connections: 5,
            default_tax_rate: 0.0,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ApiConfig::default();

        let config = ApiConfig {
            http_port: parse_or(&lookup, "HTTP_PORT", defaults.http_port)?,

            database_path: lookup("DATABASE_PATH")
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(defaults.database_path),

            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.db_max_connections)?,

            default_tax_rate: parse_or(&lookup, "DEFAULT_TAX_RATE", defaults.default_tax_rate)?,
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }

        if TaxRate::try_from_percentage(config.default_tax_rate).is_err() {
            return Err(ConfigError::InvalidValue("DEFAULT_TAX_RATE".to_string()));
        }

        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.database_path, "./tavola.db");
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.default_tax_rate, 0.0);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("HTTP_PORT", "9000"),
            ("DATABASE_PATH", "/tmp/bills.db"),
            ("DEFAULT_TAX_RATE", "8.25"),
        ])
        .unwrap();
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.database_path, "/tmp/bills.db");
        assert_eq!(config.default_tax_rate, 8.25);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("HTTP_PORT", "eighty")]),
            Err(ConfigError::InvalidValue(key)) if key == "HTTP_PORT"
        ));
        assert!(load(&[("DEFAULT_TAX_RATE", "-1")]).is_err());
        assert!(load(&[("DEFAULT_TAX_RATE", "8.12345")]).is_err());
        assert_eq!(load(&[("DEFAULT_TAX_RATE", "8.125")]).unwrap().default_tax_rate, 8.125);
        assert!(load(&[("DB_MAX_CONNECTIONS", "0")]).is_err());
    }
}
