//! API configuration module.
//!
//! Configuration is loaded from environment variables (optionally seeded
//! from a `.env` file by `main`) with fallback to defaults.

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use stockconnect_core::validation::DEFAULT_COUNTRY_CODE;
use stockconnect_core::{CancellationMode, OrderPolicy, StockPolicy};
use stockconnect_db::DbConfig;
use stockconnect_notify::NotifyConfig;

/// API server configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ApiConfig {
    /// HTTP port
    pub port: u16,

    /// Interface to bind
    pub bind: IpAddr,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub db_max_connections: u32,

    /// How long a writer waits for the SQLite write lock
    pub db_busy_timeout_secs: u64,

    /// Let stock go negative instead of refusing a sale
    pub allow_negative_stock: bool,

    /// Reject orders whose total differs from the sum of their lines
    pub verify_order_total: bool,

    /// What `PATCH /orders/{id}/status` with `cancelled` does
    pub cancellation_mode: CancellationMode,

    /// Bounded side-effect queue size
    pub side_effect_queue_capacity: usize,

    /// Prefix for supplier phones written without one
    pub default_country_code: String,

    /// CORS origins for the dashboard
    pub allowed_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            port: 5000,
            bind: IpAddr::from([0, 0, 0, 0]),
            database_path: PathBuf::from("stockconnect.db"),
            db_max_connections: 5,
            db_busy_timeout_secs: 5,
            allow_negative_stock: true,
            verify_order_total: false,
            cancellation_mode: CancellationMode::StatusOnly,
            side_effect_queue_capacity: 256,
            default_country_code: DEFAULT_COUNTRY_CODE.to_string(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ApiConfig::default();

        let config = ApiConfig {
            port: parse_or(&lookup, "STOCKCONNECT_PORT", defaults.port)?,
            bind: parse_or(&lookup, "STOCKCONNECT_BIND", defaults.bind)?,
            database_path: lookup("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            db_busy_timeout_secs: parse_or(&lookup, "DB_BUSY_TIMEOUT_SECS", defaults.db_busy_timeout_secs)?,
            allow_negative_stock: flag_or(&lookup, "ALLOW_NEGATIVE_STOCK", defaults.allow_negative_stock)?,
            verify_order_total: flag_or(&lookup, "VERIFY_ORDER_TOTAL", defaults.verify_order_total)?,
            cancellation_mode: parse_or(&lookup, "CANCELLATION_MODE", defaults.cancellation_mode)?,
            side_effect_queue_capacity: parse_or(
                &lookup,
                "SIDE_EFFECT_QUEUE_CAPACITY",
                defaults.side_effect_queue_capacity,
            )?,
            default_country_code: lookup("DEFAULT_COUNTRY_CODE")
                .map(|code| code.trim().to_string())
                .unwrap_or(defaults.default_country_code),
            allowed_origins: lookup("ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or(defaults.allowed_origins),
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }
        if config.side_effect_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue("SIDE_EFFECT_QUEUE_CAPACITY".to_string()));
        }
        if !config.default_country_code.starts_with('+') {
            return Err(ConfigError::InvalidValue("DEFAULT_COUNTRY_CODE".to_string()));
        }

        Ok(config)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.db_max_connections)
            .busy_timeout(Duration::from_secs(self.db_busy_timeout_secs))
    }

    pub fn notify_config(&self) -> NotifyConfig {
        NotifyConfig::default()
            .queue_capacity(self.side_effect_queue_capacity)
            .default_country_code(self.default_country_code.clone())
    }

    pub fn order_policy(&self) -> OrderPolicy {
        OrderPolicy {
            stock: if self.allow_negative_stock {
                StockPolicy::permissive()
            } else {
                StockPolicy::floor_at_zero()
            },
            verify_order_total: self.verify_order_total,
            cancellation_mode: self.cancellation_mode,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

fn flag_or<F>(lookup: &F, key: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|raw| raw.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(raw) => match raw.as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue(key.to_string())),
        },
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

    fn load(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:5000");
        assert!(config.allow_negative_stock);
        assert!(!config.verify_order_total);
        assert_eq!(config.cancellation_mode, CancellationMode::StatusOnly);
        assert_eq!(config.default_country_code, "+234");
        assert_eq!(config.allowed_origins.len(), 2);
        assert_eq!(config.order_policy().stock, StockPolicy::permissive());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("STOCKCONNECT_PORT", "8080"),
            ("ALLOW_NEGATIVE_STOCK", "false"),
            ("VERIFY_ORDER_TOTAL", "1"),
            ("CANCELLATION_MODE", "reverse_effects"),
            ("ALLOWED_ORIGINS", "https://dash.example.com, ,http://localhost:3000"),
            ("DATABASE_PATH", "/tmp/sc.db"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        let policy = config.order_policy();
        assert_eq!(policy.stock, StockPolicy::floor_at_zero());
        assert!(policy.verify_order_total);
        assert_eq!(policy.cancellation_mode, CancellationMode::ReverseEffects);
        assert_eq!(
            config.allowed_origins,
            vec!["https://dash.example.com", "http://localhost:3000"]
        );
        assert_eq!(config.db_config().database_path, PathBuf::from("/tmp/sc.db"));
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = load(&[("STOCKCONNECT_PORT", "eighty")]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for STOCKCONNECT_PORT");

        assert!(load(&[("ALLOW_NEGATIVE_STOCK", "maybe")]).is_err());
        assert!(load(&[("CANCELLATION_MODE", "refund")]).is_err());
        assert!(load(&[("DB_MAX_CONNECTIONS", "0")]).is_err());
        assert!(load(&[("DEFAULT_COUNTRY_CODE", "234")]).is_err());
    }
}
