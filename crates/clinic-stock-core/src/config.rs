//! Store configuration, read from the environment (and `.env` when present).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_DB_PATH: &str = "CLINIC_STOCK_DB_PATH";
pub const ENV_BUSY_TIMEOUT_MS: &str = "CLINIC_STOCK_BUSY_TIMEOUT_MS";
pub const ENV_WAL: &str = "CLINIC_STOCK_WAL";

/// Configuration errors.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Where the stock database lives and how long a writer may wait for the lock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    pub database_path: String,
    /// Upper bound on waiting for the write lock before failing with a retryable error
    pub busy_timeout_ms: u64,
    /// Write-ahead logging for file databases
    pub wal: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: "clinic_stock.db".to_string(),
            busy_timeout_ms: 5_000,
            wal: true,
        }
    }
}

impl StoreConfig {
    /// Load from process environment, after applying any `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is normal in deployed environments.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup, falling back to defaults for missing keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DB_PATH).filter(|p| !p.trim().is_empty()) {
            config.database_path = path;
        }

        if let Some(raw) = lookup(ENV_BUSY_TIMEOUT_MS) {
            config.busy_timeout_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_BUSY_TIMEOUT_MS,
                value: raw.clone(),
            })?;
        }

        if let Some(raw) = lookup(ENV_WAL) {
            config.wal = parse_bool(&raw).ok_or(ConfigError::InvalidValue {
                key: ENV_WAL,
                value: raw.clone(),
            })?;
        }

        Ok(config)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
