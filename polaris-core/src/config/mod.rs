//! Configuration management for Polaris
//!
//! This module provides environment-based configuration management with
//! support for defaults, TOML files and validation.

use crate::logging::LogLevel;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path of the SQLite database file
    pub path: PathBuf,

    /// Maximum pooled connections
    pub pool_size: u32,

    /// How long a writer waits on a locked database
    #[serde(with = "humantime_serde")]
    pub busy_timeout: Duration,

    /// Use the write-ahead log journal
    pub enable_wal: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include timestamps
    pub with_timestamp: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/polaris.db"),
            pool_size: 4,
            busy_timeout: Duration::from_secs(5),
            enable_wal: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: POLARIS_<SECTION>_<KEY>
    /// Example: POLARIS_DB_PATH=/var/lib/polaris/polaris.db
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Database config
        if let Ok(path) = env::var("POLARIS_DB_PATH") {
            config.database.path = PathBuf::from(path);
        }
        if let Ok(pool_size) = env::var("POLARIS_DB_POOL_SIZE") {
            config.database.pool_size = parse_var("POLARIS_DB_POOL_SIZE", &pool_size)?;
        }
        if let Ok(timeout) = env::var("POLARIS_DB_BUSY_TIMEOUT") {
            config.database.busy_timeout = parse_duration_var("POLARIS_DB_BUSY_TIMEOUT", &timeout)?;
        }
        if let Ok(enable_wal) = env::var("POLARIS_DB_WAL") {
            config.database.enable_wal = parse_var("POLARIS_DB_WAL", &enable_wal)?;
        }

        // Logging config
        if let Ok(level) = env::var("POLARIS_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(json) = env::var("POLARIS_LOG_JSON") {
            config.logging.json_format = parse_var("POLARIS_LOG_JSON", &json)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.pool_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "pool_size must be greater than 0".to_string(),
            ));
        }

        if self.database.busy_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "busy_timeout must be greater than 0".to_string(),
            ));
        }

        if self.logging.level.parse::<LogLevel>().is_err() {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;

        std::fs::write(path, contents).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(())
    }
}

fn parse_var<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_duration_var(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    humantime_serde::re::humantime::parse_duration(value).map_err(|e| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
