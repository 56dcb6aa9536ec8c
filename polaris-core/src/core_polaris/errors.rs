/*
    errors.rs - Error types for the Polaris state machine

    Storage failures are propagated unmodified; the caller aborts the
    enclosing transaction. Post-condition failures (a write that must affect
    exactly one row, a pre-provisioned row that is missing) are not errors:
    they panic, because they mean the data or the caller is corrupt.
*/

use crate::config::ConfigError;
use thiserror::Error;

/// Errors that can occur in the Polaris subsystem
#[derive(Debug, Error)]
pub enum PolarisError {
    /// Underlying SQLite call failed
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// No pooled connection could be obtained
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Database directory could not be prepared
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for Polaris operations
pub type PolarisResult<T> = Result<T, PolarisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err: PolarisError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, PolarisError::Storage(_)));
        assert!(err.to_string().starts_with("Storage error:"));
    }

    #[test]
    fn test_config_error_conversion() {
        let err: PolarisError = ConfigError::ValidationFailed("pool_size must be greater than 0".to_string()).into();
        assert!(err.to_string().contains("pool_size"));
    }
}
