//! Error types for Tidepool

use std::time::Duration;

use thiserror::Error;

/// Core error type for Tidepool operations
#[derive(Error, Debug)]
pub enum TidepoolError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Pool exhausted: no connection became available within {timeout:?}")]
    PoolExhausted { timeout: Duration },

    #[error("Connection factory error: {0}")]
    Factory(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Health check failed: {0}")]
    HealthCheck(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl TidepoolError {
    /// Whether the caller may reasonably retry the failed operation.
    ///
    /// Only exhaustion is transient; configuration and factory failures
    /// will keep failing until something outside the pool changes.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TidepoolError::PoolExhausted { .. })
    }
}

/// Result type alias for Tidepool operations
pub type Result<T> = std::result::Result<T, TidepoolError>;
