//! Pool configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tidepool_core::{Result, TidepoolError};

/// Largest `max_connections` a pool accepts; occupancy counts are published
/// as two 32-bit halves of one atomic word
pub const MAX_POOL_SIZE: usize = u32::MAX as usize;

/// Configuration for a connection pool
///
/// Controls pool sizing and the timeouts used for acquisition, validation
/// and leak reporting. The connection factory is supplied separately through
/// [`PoolBuilder`](super::PoolBuilder) since it cannot be serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of connections created eagerly when the pool is built
    min_connections: usize,
    /// Upper bound on connections managed by the pool
    max_connections: usize,
    /// Milliseconds an acquirer may wait before the pool reports exhaustion
    acquisition_timeout_ms: u64,
    /// Milliseconds a connection may stay checked out before it is reported
    leak_threshold_ms: u64,
    /// Milliseconds handed to each connection's health probe
    validation_timeout_ms: u64,
}

impl PoolConfig {
    /// Create a new pool configuration with the given min and max sizes
    ///
    /// Bounds are checked by [`validate`](Self::validate), which the pool
    /// calls before creating any connection.
    pub fn new(min_connections: usize, max_connections: usize) -> Self {
        Self {
            min_connections,
            max_connections,
            acquisition_timeout_ms: 5_000,
            leak_threshold_ms: 300_000,
            validation_timeout_ms: 1_000,
        }
    }

    /// Parse a configuration from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the acquisition timeout in milliseconds
    pub fn with_acquisition_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.acquisition_timeout_ms = timeout_ms;
        self
    }

    /// Set the leak threshold in milliseconds
    pub fn with_leak_threshold_ms(mut self, threshold_ms: u64) -> Self {
        self.leak_threshold_ms = threshold_ms;
        self
    }

    /// Set the timeout passed to health probes in milliseconds
    pub fn with_validation_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.validation_timeout_ms = timeout_ms;
        self
    }

    /// Check the configured bounds and timeouts
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(TidepoolError::Configuration(
                "max_connections must be greater than 0".into(),
            ));
        }
        if self.max_connections > MAX_POOL_SIZE {
            return Err(TidepoolError::Configuration(format!(
                "max_connections ({}) cannot exceed {}",
                self.max_connections, MAX_POOL_SIZE
            )));
        }
        if self.min_connections > self.max_connections {
            return Err(TidepoolError::Configuration(format!(
                "min_connections ({}) cannot exceed max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        if self.acquisition_timeout_ms == 0 {
            return Err(TidepoolError::Configuration(
                "acquisition_timeout_ms must be positive".into(),
            ));
        }
        if self.validation_timeout_ms == 0 {
            return Err(TidepoolError::Configuration(
                "validation_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Get the number of connections created at startup
    pub fn min_connections(&self) -> usize {
        self.min_connections
    }

    /// Get the maximum pool size
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Get the acquisition timeout as a Duration
    pub fn acquisition_timeout(&self) -> Duration {
        Duration::from_millis(self.acquisition_timeout_ms)
    }

    /// Get the leak threshold as a Duration
    pub fn leak_threshold(&self) -> Duration {
        Duration::from_millis(self.leak_threshold_ms)
    }

    /// Get the health probe timeout as a Duration
    pub fn validation_timeout(&self) -> Duration {
        Duration::from_millis(self.validation_timeout_ms)
    }
}

impl Default for PoolConfig {
    /// Create a default pool configuration
    ///
    /// Defaults:
    /// - min_connections: 1
    /// - max_connections: 10
    /// - acquisition_timeout: 5 seconds
    /// - leak_threshold: 5 minutes
    /// - validation_timeout: 1 second
    fn default() -> Self {
        Self::new(1, 10)
    }
}
