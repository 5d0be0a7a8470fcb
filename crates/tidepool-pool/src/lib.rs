//! Tidepool Pool - Bounded, health-checked connection pooling
//!
//! This crate owns connection lifecycle: warm-up, checkout with a deadline,
//! validation on checkout and return, disposal, and leak reporting.

pub mod health;
pub mod leak;
mod observer;
pub mod pool;

#[cfg(test)]
mod testing;

pub use health::{ProbeOutcome, probe_connection};
pub use leak::{LeakDetector, LeakReport};
pub use observer::{DisposeReason, PoolObserver, TracingObserver};
pub use pool::{
    ConnectionPool, MAX_POOL_SIZE, PoolBuilder, PoolConfig, PoolStats, PooledHandle,
};
pub use tidepool_core::{Connection, ConnectionFactory, ConnectionId, Result, TidepoolError};
