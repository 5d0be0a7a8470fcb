//! Connection pooling for arbitrary resources
//!
//! This module provides a bounded pool with eager warm-up, blocking
//! acquisition with an absolute deadline, health checks on checkout and
//! return, and leak tracking for outstanding handles.
//!
//! # Example
//!
//! ```ignore
//! use tidepool_pool::{ConnectionPool, PoolConfig};
//!
//! let config = PoolConfig::new(2, 5)
//!     .with_acquisition_timeout_ms(1_000)
//!     .with_leak_threshold_ms(30_000);
//!
//! let pool = ConnectionPool::new(config, || open_connection())?;
//! let conn = pool.acquire()?;
//! // Use connection...
//! // Connection returned to pool on drop
//! ```

mod builder;
mod config;
mod handle;
mod pool;
mod stats;


pub use builder::PoolBuilder;
pub use config::{MAX_POOL_SIZE, PoolConfig};
pub use handle::PooledHandle;
pub use pool::ConnectionPool;
pub use stats::PoolStats;
