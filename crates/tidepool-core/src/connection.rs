//! Connection capability traits and identity

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Result;

/// A resource that can be pooled.
///
/// The pool never looks inside a connection. It only closes it and, when the
/// implementation provides one, asks it whether it is still usable.
pub trait Connection: Send + 'static {
    /// Close the underlying resource.
    ///
    /// Implementations should treat closing an already-closed resource as a
    /// no-op. An error is logged by the pool and otherwise ignored: the
    /// connection is considered gone either way.
    fn close(&mut self) -> Result<()>;

    /// Probe whether the connection is still usable.
    ///
    /// The default implementation reports every connection as healthy, which
    /// is the right choice for resources that have no cheap liveness check.
    /// An `Err` is treated the same as `Ok(false)`.
    fn is_valid(&mut self, timeout: Duration) -> Result<bool> {
        let _ = timeout;
        Ok(true)
    }
}

/// Factory trait for creating new connections
pub trait ConnectionFactory<C>: Send + Sync + 'static {
    /// Create a new connection
    fn create(&self) -> Result<C>;
}

impl<C, F> ConnectionFactory<C> for F
where
    F: Fn() -> Result<C> + Send + Sync + 'static,
{
    fn create(&self) -> Result<C> {
        self()
    }
}

/// Identity of a connection within a single pool.
///
/// Identifiers are handed out in increasing order and never reused for the
/// lifetime of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Create an identifier from its raw value
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}
