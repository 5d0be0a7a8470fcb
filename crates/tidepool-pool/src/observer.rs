//! Lifecycle events emitted by the pool
//!
//! The pool never logs leaks or disposals directly. It reports them to a
//! `PoolObserver`, which defaults to [`TracingObserver`].

use std::fmt;

use tidepool_core::{ConnectionId, TidepoolError};

use crate::leak::LeakReport;

/// Why the pool closed a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisposeReason {
    /// The health probe failed while handing the connection out
    FailedCheckoutValidation,
    /// The health probe failed when the connection came back
    FailedReturnValidation,
    /// The connection was idle when `close_idle` drained the pool
    Drained,
    /// Construction failed part way through warm-up
    AbortedWarmUp,
}

impl fmt::Display for DisposeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisposeReason::FailedCheckoutValidation => write!(f, "unhealthy on checkout"),
            DisposeReason::FailedReturnValidation => write!(f, "unhealthy on release"),
            DisposeReason::Drained => write!(f, "idle connections drained"),
            DisposeReason::AbortedWarmUp => write!(f, "pool construction aborted"),
        }
    }
}

/// Receives connection lifecycle events
///
/// All methods default to no-ops so implementors only override what they
/// care about. Callbacks run on the thread that triggered the event and
/// never while the pool or leak detector lock is held.
pub trait PoolObserver: Send + Sync + 'static {
    fn on_connection_created(&self, _id: ConnectionId) {}

    fn on_connection_disposed(&self, _id: ConnectionId, _reason: DisposeReason) {}

    /// `close()` returned an error. The connection is forgotten regardless.
    fn on_close_failed(&self, _id: ConnectionId, _error: &TidepoolError) {}

    fn on_leak_detected(&self, _leak: &LeakReport) {}
}

/// Observer that forwards every event to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PoolObserver for TracingObserver {
    fn on_connection_created(&self, id: ConnectionId) {
        tracing::debug!(connection = %id, "created new connection");
    }

    fn on_connection_disposed(&self, id: ConnectionId, reason: DisposeReason) {
        match reason {
            DisposeReason::FailedCheckoutValidation | DisposeReason::FailedReturnValidation => {
                tracing::warn!(connection = %id, %reason, "disposed unhealthy connection");
            }
            DisposeReason::Drained | DisposeReason::AbortedWarmUp => {
                tracing::debug!(connection = %id, %reason, "disposed connection");
            }
        }
    }

    fn on_close_failed(&self, id: ConnectionId, error: &TidepoolError) {
        tracing::warn!(connection = %id, error = %error, "failed to close connection");
    }

    fn on_leak_detected(&self, leak: &LeakReport) {
        tracing::warn!(
            connection = %leak.id(),
            held_ms = leak.held_for().as_millis() as u64,
            acquired_at = %leak.acquired_at().to_rfc3339(),
            "connection appears to be leaked"
        );
    }
}
