//! Fail-safe wrapper around `Connection::is_valid`

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use tidepool_core::Connection;

/// Result of probing a single connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The connection reported itself usable
    Healthy { latency: Duration },
    /// The connection reported itself unusable
    Unhealthy,
    /// The probe returned an error or panicked
    Failed(String),
}

impl ProbeOutcome {
    /// Only `Healthy` connections may be handed out or kept idle
    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeOutcome::Healthy { .. })
    }
}

/// Probe a connection, treating every failure mode as unhealthy.
///
/// A panic inside `is_valid` is caught here so that the pool's capacity
/// accounting is never skipped by unwinding.
pub fn probe_connection<C: Connection>(conn: &mut C, timeout: Duration) -> ProbeOutcome {
    let start = Instant::now();
    match panic::catch_unwind(AssertUnwindSafe(|| conn.is_valid(timeout))) {
        Ok(Ok(true)) => ProbeOutcome::Healthy {
            latency: start.elapsed(),
        },
        Ok(Ok(false)) => ProbeOutcome::Unhealthy,
        Ok(Err(e)) => ProbeOutcome::Failed(e.to_string()),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "health probe panicked".to_string());
            ProbeOutcome::Failed(message)
        }
    }
}
