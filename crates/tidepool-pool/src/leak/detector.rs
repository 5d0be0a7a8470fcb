//! Checkout tracking and leak reports

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tidepool_core::ConnectionId;

use crate::observer::{PoolObserver, TracingObserver};

/// When a tracked connection was checked out
#[derive(Debug, Clone, Copy)]
struct Checkout {
    /// Monotonic instant, used for measuring the hold time
    started: Instant,
    /// Wall-clock time, used only for reporting
    acquired_at: DateTime<Utc>,
}

/// A connection held longer than the leak threshold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeakReport {
    id: ConnectionId,
    held_for: Duration,
    acquired_at: DateTime<Utc>,
}

impl LeakReport {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn held_for(&self) -> Duration {
        self.held_for
    }

    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }
}

impl fmt::Display for LeakReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} appears to be leaked (held {:.2}s)",
            self.id,
            self.held_for.as_secs_f64()
        )
    }
}

/// Tracks how long each outstanding connection has been checked out
///
/// The detector holds identities only. It never owns or touches the
/// connections themselves.
pub struct LeakDetector {
    threshold: Duration,
    checkouts: Mutex<HashMap<ConnectionId, Checkout>>,
    observer: Arc<dyn PoolObserver>,
}

impl LeakDetector {
    /// Create a detector that reports through `tracing`
    pub fn new(threshold: Duration) -> Self {
        Self::with_observer(threshold, Arc::new(TracingObserver))
    }

    /// Create a detector that reports leaks to the given observer
    pub fn with_observer(threshold: Duration, observer: Arc<dyn PoolObserver>) -> Self {
        Self {
            threshold,
            checkouts: Mutex::new(HashMap::new()),
            observer,
        }
    }

    /// Get the configured threshold
    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Register the moment a connection is checked out
    pub fn record_acquisition(&self, id: ConnectionId) {
        let checkout = Checkout {
            started: Instant::now(),
            acquired_at: Utc::now(),
        };
        self.checkouts.lock().insert(id, checkout);
    }

    /// Stop tracking a connection. Unknown identities are ignored.
    pub fn record_release(&self, id: ConnectionId) {
        self.checkouts.lock().remove(&id);
    }

    /// Number of checkouts currently tracked
    pub fn tracked_count(&self) -> usize {
        self.checkouts.lock().len()
    }

    /// Report every connection held longer than the threshold.
    ///
    /// Each report is passed to the observer and returned, oldest first.
    pub fn check_for_leaks(&self) -> Vec<LeakReport> {
        let now = Instant::now();
        let snapshot: Vec<(ConnectionId, Checkout)> = {
            let checkouts = self.checkouts.lock();
            checkouts.iter().map(|(id, checkout)| (*id, *checkout)).collect()
        };

        let mut leaks: Vec<LeakReport> = snapshot
            .into_iter()
            .filter_map(|(id, checkout)| {
                let held_for = now.saturating_duration_since(checkout.started);
                (held_for > self.threshold).then_some(LeakReport {
                    id,
                    held_for,
                    acquired_at: checkout.acquired_at,
                })
            })
            .collect();
        leaks.sort_by(|a, b| b.held_for.cmp(&a.held_for));

        for leak in &leaks {
            self.observer.on_leak_detected(leak);
        }
        leaks
    }
}

impl fmt::Debug for LeakDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeakDetector")
            .field("threshold", &self.threshold)
            .field("tracked", &self.tracked_count())
            .finish()
    }
}
