//! Pool statistics types

use serde::{Deserialize, Serialize};

/// Point-in-time snapshot of a pool's occupancy
///
/// Counts are read without taking the pool lock, so a snapshot taken while
/// other threads acquire and release may be slightly stale. Each snapshot
/// still satisfies `idle + in_use == total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Connections currently owned by the pool (idle + in use)
    total: usize,
    /// Connections waiting in the idle set
    idle: usize,
    /// Connections checked out, including ones being opened for an acquirer
    in_use: usize,
    /// Acquirers blocked waiting for a connection
    waiting: usize,
    /// Configured upper bound
    max: usize,
}

impl PoolStats {
    pub(crate) fn new(idle: usize, in_use: usize, waiting: usize, max: usize) -> Self {
        Self {
            total: idle + in_use,
            idle,
            in_use,
            waiting,
            max,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn idle(&self) -> usize {
        self.idle
    }

    pub fn in_use(&self) -> usize {
        self.in_use
    }

    pub fn waiting(&self) -> usize {
        self.waiting
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Fraction of the configured capacity that is checked out (0.0 to 1.0)
    pub fn utilization(&self) -> f64 {
        if self.max == 0 {
            0.0
        } else {
            self.in_use as f64 / self.max as f64
        }
    }

    /// No idle connection and no room to open another one
    pub fn is_exhausted(&self) -> bool {
        self.idle == 0 && self.total >= self.max
    }
}
