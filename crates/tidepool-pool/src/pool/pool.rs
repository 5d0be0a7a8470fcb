//! Connection pool implementation

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use tidepool_core::{Connection, ConnectionFactory, ConnectionId, Result, TidepoolError};

use super::builder::PoolBuilder;
use super::config::PoolConfig;
use super::handle::PooledHandle;
use super::stats::PoolStats;
use crate::health::probe_connection;
use crate::leak::LeakDetector;
use crate::observer::{DisposeReason, PoolObserver};

/// A connection together with the identity the pool assigned to it
pub(crate) struct Tracked<C> {
    pub(crate) id: ConnectionId,
    pub(crate) conn: C,
}

/// Mutable pool state, guarded by a single lock
///
/// Every live connection is in exactly one of `idle` or `in_use`. `opening`
/// counts capacity reserved for factory calls that have not returned yet.
struct PoolState<C> {
    idle: VecDeque<Tracked<C>>,
    in_use: HashSet<ConnectionId>,
    opening: usize,
    waiting: usize,
}

impl<C> PoolState<C> {
    fn total(&self) -> usize {
        self.idle.len() + self.in_use.len() + self.opening
    }

    fn checked_out(&self) -> usize {
        self.in_use.len() + self.opening
    }
}

/// Where the next candidate connection comes from
enum Candidate<C> {
    Idle(Tracked<C>),
    Reserved,
}

/// Lock-free copy of the occupancy counts.
///
/// Idle and checked-out counts share one word so a reader always sees a
/// pair that was true at the same instant.
#[derive(Default)]
struct Occupancy {
    packed: AtomicU64,
    waiting: AtomicUsize,
}

impl Occupancy {
    fn store(&self, idle: usize, in_use: usize, waiting: usize) {
        let packed = ((in_use as u64) << 32) | (idle as u64 & u32::MAX as u64);
        self.packed.store(packed, Ordering::Release);
        self.waiting.store(waiting, Ordering::Release);
    }

    fn load(&self) -> (usize, usize) {
        let packed = self.packed.load(Ordering::Acquire);
        ((packed & u32::MAX as u64) as usize, (packed >> 32) as usize)
    }
}

pub(crate) struct SharedPool<C> {
    config: PoolConfig,
    factory: Arc<dyn ConnectionFactory<C>>,
    state: Mutex<PoolState<C>>,
    /// Signalled whenever a connection returns to idle or capacity frees up
    available: Condvar,
    occupancy: Occupancy,
    next_id: AtomicU64,
    leak_detector: Arc<LeakDetector>,
    observer: Arc<dyn PoolObserver>,
}

impl<C: Connection> SharedPool<C> {
    fn publish(&self, state: &PoolState<C>) {
        self.occupancy
            .store(state.idle.len(), state.checked_out(), state.waiting);
    }

    fn exhausted(&self) -> TidepoolError {
        TidepoolError::PoolExhausted {
            timeout: self.config.acquisition_timeout(),
        }
    }

    /// Ask the factory for a new connection and give it an identity
    fn open(&self) -> Result<Tracked<C>> {
        let conn = self.factory.create().map_err(|e| match e {
            TidepoolError::Factory(_) => e,
            other => TidepoolError::Factory(other.to_string()),
        })?;
        let id = ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.observer.on_connection_created(id);
        Ok(Tracked { id, conn })
    }

    /// Create `min_connections` idle connections, all or nothing
    fn warm_up(&self) -> Result<()> {
        let mut created = Vec::with_capacity(self.config.min_connections());
        for _ in 0..self.config.min_connections() {
            match self.open() {
                Ok(tracked) => created.push(tracked),
                Err(e) => {
                    tracing::error!(error = %e, created = created.len(), "pool warm-up failed");
                    for tracked in created {
                        self.dispose(tracked, DisposeReason::AbortedWarmUp);
                    }
                    return Err(e);
                }
            }
        }

        let mut state = self.state.lock();
        state.idle.extend(created);
        self.publish(&state);
        Ok(())
    }

    /// Close a connection that has already left the pool's bookkeeping
    fn dispose(&self, tracked: Tracked<C>, reason: DisposeReason) {
        let Tracked { id, mut conn } = tracked;
        if let Err(e) = conn.close() {
            self.observer.on_close_failed(id, &e);
        }
        self.observer.on_connection_disposed(id, reason);
    }

    /// Take an idle connection or reserve capacity for a new one, waiting
    /// until `deadline` if neither is possible.
    fn checkout_or_reserve(&self, deadline: Instant) -> Result<Candidate<C>> {
        let max = self.config.max_connections();
        let mut state = self.state.lock();
        loop {
            if let Some(tracked) = state.idle.pop_front() {
                state.in_use.insert(tracked.id);
                self.publish(&state);
                return Ok(Candidate::Idle(tracked));
            }
            if state.total() < max {
                state.opening += 1;
                self.publish(&state);
                return Ok(Candidate::Reserved);
            }

            state.waiting += 1;
            self.publish(&state);
            let wait = self.available.wait_until(&mut state, deadline);
            state.waiting -= 1;
            self.publish(&state);

            if wait.timed_out() && state.idle.is_empty() && state.total() >= max {
                return Err(self.exhausted());
            }
        }
    }

    pub(crate) fn acquire(self: &Arc<Self>) -> Result<PooledHandle<C>> {
        let deadline = Instant::now() + self.config.acquisition_timeout();
        // Once the deadline passes after a discard, one more candidate is
        // taken without waiting before giving up.
        let mut final_attempt = false;

        loop {
            let mut tracked = match self.checkout_or_reserve(deadline) {
                Ok(Candidate::Idle(tracked)) => {
                    tracing::debug!(connection = %tracked.id, "reusing idle connection");
                    tracked
                }
                Ok(Candidate::Reserved) => {
                    let opened = self.open();
                    let mut state = self.state.lock();
                    state.opening -= 1;
                    match opened {
                        Ok(tracked) => {
                            state.in_use.insert(tracked.id);
                            self.publish(&state);
                            tracing::debug!(
                                connection = %tracked.id,
                                total = state.total(),
                                "opened connection for acquirer"
                            );
                            tracked
                        }
                        Err(e) => {
                            self.publish(&state);
                            self.available.notify_one();
                            drop(state);
                            tracing::error!(error = %e, "connection factory failed");
                            return Err(e);
                        }
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        timeout_ms = self.config.acquisition_timeout().as_millis() as u64,
                        "connection pool exhausted"
                    );
                    return Err(e);
                }
            };

            let outcome = probe_connection(&mut tracked.conn, self.config.validation_timeout());
            if !outcome.is_healthy() {
                tracing::debug!(connection = %tracked.id, ?outcome, "checkout probe failed");
                {
                    let mut state = self.state.lock();
                    state.in_use.remove(&tracked.id);
                    self.publish(&state);
                    self.available.notify_one();
                }
                self.dispose(tracked, DisposeReason::FailedCheckoutValidation);

                if Instant::now() >= deadline {
                    if final_attempt {
                        return Err(self.exhausted());
                    }
                    final_attempt = true;
                }
                continue;
            }

            self.leak_detector.record_acquisition(tracked.id);
            return Ok(PooledHandle::new(tracked, Arc::clone(self)));
        }
    }

    /// Take back a connection from a handle.
    ///
    /// A connection the pool no longer considers checked out is dropped
    /// without further bookkeeping.
    pub(crate) fn release(&self, mut tracked: Tracked<C>) {
        let id = tracked.id;
        self.leak_detector.record_release(id);
        let outcome = probe_connection(&mut tracked.conn, self.config.validation_timeout());

        let mut state = self.state.lock();
        if !state.in_use.remove(&id) {
            drop(state);
            tracing::debug!(connection = %id, "ignoring release of unknown connection");
            return;
        }

        if outcome.is_healthy() {
            state.idle.push_back(tracked);
            self.publish(&state);
            self.available.notify_one();
            return;
        }

        self.publish(&state);
        self.available.notify_one();
        drop(state);
        tracing::debug!(connection = %id, ?outcome, "release probe failed");
        self.dispose(tracked, DisposeReason::FailedReturnValidation);
    }

    fn close_idle(&self) -> usize {
        let drained: Vec<_> = {
            let mut state = self.state.lock();
            let drained: Vec<_> = state.idle.drain(..).collect();
            self.publish(&state);
            self.available.notify_all();
            drained
        };

        let count = drained.len();
        for tracked in drained {
            self.dispose(tracked, DisposeReason::Drained);
        }
        count
    }
}

/// A bounded pool of reusable, health-checked connections
///
/// Cloning the pool is cheap and every clone refers to the same set of
/// connections. Handles returned by [`acquire`](Self::acquire) give their
/// connection back when closed or dropped.
pub struct ConnectionPool<C> {
    shared: Arc<SharedPool<C>>,
}

impl<C> Clone for ConnectionPool<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: Connection> ConnectionPool<C> {
    /// Create a pool with the given configuration and factory
    ///
    /// `min_connections` connections are opened before this returns. If any
    /// of them fails to open, the ones already opened are closed and the
    /// factory error is returned.
    pub fn new<F: ConnectionFactory<C>>(config: PoolConfig, factory: F) -> Result<Self> {
        PoolBuilder::new(config).factory(factory).build()
    }

    /// Start building a pool, e.g. to inject a custom observer
    pub fn builder(config: PoolConfig) -> PoolBuilder<C> {
        PoolBuilder::new(config)
    }

    pub(crate) fn from_parts(
        config: PoolConfig,
        factory: Arc<dyn ConnectionFactory<C>>,
        observer: Arc<dyn PoolObserver>,
    ) -> Result<Self> {
        config.validate()?;

        let leak_detector = Arc::new(LeakDetector::with_observer(
            config.leak_threshold(),
            Arc::clone(&observer),
        ));
        let shared = SharedPool {
            state: Mutex::new(PoolState {
                idle: VecDeque::with_capacity(config.min_connections()),
                in_use: HashSet::new(),
                opening: 0,
                waiting: 0,
            }),
            available: Condvar::new(),
            occupancy: Occupancy::default(),
            next_id: AtomicU64::new(0),
            factory,
            observer,
            leak_detector,
            config,
        };
        shared.warm_up()?;

        tracing::info!(
            min = shared.config.min_connections(),
            max = shared.config.max_connections(),
            "initialised connection pool"
        );
        Ok(Self {
            shared: Arc::new(shared),
        })
    }

    /// Get a connection from the pool
    ///
    /// This will:
    /// 1. Take an idle connection if one exists
    /// 2. Otherwise open a new one if the pool is below `max_connections`
    /// 3. Otherwise wait for a connection to be returned
    ///
    /// Every candidate is probed before it is handed out; unhealthy ones are
    /// closed and the search continues. The deadline is fixed on entry and is
    /// not extended by those retries.
    ///
    /// Returns `PoolExhausted` when the deadline passes and `Factory` when
    /// opening a connection fails.
    pub fn acquire(&self) -> Result<PooledHandle<C>> {
        self.shared.acquire()
    }

    /// Get a connection without blocking the async runtime
    ///
    /// The wait runs on tokio's blocking thread pool.
    pub async fn acquire_async(&self) -> Result<PooledHandle<C>> {
        let shared = Arc::clone(&self.shared);
        tokio::task::spawn_blocking(move || shared.acquire())
            .await
            .map_err(|e| TidepoolError::Other(format!("acquire task failed: {}", e)))?
    }

    /// Close every idle connection, returning how many were closed
    ///
    /// Checked-out connections are not affected. The freed capacity is
    /// refilled lazily by later acquisitions.
    pub fn close_idle(&self) -> usize {
        self.shared.close_idle()
    }

    /// Connections owned by the pool, idle or checked out
    pub fn total_connections(&self) -> usize {
        let (idle, in_use) = self.shared.occupancy.load();
        idle + in_use
    }

    /// Connections checked out, including ones being opened for an acquirer
    pub fn in_use_count(&self) -> usize {
        self.shared.occupancy.load().1
    }

    pub fn idle_count(&self) -> usize {
        self.shared.occupancy.load().0
    }

    /// Acquirers currently blocked waiting for a connection
    pub fn waiting_count(&self) -> usize {
        self.shared.occupancy.waiting.load(Ordering::Acquire)
    }

    /// Get current pool statistics
    pub fn stats(&self) -> PoolStats {
        let (idle, in_use) = self.shared.occupancy.load();
        PoolStats::new(
            idle,
            in_use,
            self.waiting_count(),
            self.shared.config.max_connections(),
        )
    }

    /// Get the pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Get the leak detector, e.g. to check it from a scheduled task
    pub fn leak_detector(&self) -> Arc<LeakDetector> {
        Arc::clone(&self.shared.leak_detector)
    }
}

impl<C> fmt::Debug for ConnectionPool<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (idle, in_use) = self.shared.occupancy.load();
        f.debug_struct("ConnectionPool")
            .field("config", &self.shared.config)
            .field("idle", &idle)
            .field("in_use", &in_use)
            .finish()
    }
}

#[cfg(test)]
impl<C: Connection> ConnectionPool<C> {
    pub(crate) fn shared(&self) -> &Arc<SharedPool<C>> {
        &self.shared
    }
}

#[cfg(test)]
impl<C> Tracked<C> {
    pub(crate) fn new(id: ConnectionId, conn: C) -> Self {
        Self { id, conn }
    }
}
