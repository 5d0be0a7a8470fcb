//! Shared fixtures for unit tests

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tidepool_core::{Connection, ConnectionId, Result, TidepoolError};

use crate::leak::LeakReport;
use crate::observer::{DisposeReason, PoolObserver};

/// Observer that keeps every event for later assertions
#[derive(Default)]
pub(crate) struct RecordingObserver {
    pub created: Mutex<Vec<ConnectionId>>,
    pub disposed: Mutex<Vec<(ConnectionId, DisposeReason)>>,
    pub close_failures: Mutex<Vec<ConnectionId>>,
    pub leaks: Mutex<Vec<LeakReport>>,
}

impl PoolObserver for RecordingObserver {
    fn on_connection_created(&self, id: ConnectionId) {
        self.created.lock().push(id);
    }

    fn on_connection_disposed(&self, id: ConnectionId, reason: DisposeReason) {
        self.disposed.lock().push((id, reason));
    }

    fn on_close_failed(&self, id: ConnectionId, _error: &TidepoolError) {
        self.close_failures.lock().push(id);
    }

    fn on_leak_detected(&self, leak: &LeakReport) {
        self.leaks.lock().push(leak.clone());
    }
}

/// Switches shared between a mock connection and the test driving it
#[derive(Default)]
pub(crate) struct MockState {
    pub closed: AtomicBool,
    pub unhealthy: AtomicBool,
    pub probe_errors: AtomicBool,
    pub probe_panics: AtomicBool,
    pub close_errors: AtomicBool,
    pub close_calls: AtomicUsize,
    /// Milliseconds `is_valid` sleeps before answering
    pub probe_delay_ms: AtomicU64,
}

/// Mock connection for testing
pub(crate) struct MockConnection {
    pub serial: u64,
    pub state: Arc<MockState>,
}

impl MockConnection {
    pub fn execute(&self, query: &str) -> String {
        format!("mock {}: {}", self.serial, query)
    }
}

impl Connection for MockConnection {
    fn close(&mut self) -> Result<()> {
        self.state.close_calls.fetch_add(1, Ordering::SeqCst);
        self.state.closed.store(true, Ordering::SeqCst);
        if self.state.close_errors.load(Ordering::SeqCst) {
            return Err(TidepoolError::Connection("socket already reset".into()));
        }
        Ok(())
    }

    fn is_valid(&mut self, _timeout: Duration) -> Result<bool> {
        let delay = self.state.probe_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }
        if self.state.probe_panics.load(Ordering::SeqCst) {
            panic!("probe blew up");
        }
        if self.state.probe_errors.load(Ordering::SeqCst) {
            return Err(TidepoolError::HealthCheck("ping timed out".into()));
        }
        Ok(!self.state.closed.load(Ordering::SeqCst) && !self.state.unhealthy.load(Ordering::SeqCst))
    }
}

/// Mock factory that counts connections created and keeps their state
#[derive(Default)]
pub(crate) struct MockFactory {
    counter: AtomicU64,
    pub states: Mutex<Vec<Arc<MockState>>>,
    pub fail: AtomicBool,
    pub unhealthy_from_start: AtomicBool,
}

impl MockFactory {
    pub fn count(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    pub fn state(&self, index: usize) -> Arc<MockState> {
        Arc::clone(&self.states.lock()[index])
    }

    pub fn create(&self) -> Result<MockConnection> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TidepoolError::Factory("connection refused".into()));
        }
        let serial = self.counter.fetch_add(1, Ordering::SeqCst);
        let state = Arc::new(MockState::default());
        if self.unhealthy_from_start.load(Ordering::SeqCst) {
            state.unhealthy.store(true, Ordering::SeqCst);
        }
        self.states.lock().push(Arc::clone(&state));
        Ok(MockConnection { serial, state })
    }
}

/// Wrap a shared factory in a closure the pool accepts
pub(crate) fn factory_fn(
    factory: &Arc<MockFactory>,
) -> impl Fn() -> Result<MockConnection> + Send + Sync + use<> {
    let factory = Arc::clone(factory);
    move || factory.create()
}
