//! Checked-out connection handle

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tidepool_core::{Connection, ConnectionId};

use super::pool::{SharedPool, Tracked};

/// A connection borrowed from the pool
///
/// The handle is the only owner of the connection while it is checked out.
/// [`close`](Self::close) gives the connection back to the pool; calling it
/// again does nothing. Dropping the handle closes it, so a handle held in a
/// scope is returned on every exit path, including unwinding.
///
/// Returning a connection runs its health probe on the calling thread.
pub struct PooledHandle<C: Connection> {
    id: ConnectionId,
    tracked: Option<Tracked<C>>,
    pool: Arc<SharedPool<C>>,
}

impl<C: Connection> PooledHandle<C> {
    pub(crate) fn new(tracked: Tracked<C>, pool: Arc<SharedPool<C>>) -> Self {
        Self {
            id: tracked.id,
            tracked: Some(tracked),
            pool,
        }
    }

    /// Identity of the wrapped connection
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Whether the connection has already been given back
    pub fn is_closed(&self) -> bool {
        self.tracked.is_none()
    }

    /// Get the connection, or `None` once the handle is closed
    pub fn get(&self) -> Option<&C> {
        self.tracked.as_ref().map(|tracked| &tracked.conn)
    }

    /// Get the connection mutably, or `None` once the handle is closed
    pub fn get_mut(&mut self) -> Option<&mut C> {
        self.tracked.as_mut().map(|tracked| &mut tracked.conn)
    }

    /// Return the connection to the pool
    ///
    /// Only the first call has an effect.
    pub fn close(&mut self) {
        if let Some(tracked) = self.tracked.take() {
            self.pool.release(tracked);
        }
    }
}

impl<C: Connection> Deref for PooledHandle<C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        self.get().expect("connection already returned to pool")
    }
}

impl<C: Connection> DerefMut for PooledHandle<C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.get_mut().expect("connection already returned to pool")
    }
}

impl<C: Connection> Drop for PooledHandle<C> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<C: Connection> fmt::Debug for PooledHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledHandle")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}
