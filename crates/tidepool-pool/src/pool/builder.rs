//! Pool construction

use std::sync::Arc;

use tidepool_core::{Connection, ConnectionFactory, Result, TidepoolError};

use super::config::PoolConfig;
use super::pool::ConnectionPool;
use crate::observer::{PoolObserver, TracingObserver};

/// Builder for [`ConnectionPool`]
///
/// A factory is required. The observer defaults to [`TracingObserver`].
///
/// # Example
///
/// ```ignore
/// let pool = ConnectionPool::builder(PoolConfig::new(0, 4))
///     .factory(|| open_connection())
///     .observer(Arc::new(MetricsObserver::default()))
///     .build()?;
/// ```
pub struct PoolBuilder<C> {
    config: PoolConfig,
    factory: Option<Arc<dyn ConnectionFactory<C>>>,
    observer: Option<Arc<dyn PoolObserver>>,
}

impl<C: Connection> PoolBuilder<C> {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            factory: None,
            observer: None,
        }
    }

    /// Set the factory used to open connections
    pub fn factory<F: ConnectionFactory<C>>(mut self, factory: F) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Set the observer that receives lifecycle and leak events
    pub fn observer(mut self, observer: Arc<dyn PoolObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Validate the configuration, open `min_connections` and return the pool
    pub fn build(self) -> Result<ConnectionPool<C>> {
        self.config.validate()?;
        let factory = self.factory.ok_or_else(|| {
            TidepoolError::Configuration("connection factory must be provided".into())
        })?;
        let observer = self
            .observer
            .unwrap_or_else(|| Arc::new(TracingObserver) as Arc<dyn PoolObserver>);

        ConnectionPool::from_parts(self.config, factory, observer)
    }
}
