//! Tidepool demo - drives a connection pool from several worker threads
//!
//! Each worker checks a connection out, runs a couple of operations against
//! an in-memory user store, holds it for a while and returns it. Afterwards
//! the leak detector is consulted and the final pool statistics printed.

mod logging;
mod memory;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tidepool_core::TidepoolError;
use tidepool_pool::{ConnectionPool, PoolConfig};

use crate::logging::LoggingConfig;
use crate::memory::{DatabaseConnection, DatabaseConnectionFactory, InMemoryDatabase};

#[derive(Debug, Parser)]
#[command(name = "tidepool-demo", about = "Exercise a bounded connection pool")]
struct Args {
    /// JSON pool configuration; flags below override individual fields
    #[arg(long, env = "TIDEPOOL_CONFIG")]
    config: Option<PathBuf>,

    /// Connections opened at startup
    #[arg(long)]
    min: Option<usize>,

    /// Upper bound on connections
    #[arg(long)]
    max: Option<usize>,

    /// Milliseconds a worker waits for a connection
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Milliseconds after which a held connection is reported as leaked
    #[arg(long)]
    leak_threshold_ms: Option<u64>,

    /// Number of worker threads
    #[arg(long, default_value_t = 6)]
    workers: usize,

    /// Milliseconds each worker holds its connection
    #[arg(long, default_value_t = 50)]
    hold_ms: u64,

    /// Keep one connection checked out past the leak threshold
    #[arg(long)]
    leak: bool,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    fn pool_config(&self) -> anyhow::Result<PoolConfig> {
        let base = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read pool config from {:?}", path))?;
                PoolConfig::from_json(&json).with_context(|| "Failed to parse pool config")?
            }
            None => PoolConfig::new(2, 5)
                .with_acquisition_timeout_ms(1_000)
                .with_leak_threshold_ms(2_000),
        };

        let min = self.min.unwrap_or(base.min_connections());
        let max = self.max.unwrap_or(base.max_connections());
        let timeout_ms = self
            .timeout_ms
            .unwrap_or(base.acquisition_timeout().as_millis() as u64);
        let leak_threshold_ms = self
            .leak_threshold_ms
            .unwrap_or(base.leak_threshold().as_millis() as u64);

        let config = PoolConfig::new(min, max)
            .with_acquisition_timeout_ms(timeout_ms)
            .with_leak_threshold_ms(leak_threshold_ms)
            .with_validation_timeout_ms(base.validation_timeout().as_millis() as u64);
        config.validate()?;
        Ok(config)
    }
}

fn run_worker(pool: &ConnectionPool<DatabaseConnection>, worker: usize, hold: Duration) {
    let conn = match pool.acquire() {
        Ok(conn) => conn,
        Err(e @ TidepoolError::PoolExhausted { .. }) => {
            tracing::warn!(worker, error = %e, "gave up waiting for a connection");
            return;
        }
        Err(e) => {
            tracing::error!(worker, error = %e, "failed to acquire connection");
            return;
        }
    };

    let name = format!("worker-{}", worker);
    let result = conn
        .create_user(&name, &format!("{}@example.com", name))
        .and_then(|_| conn.list_users());
    match result {
        Ok(users) => tracing::info!(
            worker,
            connection = %conn.id(),
            serial = conn.serial(),
            users = users.len(),
            "query complete"
        ),
        Err(e) => tracing::error!(worker, error = %e, "query failed"),
    }
    thread::sleep(hold);
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let logging = if args.json_logs {
        LoggingConfig::json()
    } else {
        LoggingConfig::default()
    };
    logging::init(logging)?;

    let config = args.pool_config()?;
    let database = Arc::new(InMemoryDatabase::default());
    let pool = ConnectionPool::new(config, DatabaseConnectionFactory::new(database))
        .context("Failed to create connection pool")?;

    let leaked = if args.leak {
        Some(pool.acquire().context("Failed to acquire connection to leak")?)
    } else {
        None
    };

    let hold = Duration::from_millis(args.hold_ms);
    thread::scope(|scope| {
        for worker in 0..args.workers {
            let pool = &pool;
            thread::Builder::new()
                .name(format!("worker-{}", worker))
                .spawn_scoped(scope, move || run_worker(pool, worker, hold))
                .map(|_| ())
                .unwrap_or_else(|e| tracing::error!(worker, error = %e, "failed to spawn worker"));
        }
    });

    if leaked.is_some() {
        thread::sleep(pool.config().leak_threshold() + Duration::from_millis(10));
    }
    let leaks = pool.leak_detector().check_for_leaks();
    tracing::info!(leaks = leaks.len(), "leak check complete");
    drop(leaked);

    println!("{}", serde_json::to_string_pretty(&pool.stats())?);
    Ok(())
}
