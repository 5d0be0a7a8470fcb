//! In-memory user store the demo pools connections to

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tidepool_core::{Connection, ConnectionFactory, Result, TidepoolError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
}

/// Thread-safe store shared by every connection
#[derive(Debug, Default)]
pub struct InMemoryDatabase {
    users: Mutex<BTreeMap<u64, User>>,
    sequence: AtomicU64,
}

impl InMemoryDatabase {
    fn create_user(&self, name: &str, email: &str) -> User {
        let id = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let user = User {
            id,
            name: name.to_string(),
            email: email.to_string(),
        };
        self.users.lock().insert(id, user.clone());
        user
    }

    fn list_users(&self) -> Vec<User> {
        self.users.lock().values().cloned().collect()
    }
}

/// A lightweight connection onto the shared store
pub struct DatabaseConnection {
    serial: u64,
    database: Arc<InMemoryDatabase>,
    closed: bool,
}

impl DatabaseConnection {
    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn create_user(&self, name: &str, email: &str) -> Result<User> {
        self.ensure_open()?;
        Ok(self.database.create_user(name, email))
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.ensure_open()?;
        Ok(self.database.list_users())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(TidepoolError::Connection(format!(
                "connection {} is closed",
                self.serial
            )));
        }
        Ok(())
    }
}

impl Connection for DatabaseConnection {
    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    fn is_valid(&mut self, _timeout: Duration) -> Result<bool> {
        Ok(!self.closed)
    }
}

/// Opens connections onto one database, numbering them from 1
pub struct DatabaseConnectionFactory {
    database: Arc<InMemoryDatabase>,
    next_serial: AtomicU64,
}

impl DatabaseConnectionFactory {
    pub fn new(database: Arc<InMemoryDatabase>) -> Self {
        Self {
            database,
            next_serial: AtomicU64::new(1),
        }
    }
}

impl ConnectionFactory<DatabaseConnection> for DatabaseConnectionFactory {
    fn create(&self) -> Result<DatabaseConnection> {
        Ok(DatabaseConnection {
            serial: self.next_serial.fetch_add(1, Ordering::SeqCst),
            database: Arc::clone(&self.database),
            closed: false,
        })
    }
}
