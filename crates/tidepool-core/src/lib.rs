//! Tidepool Core - Collaborator contracts for the connection pool
//!
//! This crate defines the boundary between the pool and the resources it
//! manages:
//!
//! - `Connection` - Capability trait every pooled resource implements
//! - `ConnectionFactory` - Produces new connections on demand
//! - `ConnectionId` - Identity the pool assigns to each connection
//! - `TidepoolError` - Error taxonomy shared by every crate in the workspace

mod connection;
mod error;

pub use connection::*;
pub use error::*;
