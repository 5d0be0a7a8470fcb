//! Health probing for pooled connections
//!
//! The pool probes a connection before handing it out and again when it is
//! returned. Probe failures never reach the acquirer: an unhealthy
//! connection is disposed and the pool moves on.

mod probe;


pub use probe::{ProbeOutcome, probe_connection};
