//! Leak detection for checked-out connections
//!
//! The pool records every checkout and release with a [`LeakDetector`].
//! Calling [`LeakDetector::check_for_leaks`] reports connections that have
//! been held longer than the configured threshold. Reporting is advisory:
//! nothing is reclaimed. Scheduling the check is left to the caller.
//!
//! # Example
//!
//! ```ignore
//! let detector = pool.leak_detector();
//! for leak in detector.check_for_leaks() {
//!     println!("{} held for {:?}", leak.id(), leak.held_for());
//! }
//! ```

mod detector;


pub use detector::{LeakDetector, LeakReport};
