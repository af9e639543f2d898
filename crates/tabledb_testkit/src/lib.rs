//! # TableDB Testkit
//!
//! Test utilities for TableDB.
//!
//! This crate provides:
//! - Table fixtures with automatic cleanup
//! - The people data set used throughout the test suites
//! - Property-based test generators using proptest
//! - Tracing setup for tests
//!
//! ## Usage
//!
//! ```rust
//! use tabledb_testkit::prelude::*;
//!
//! let table = prepare_table_with_data();
//! assert_eq!(table.size().unwrap(), 4);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod logging;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
}

pub use fixtures::*;
pub use generators::*;
pub use logging::*;
