//! # TableDB Storage
//!
//! The byte-store layer underneath a TableDB table file.
//!
//! A backend is an append-only sequence of bytes with random reads. It has
//! no idea what a record, an index or a log frame is; the core crate owns
//! every byte layout.
//!
//! ## Available Backends
//!
//! - [`FileBackend`] - a single file on disk, optionally read-only
//! - [`InMemoryBackend`] - a growable buffer for tests and scratch tables
//!
//! ## Example
//!
//! ```rust
//! use tabledb_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"pk0").unwrap();
//! assert_eq!(backend.read_at(offset, 3).unwrap(), b"pk0");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::{FileBackend, FileOptions};
pub use memory::InMemoryBackend;
