//! # TableDB Core
//!
//! Embedded, schema-less table database.
//!
//! A [`Table`] maps primary keys to [`Record`]s (ordered column name/value
//! text pairs) and persists them in a single append-only log file. On top
//! of plain key access it provides:
//! - prefix and limit key enumeration, eager or through a [`KeyCursor`]
//! - a persistent unique-id counter
//! - per-column lexical or decimal secondary indexes
//! - ad-hoc queries with conditions, negation, ordering, limit and offset
//! - single-writer transactions with rollback
//! - crash recovery and log compaction
//!
//! ## Example
//!
//! ```rust
//! use tabledb_core::{Direction, Operator, Record, Row, Table};
//!
//! let table = Table::open_in_memory()?;
//! table.put("pk0", &Record::from([("name", "jim"), ("age", "25")]))?;
//! table.put("pk1", &Record::from([("name", "jeff"), ("age", "32")]))?;
//! table.put("pk2", &Record::from([("name", "jack"), ("age", "44")]))?;
//!
//! let rows = table.query(|q| {
//!     q.add("name", Operator::StartsWith, "ja")
//!         .order_by("age", Direction::NumDesc)
//!         .pk_only();
//! })?;
//! assert_eq!(rows, vec![Row::Key("pk2".into())]);
//! # Ok::<(), tabledb_core::TableError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod cursor;
mod error;
mod file;
mod index;
mod log;
mod query;
mod store;
mod table;
mod transaction;
mod types;

pub use config::{Config, LockMode};
pub use cursor::{KeyCursor, KeysOptions};
pub use error::{codes, ErrorKind, TableError, TableResult};
pub use file::{compaction_path, lock_path, FileLock};
pub use index::{BTreeIndex, ColumnIndex, DecimalKey, IndexKind};
pub use log::{LogReader, LogRecord, LogRecordType, LOG_MAGIC, LOG_VERSION};
pub use query::{
    Condition, Direction, Operator, Plan, PreparedQuery, Query, QueryBuilder, Row, Shape,
};
pub use table::Table;
pub use transaction::TransactionState;
pub use types::{is_pk_column, TransactionId, PK_COLUMN};

pub use tabledb_codec::{Record, Value};
