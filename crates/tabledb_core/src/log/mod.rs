//! The table log.
//!
//! A table is persisted as a single append-only log. Every mutation is
//! written here before it is applied in memory, and opening a table
//! replays the log to rebuild the records, the index definitions and the
//! unique-id counter.
//!
//! ## Frame Format
//!
//! ```text
//! | magic "TTLG" (4) | version (2) | type (1) | length (4) | payload (N) | crc32 (4) |
//! ```
//!
//! Integers are little-endian; the CRC covers header and payload.
//!
//! ## Recovery Policy
//!
//! Tolerated (treated as the end of the log):
//!
//! - a partial header or payload at the very end, left by a crash
//!   mid-append; a writable table truncates it away on open
//!
//! Fatal (the table does not open):
//!
//! - checksum mismatch
//! - invalid magic, unknown record type, or a newer format version
//!
//! Records tagged with a transaction id apply only once that
//! transaction's `Commit` frame is read.
//!
//! ## Compaction
//!
//! Compaction rewrites the log as one `Snapshot` frame, one `SetIndex`
//! frame per declared index, and one autocommit `Put` per record.

mod reader;
mod record;
mod recovery;
mod writer;

pub use reader::LogReader;
pub use record::{LogRecord, LogRecordType, LOG_MAGIC, LOG_VERSION};
pub use recovery::recover;
pub use writer::TableLog;
