//! Error types for table operations.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tabledb_codec::CodecError;
use tabledb_storage::StorageError;
use thiserror::Error;

/// Result type for table operations.
pub type TableResult<T> = Result<T, TableError>;

/// Stable numeric error codes, numbered after the classic table-database
/// error table so binding layers can keep reporting the same numbers.
pub mod codes {
    /// Invalid argument or invalid operation.
    pub const INVALID: i32 = 2;
    /// File not found.
    pub const NO_FILE: i32 = 3;
    /// No permission (read-only handle).
    pub const NO_PERMISSION: i32 = 4;
    /// Broken record or checksum in the table file.
    pub const CORRUPT: i32 = 6;
    /// Lock failure.
    pub const LOCK: i32 = 16;
    /// Anything else, including plain I/O failures.
    pub const MISC: i32 = 9999;
}

/// Coarse classification of a [`TableError`] for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The table file is missing.
    NotFound,
    /// Bad caller input or an operation invalid in the current state.
    InvalidArgument,
    /// Disk or backing-store failure, including corruption.
    IoFailure,
    /// Transaction misuse or contention.
    TransactionState,
}

/// Errors raised by a [`crate::Table`].
#[derive(Debug, Error)]
pub enum TableError {
    /// The table file does not exist and may not be created.
    #[error("(err 3) file not found")]
    NotFound {
        /// Path that was opened.
        path: PathBuf,
    },

    /// Malformed input, a nested `begin`, or a bad query condition.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong.
        message: String,
    },

    /// `commit` or `abort` without an active transaction, and similar.
    #[error("transaction state error: {message}")]
    TransactionState {
        /// What was wrong.
        message: String,
    },

    /// Another thread held the table's transaction lock for too long.
    #[error("table busy: another thread's transaction held the table for {waited:?}")]
    Busy {
        /// How long the caller waited.
        waited: Duration,
    },

    /// Another handle holds the table file lock.
    #[error("table file is locked by another handle")]
    Locked,

    /// Mutation attempted on a read-only table.
    #[error("table is open read-only")]
    ReadOnly,

    /// The table has been closed.
    #[error("table is closed")]
    Closed,

    /// The table log is damaged.
    #[error("table log corruption: {message}")]
    Corruption {
        /// Description of the damage.
        message: String,
    },

    /// A log frame failed its checksum.
    #[error("checksum mismatch at offset {offset}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Offset of the frame.
        offset: u64,
        /// Stored checksum.
        expected: u32,
        /// Computed checksum.
        actual: u32,
    },

    /// Stored record bytes could not be decoded.
    #[error("codec error: {0}")]
    Codec(CodecError),

    /// Storage backend failure.
    #[error("storage error: {0}")]
    Storage(StorageError),

    /// Operating system I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TableError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a transaction state error.
    pub fn transaction_state(message: impl Into<String>) -> Self {
        Self::TransactionState {
            message: message.into(),
        }
    }

    /// Creates a corruption error.
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::Corruption {
            message: message.into(),
        }
    }

    /// Classifies the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidArgument { .. } | Self::ReadOnly | Self::Closed => {
                ErrorKind::InvalidArgument
            }
            Self::TransactionState { .. } | Self::Busy { .. } => ErrorKind::TransactionState,
            Self::Locked
            | Self::Corruption { .. }
            | Self::ChecksumMismatch { .. }
            | Self::Codec(_)
            | Self::Storage(_)
            | Self::Io(_) => ErrorKind::IoFailure,
        }
    }

    /// Stable numeric code, see [`codes`].
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => codes::NO_FILE,
            Self::InvalidArgument { .. } | Self::Closed => codes::INVALID,
            Self::ReadOnly => codes::NO_PERMISSION,
            Self::Busy { .. } | Self::Locked => codes::LOCK,
            Self::Corruption { .. } | Self::ChecksumMismatch { .. } | Self::Codec(_) => {
                codes::CORRUPT
            }
            Self::TransactionState { .. } | Self::Storage(_) | Self::Io(_) => codes::MISC,
        }
    }

    /// Message without the code prefix.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::NotFound { .. } => "file not found".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StorageError> for TableError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { path } => Self::NotFound { path },
            StorageError::ReadOnly => Self::ReadOnly,
            StorageError::Io(e) => Self::Io(e),
            other => Self::Storage(other),
        }
    }
}

impl From<CodecError> for TableError {
    fn from(err: CodecError) -> Self {
        if err.is_input_error() {
            Self::invalid_argument(err.to_string())
        } else {
            Self::Codec(err)
        }
    }
}
