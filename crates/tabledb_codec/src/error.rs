//! Codec error types.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while building, encoding or decoding records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A column name or value is not a string.
    #[error("invalid column: {message}")]
    InvalidColumn {
        /// What was wrong with the column.
        message: String,
    },

    /// The input is neither a map nor an alternating column/value list.
    #[error("invalid record shape: {message}")]
    InvalidShape {
        /// What was wrong with the shape.
        message: String,
    },

    /// Input ended in the middle of an item.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// A text item is not valid UTF-8.
    #[error("invalid UTF-8 in column data")]
    InvalidUtf8,

    /// Bytes follow the end of the record.
    #[error("{count} trailing bytes after record")]
    TrailingBytes {
        /// Number of bytes left over.
        count: usize,
    },

    /// The bytes are not a well-formed record encoding.
    #[error("invalid record encoding: {message}")]
    InvalidStructure {
        /// Description of the structural problem.
        message: String,
    },
}

impl CodecError {
    /// Creates an invalid column error.
    pub fn invalid_column(message: impl Into<String>) -> Self {
        Self::InvalidColumn {
            message: message.into(),
        }
    }

    /// Creates an invalid shape error.
    pub fn invalid_shape(message: impl Into<String>) -> Self {
        Self::InvalidShape {
            message: message.into(),
        }
    }

    /// Creates an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }

    /// Whether this error describes bad caller input rather than bad bytes.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidColumn { .. } | Self::InvalidShape { .. })
    }
}
