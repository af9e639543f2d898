//! Small shared types.

use std::fmt;

/// Column name that refers to the primary key in conditions, ordering and
/// index declarations. Stored records may not use it.
pub use tabledb_codec::PK_COLUMN;

/// Whether `column` names the primary key (`""` or [`PK_COLUMN`]).
#[must_use]
pub fn is_pk_column(column: &str) -> bool {
    tabledb_codec::is_reserved_column(column)
}

/// Identifier of a transaction in the table log.
///
/// Id 0 marks auto-committed mutations made outside any transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// The id of auto-committed mutations.
    pub const AUTOCOMMIT: Self = Self(0);

    /// Creates a transaction id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Whether this is [`TransactionId::AUTOCOMMIT`].
    #[must_use]
    pub const fn is_autocommit(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}
