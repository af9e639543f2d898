//! Secondary indexes.
//!
//! An index maps the values of one column (or the primary keys themselves,
//! for the `""` column) to the set of primary keys holding that value.
//! Indexes are declared with [`crate::Table::set_index`], persisted as
//! definitions in the table log, and rebuilt from the records on open.
//!
//! # Kinds
//!
//! - [`IndexKind::Lexical`]: byte-wise string order; serves equality and
//!   prefix conditions
//! - [`IndexKind::Decimal`]: numeric order; serves equality, numeric
//!   comparisons and ranges. Values that do not parse as numbers live in a
//!   side bucket that only equality can reach.

mod btree;
mod column;
mod manager;

use crate::error::{TableError, TableResult};
use std::fmt;
use std::str::FromStr;

pub use btree::BTreeIndex;
pub use column::{ColumnIndex, DecimalKey};
pub use manager::IndexManager;

pub(crate) use column::parse_decimal;
pub(crate) use manager::canonical_column;

/// Index declaration passed to [`crate::Table::set_index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum IndexKind {
    /// Drop the index on the column.
    Remove = 0,
    /// String-ordered index.
    Lexical = 1,
    /// Number-ordered index.
    Decimal = 2,
}

impl IndexKind {
    /// Byte used in the table log.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Inverse of [`IndexKind::as_byte`].
    pub fn from_byte(b: u8) -> TableResult<Self> {
        match b {
            0 => Ok(Self::Remove),
            1 => Ok(Self::Lexical),
            2 => Ok(Self::Decimal),
            other => Err(TableError::corruption(format!("unknown index kind {other}"))),
        }
    }
}

impl FromStr for IndexKind {
    type Err = TableError;

    fn from_str(s: &str) -> TableResult<Self> {
        match s {
            "lexical" | "lex" => Ok(Self::Lexical),
            "decimal" | "dec" => Ok(Self::Decimal),
            "remove" | "void" => Ok(Self::Remove),
            other => Err(TableError::invalid_argument(format!(
                "unknown index kind {other:?}"
            ))),
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Remove => "remove",
            Self::Lexical => "lexical",
            Self::Decimal => "decimal",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_byte_roundtrip() {
        for kind in [IndexKind::Remove, IndexKind::Lexical, IndexKind::Decimal] {
            assert_eq!(IndexKind::from_byte(kind.as_byte()).unwrap(), kind);
        }
        assert!(IndexKind::from_byte(9).is_err());
    }

    #[test]
    fn kind_from_str() {
        assert_eq!("lexical".parse::<IndexKind>().unwrap(), IndexKind::Lexical);
        assert_eq!("decimal".parse::<IndexKind>().unwrap(), IndexKind::Decimal);
        assert_eq!("remove".parse::<IndexKind>().unwrap(), IndexKind::Remove);
        assert!("hash".parse::<IndexKind>().is_err());
    }
}
