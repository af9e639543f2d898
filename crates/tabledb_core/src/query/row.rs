//! Query result rows.

use crate::types::PK_COLUMN;
use tabledb_codec::Record;

/// Which parts of a matched record a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shape {
    /// The record with its primary key injected first under `":pk"`.
    #[default]
    Full,
    /// The record alone.
    NoPk,
    /// Only the primary key.
    PkOnly,
}

/// One query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    /// A primary key ([`Shape::PkOnly`]).
    Key(String),
    /// A record ([`Shape::Full`] or [`Shape::NoPk`]).
    Record(Record),
}

impl Row {
    pub(crate) fn shape(shape: Shape, pk: String, mut record: Record) -> Self {
        match shape {
            Shape::Full => {
                record.insert_first(PK_COLUMN, pk);
                Self::Record(record)
            }
            Shape::NoPk => Self::Record(record),
            Shape::PkOnly => Self::Key(pk),
        }
    }

    /// The primary key, if the row carries one.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(key),
            Self::Record(record) => record.get(PK_COLUMN),
        }
    }

    /// The record, unless this is a key-only row.
    #[must_use]
    pub fn record(&self) -> Option<&Record> {
        match self {
            Self::Key(_) => None,
            Self::Record(record) => Some(record),
        }
    }

    /// Column value shortcut.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.record().and_then(|r| r.get(column))
    }

    /// Converts into the record, unless this is a key-only row.
    #[must_use]
    pub fn into_record(self) -> Option<Record> {
        match self {
            Self::Key(_) => None,
            Self::Record(record) => Some(record),
        }
    }
}
