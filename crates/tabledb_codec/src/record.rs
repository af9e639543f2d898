//! The record type.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;

/// Column name that stands for the primary key in queries. Records may not
/// use it, nor the empty name, which is its alias.
pub const PK_COLUMN: &str = ":pk";

/// Whether `column` is reserved for the primary key (`""` or
/// [`PK_COLUMN`]).
#[must_use]
pub fn is_reserved_column(column: &str) -> bool {
    column.is_empty() || column == PK_COLUMN
}

/// One table row: column names mapped to column values, in insertion order.
///
/// Column names are unique. Inserting an existing column replaces its value
/// in place, so the column keeps its original position.
///
/// ```
/// use tabledb_codec::Record;
///
/// let mut record = Record::from([("name", "jim"), ("age", "25")]);
/// record.insert("age", "26");
/// assert_eq!(record.get("age"), Some("26"));
/// assert_eq!(record.columns().collect::<Vec<_>>(), ["name", "age"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Record {
    columns: Vec<(String, String)>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty record with room for `capacity` columns.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
        }
    }

    /// Value of `column`, if present.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Whether `column` is present.
    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|(name, _)| name == column)
    }

    /// Sets `column` to `value`, returning the previous value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.columns.push((column, value));
                None
            }
        }
    }

    /// Puts `column` first, replacing any existing column of that name.
    pub fn insert_first(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        self.columns.retain(|(name, _)| *name != column);
        self.columns.insert(0, (column, value.into()));
    }

    /// Removes `column`, returning its value.
    pub fn remove(&mut self, column: &str) -> Option<String> {
        let index = self.columns.iter().position(|(name, _)| name == column)?;
        Some(self.columns.remove(index).1)
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the record has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterates `(column, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.columns
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Iterates column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Iterates column values in order.
    pub fn values(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(|(_, value)| value.as_str())
    }

    /// Checks that no column uses a reserved name.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidColumn` naming the first reserved column.
    pub fn check_columns(&self) -> CodecResult<()> {
        match self.columns().find(|name| is_reserved_column(name)) {
            Some(name) => Err(CodecError::invalid_column(format!(
                "column name {name:?} is reserved for the primary key"
            ))),
            None => Ok(()),
        }
    }

    /// Rough size of the encoded form, used to presize buffers.
    pub(crate) fn encoded_len_hint(&self) -> usize {
        1 + self
            .columns
            .iter()
            .map(|(n, v)| n.len() + v.len() + 2)
            .sum::<usize>()
    }

    /// Builds a record from an alternating column/value list.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidShape` on an odd number of items and with
    /// `InvalidColumn` if any item is not text or a column name is
    /// reserved.
    pub fn from_flat_list(items: Vec<Value>) -> CodecResult<Self> {
        if items.len() % 2 != 0 {
            return Err(CodecError::invalid_shape(format!(
                "column/value list has odd length {}",
                items.len()
            )));
        }

        let mut record = Self::with_capacity(items.len() / 2);
        let mut items = items.into_iter();
        while let (Some(name), Some(value)) = (items.next(), items.next()) {
            record.insert(column_name(name)?, column_value(value)?);
        }
        Ok(record)
    }
}

fn column_name(value: Value) -> CodecResult<String> {
    match value {
        Value::Text(s) if is_reserved_column(&s) => Err(CodecError::invalid_column(format!(
            "column name {s:?} is reserved for the primary key"
        ))),
        Value::Text(s) => Ok(s),
        other => Err(CodecError::invalid_column(format!(
            "column name must be a string, got {}",
            other.type_name()
        ))),
    }
}

fn column_value(value: Value) -> CodecResult<String> {
    match value {
        Value::Text(s) => Ok(s),
        other => Err(CodecError::invalid_column(format!(
            "column value must be a string, got {}",
            other.type_name()
        ))),
    }
}

impl TryFrom<Value> for Record {
    type Error = CodecError;

    /// Accepts a map of strings to strings or an alternating column/value
    /// list; anything else is rejected before it can reach storage.
    fn try_from(value: Value) -> CodecResult<Self> {
        match value {
            Value::Map(pairs) => {
                let mut record = Self::with_capacity(pairs.len());
                for (name, value) in pairs {
                    record.insert(column_name(name)?, column_value(value)?);
                }
                Ok(record)
            }
            Value::Array(items) => Self::from_flat_list(items),
            other => Err(CodecError::invalid_shape(format!(
                "expected a map or a column/value list, got {}",
                other.type_name()
            ))),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Record {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl IntoIterator for Record {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}
