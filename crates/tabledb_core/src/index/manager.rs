//! Index bookkeeping for a table.

use super::column::ColumnIndex;
use super::IndexKind;
use crate::error::TableResult;
use crate::store::Store;
use crate::types::is_pk_column;
use std::collections::BTreeMap;
use tabledb_codec::{decode_record, Record};
use tracing::debug;

/// All declared indexes of one table, keyed by column.
///
/// The primary key is indexed under the column `""`; `":pk"` is accepted
/// as an alias wherever a column name is taken.
#[derive(Debug, Default)]
pub struct IndexManager {
    indexes: BTreeMap<String, ColumnIndex>,
}

/// Canonical storage name of an indexed column.
pub(crate) fn canonical_column(column: &str) -> &str {
    if is_pk_column(column) {
        ""
    } else {
        column
    }
}

impl IndexManager {
    /// Creates a manager with no indexes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares, replaces or (with [`IndexKind::Remove`]) drops the index on
    /// `column`, building it from `store`. Returns the previous kind.
    ///
    /// # Errors
    ///
    /// Fails if a stored record does not decode.
    pub fn set(
        &mut self,
        column: &str,
        kind: IndexKind,
        store: &Store,
    ) -> TableResult<Option<IndexKind>> {
        let column = canonical_column(column).to_string();
        let previous = self.indexes.get(&column).map(ColumnIndex::kind);

        let Some(mut index) = ColumnIndex::new(kind) else {
            self.indexes.remove(&column);
            return Ok(previous);
        };
        for (pk, bytes) in store.iter() {
            if column.is_empty() {
                index.insert(pk, pk);
            } else {
                let record = decode_record(bytes)?;
                if let Some(value) = record.get(&column) {
                    index.insert(value, pk);
                }
            }
        }
        debug!(column = %column, %kind, entries = index.len(), "index built");
        self.indexes.insert(column, index);
        Ok(previous)
    }

    /// Restores the exact declaration set `definitions`, rebuilding every
    /// index from `store`.
    ///
    /// # Errors
    ///
    /// Fails if a stored record does not decode.
    pub fn rebuild(
        &mut self,
        definitions: &BTreeMap<String, IndexKind>,
        store: &Store,
    ) -> TableResult<()> {
        self.indexes.clear();
        for (column, kind) in definitions {
            self.set(column, *kind, store)?;
        }
        Ok(())
    }

    /// Updates every index for `pk` changing from `old` to `new`.
    pub fn on_change(&mut self, pk: &str, old: Option<&Record>, new: Option<&Record>) {
        for (column, index) in &mut self.indexes {
            if column.is_empty() {
                match (old.is_some(), new.is_some()) {
                    (false, true) => index.insert(pk, pk),
                    (true, false) => index.remove(pk, pk),
                    _ => {}
                }
                continue;
            }
            let before = old.and_then(|r| r.get(column));
            let after = new.and_then(|r| r.get(column));
            if before == after {
                continue;
            }
            if let Some(value) = before {
                index.remove(value, pk);
            }
            if let Some(value) = after {
                index.insert(value, pk);
            }
        }
    }

    /// Empties every index, keeping the declarations.
    pub fn clear_entries(&mut self) {
        for index in self.indexes.values_mut() {
            index.clear();
        }
    }

    /// The index on `column`, if declared.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&ColumnIndex> {
        self.indexes.get(canonical_column(column))
    }

    /// Declared kind of the index on `column`.
    #[must_use]
    pub fn definition(&self, column: &str) -> Option<IndexKind> {
        self.get(column).map(ColumnIndex::kind)
    }

    /// Every declaration, ordered by column.
    #[must_use]
    pub fn definitions(&self) -> BTreeMap<String, IndexKind> {
        self.indexes
            .iter()
            .map(|(column, index)| (column.clone(), index.kind()))
            .collect()
    }

    /// Whether no index is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Number of declared indexes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indexes.len()
    }
}
