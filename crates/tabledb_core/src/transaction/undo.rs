//! Undo journal entries and rollback.

use crate::error::TableResult;
use crate::index::{IndexKind, IndexManager};
use crate::store::Store;
use std::collections::BTreeMap;
use tabledb_codec::{decode_record, Record};

/// How to reverse one mutation.
#[derive(Debug, Clone)]
pub enum UndoEntry {
    /// Restore `key` to `previous` (absent when `None`).
    Record {
        /// Primary key.
        key: String,
        /// Encoded record before the mutation.
        previous: Option<Vec<u8>>,
    },
    /// Put back records removed in bulk by a clear or prefix delete.
    Records {
        /// Removed entries.
        removed: BTreeMap<String, Vec<u8>>,
    },
    /// Restore the index on `column` to `previous` (absent when `None`).
    Index {
        /// Indexed column.
        column: String,
        /// Declared kind before the mutation.
        previous: Option<IndexKind>,
    },
}

fn decode(bytes: Option<&[u8]>) -> TableResult<Option<Record>> {
    bytes.map(|b| decode_record(b).map_err(Into::into)).transpose()
}

/// Reverses `entries` newest first against `store` and `indexes`.
///
/// # Errors
///
/// Fails if a stored record does not decode.
pub(crate) fn rollback(
    entries: Vec<UndoEntry>,
    store: &mut Store,
    indexes: &mut IndexManager,
) -> TableResult<()> {
    for entry in entries.into_iter().rev() {
        match entry {
            UndoEntry::Record { key, previous } => {
                let current = decode(store.get(&key))?;
                let restored = decode(previous.as_deref())?;
                indexes.on_change(&key, current.as_ref(), restored.as_ref());
                match previous {
                    Some(bytes) => {
                        store.put(key, bytes);
                    }
                    None => {
                        store.remove(&key);
                    }
                }
            }
            UndoEntry::Records { removed } => {
                for (key, bytes) in &removed {
                    let record = decode_record(bytes)?;
                    indexes.on_change(key, None, Some(&record));
                }
                store.restore(removed);
            }
            UndoEntry::Index { column, previous } => {
                indexes.set(&column, previous.unwrap_or(IndexKind::Remove), store)?;
            }
        }
    }
    Ok(())
}
