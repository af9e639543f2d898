//! Rebuilding table state from the log.

use crate::error::TableResult;
use crate::index::IndexKind;
use crate::log::reader::LogReader;
use crate::log::record::LogRecord;
use crate::store::Store;
use crate::types::TransactionId;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// State recovered from a log image.
#[derive(Debug, Default)]
pub struct Recovered {
    /// Records and unique-id counter.
    pub store: Store,
    /// Declared indexes by column. Entries are rebuilt from `store`.
    pub index_defs: BTreeMap<String, IndexKind>,
    /// First transaction id not used by the log.
    pub next_txid: u64,
    /// Bytes of complete frames.
    pub valid_len: u64,
    /// Bytes in the image, including a torn tail.
    pub total_len: u64,
}

impl Recovered {
    /// Whether the image ends in a partial frame.
    #[must_use]
    pub fn has_torn_tail(&self) -> bool {
        self.valid_len < self.total_len
    }
}

/// Replays a log image.
///
/// Autocommit records apply as they are read. Records of a transaction are
/// held back until its `Commit`; an `Abort`, or no end at all, discards
/// them. Unique-id records apply regardless of transactions.
///
/// # Errors
///
/// Fails on checksum mismatches and other damage before the tail.
pub fn recover(image: &[u8]) -> TableResult<Recovered> {
    let mut recovered = Recovered {
        next_txid: 1,
        total_len: image.len() as u64,
        ..Recovered::default()
    };
    let mut pending: HashMap<TransactionId, Vec<LogRecord>> = HashMap::new();
    let mut frames = 0usize;

    let mut reader = LogReader::new(image);
    for item in reader.by_ref() {
        let (_, record) = item?;
        frames += 1;

        if let Some(txid) = record.txid() {
            recovered.next_txid = recovered.next_txid.max(txid.as_u64() + 1);
        }

        match record {
            LogRecord::Begin { txid } => {
                pending.entry(txid).or_default();
            }
            LogRecord::Commit { txid } => {
                for held in pending.remove(&txid).unwrap_or_default() {
                    apply(&mut recovered, held);
                }
            }
            LogRecord::Abort { txid } => {
                pending.remove(&txid);
            }
            LogRecord::UniqueId { value } | LogRecord::Snapshot { unique_id: value } => {
                recovered.store.observe_unique_id(value);
            }
            other => match other.txid() {
                Some(txid) if !txid.is_autocommit() => {
                    pending.entry(txid).or_default().push(other);
                }
                _ => apply(&mut recovered, other),
            },
        }
    }
    recovered.valid_len = reader.valid_len();

    if !pending.is_empty() {
        let discarded: usize = pending.values().map(Vec::len).sum();
        warn!(
            transactions = pending.len(),
            records = discarded,
            "discarding uncommitted transactions from table log"
        );
    }
    if recovered.has_torn_tail() {
        warn!(
            valid_len = recovered.valid_len,
            total_len = recovered.total_len,
            "table log ends in a partial frame"
        );
    }
    debug!(
        frames,
        records = recovered.store.len(),
        indexes = recovered.index_defs.len(),
        "table log replayed"
    );
    Ok(recovered)
}

fn apply(recovered: &mut Recovered, record: LogRecord) {
    let store = &mut recovered.store;
    match record {
        LogRecord::Put { key, value, .. } => {
            store.put(key, value);
        }
        LogRecord::Delete { key, .. } => {
            store.remove(&key);
        }
        LogRecord::DeletePrefix { prefix, .. } => {
            store.remove_prefix(&prefix);
        }
        LogRecord::Clear { .. } => {
            store.take_all();
        }
        LogRecord::SetIndex { column, kind, .. } => {
            if kind == IndexKind::Remove {
                recovered.index_defs.remove(&column);
            } else {
                recovered.index_defs.insert(column, kind);
            }
        }
        LogRecord::UniqueId { value } | LogRecord::Snapshot { unique_id: value } => {
            store.observe_unique_id(value);
        }
        LogRecord::Begin { .. } | LogRecord::Commit { .. } | LogRecord::Abort { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TableError;

    const AUTO: TransactionId = TransactionId::AUTOCOMMIT;

    fn image(records: &[LogRecord]) -> Vec<u8> {
        records
            .iter()
            .flat_map(|r| r.encode_frame().unwrap())
            .collect()
    }

    fn put(txid: TransactionId, key: &str) -> LogRecord {
        LogRecord::Put {
            txid,
            key: key.into(),
            value: vec![0x80],
        }
    }

    #[test]
    fn autocommit_records_apply() {
        let data = image(&[put(AUTO, "a"), put(AUTO, "b"), LogRecord::Delete {
            txid: AUTO,
            key: "a".into(),
        }]);
        let recovered = recover(&data).unwrap();
        assert_eq!(recovered.store.len(), 1);
        assert!(recovered.store.contains("b"));
        assert!(!recovered.has_torn_tail());
    }

    #[test]
    fn committed_transaction_applies() {
        let t = TransactionId::new(4);
        let data = image(&[
            LogRecord::Begin { txid: t },
            put(t, "a"),
            LogRecord::Commit { txid: t },
        ]);
        let recovered = recover(&data).unwrap();
        assert!(recovered.store.contains("a"));
        assert_eq!(recovered.next_txid, 5);
    }

    #[test]
    fn aborted_and_unfinished_transactions_are_dropped() {
        let t1 = TransactionId::new(1);
        let t2 = TransactionId::new(2);
        let data = image(&[
            LogRecord::Begin { txid: t1 },
            put(t1, "aborted"),
            LogRecord::Abort { txid: t1 },
            LogRecord::Begin { txid: t2 },
            put(t2, "unfinished"),
        ]);
        let recovered = recover(&data).unwrap();
        assert!(recovered.store.is_empty());
        assert_eq!(recovered.next_txid, 3);
    }

    #[test]
    fn unique_ids_survive_aborts() {
        let t = TransactionId::new(1);
        let data = image(&[
            LogRecord::Begin { txid: t },
            LogRecord::UniqueId { value: 7 },
            LogRecord::Abort { txid: t },
        ]);
        assert_eq!(recover(&data).unwrap().store.unique_id(), 7);
    }

    #[test]
    fn index_definitions_follow_the_log() {
        let data = image(&[
            LogRecord::SetIndex {
                txid: AUTO,
                column: "name".into(),
                kind: IndexKind::Lexical,
            },
            LogRecord::SetIndex {
                txid: AUTO,
                column: "age".into(),
                kind: IndexKind::Decimal,
            },
            LogRecord::SetIndex {
                txid: AUTO,
                column: "name".into(),
                kind: IndexKind::Remove,
            },
        ]);
        let recovered = recover(&data).unwrap();
        assert_eq!(
            recovered.index_defs.into_iter().collect::<Vec<_>>(),
            vec![("age".to_string(), IndexKind::Decimal)]
        );
    }

    #[test]
    fn clear_and_prefix_delete_replay() {
        let data = image(&[
            put(AUTO, "person1"),
            put(AUTO, "animal1"),
            LogRecord::DeletePrefix {
                txid: AUTO,
                prefix: "person".into(),
            },
            put(AUTO, "person2"),
            LogRecord::Clear { txid: AUTO },
            put(AUTO, "after"),
        ]);
        let recovered = recover(&data).unwrap();
        let keys: Vec<&str> = recovered.store.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["after"]);
    }

    #[test]
    fn torn_tail_is_reported() {
        let mut data = image(&[put(AUTO, "a"), put(AUTO, "b")]);
        data.truncate(data.len() - 1);
        let recovered = recover(&data).unwrap();
        assert_eq!(recovered.store.len(), 1);
        assert!(recovered.has_torn_tail());
    }

    #[test]
    fn checksum_damage_is_fatal() {
        let mut data = image(&[put(AUTO, "a"), put(AUTO, "b")]);
        let last = data.len() - 1;
        data[last] ^= 0x01;
        assert!(matches!(
            recover(&data).unwrap_err(),
            TableError::ChecksumMismatch { .. }
        ));
    }
}
