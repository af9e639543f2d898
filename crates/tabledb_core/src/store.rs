//! In-memory primary store.

use crate::error::TableResult;
use std::collections::BTreeMap;
use std::ops::Bound;
use tabledb_codec::{decode_record, Record};

/// Primary-key → encoded-record map plus the unique-id counter.
///
/// Keys iterate in byte-wise lexical order. Records are kept encoded so a
/// snapshot for rollback is a plain map clone.
#[derive(Debug, Clone, Default)]
pub struct Store {
    records: BTreeMap<String, Vec<u8>>,
    unique_id: u64,
}

impl Store {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoded record stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.records.get(key).map(Vec::as_slice)
    }

    /// Decoded record stored under `key`.
    ///
    /// # Errors
    ///
    /// Fails if the stored bytes do not decode.
    pub fn get_record(&self, key: &str) -> TableResult<Option<Record>> {
        self.get(key)
            .map(|bytes| decode_record(bytes).map_err(Into::into))
            .transpose()
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// Stores `value` under `key`, returning the previous bytes.
    pub fn put(&mut self, key: String, value: Vec<u8>) -> Option<Vec<u8>> {
        self.records.insert(key, value)
    }

    /// Removes `key`, returning its bytes.
    pub fn remove(&mut self, key: &str) -> Option<Vec<u8>> {
        self.records.remove(key)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates over (key, encoded record) in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> + '_ {
        self.records.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Keys starting with `prefix`, in order.
    pub fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.records
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .map(|(k, _)| k.as_str())
            .take_while(move |k| k.starts_with(prefix))
    }

    /// First key after `after` (or the first key at all) that starts with
    /// `prefix`.
    #[must_use]
    pub fn next_key(&self, after: Option<&str>, prefix: &str) -> Option<&str> {
        let lower = match after {
            Some(last) if last >= prefix => Bound::Excluded(last),
            _ => Bound::Included(prefix),
        };
        self.records
            .range::<str, _>((lower, Bound::Unbounded))
            .map(|(k, _)| k.as_str())
            .next()
            .filter(|k| k.starts_with(prefix))
    }

    /// Removes every key starting with `prefix`, returning the removed
    /// entries.
    pub fn remove_prefix(&mut self, prefix: &str) -> BTreeMap<String, Vec<u8>> {
        let keys: Vec<String> = self.keys_with_prefix(prefix).map(str::to_string).collect();
        keys.into_iter()
            .filter_map(|k| self.records.remove(&k).map(|v| (k, v)))
            .collect()
    }

    /// Removes every record, returning them. The unique-id counter is kept.
    pub fn take_all(&mut self) -> BTreeMap<String, Vec<u8>> {
        std::mem::take(&mut self.records)
    }

    /// Puts back records removed by [`Store::take_all`] or
    /// [`Store::remove_prefix`].
    pub fn restore(&mut self, records: BTreeMap<String, Vec<u8>>) {
        self.records.extend(records);
    }

    /// Last unique id handed out.
    #[must_use]
    pub const fn unique_id(&self) -> u64 {
        self.unique_id
    }

    /// Advances the counter and returns the new id.
    pub fn next_unique_id(&mut self) -> u64 {
        self.unique_id += 1;
        self.unique_id
    }

    /// Raises the counter to at least `value`.
    pub fn observe_unique_id(&mut self, value: u64) {
        self.unique_id = self.unique_id.max(value);
    }
}
