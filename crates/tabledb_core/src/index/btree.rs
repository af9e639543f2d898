//! Ordered value → primary-key-set map.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Bound, RangeBounds};

/// An ordered multimap from index keys to primary keys.
///
/// Every entry is a (key, primary key) pair; a key with no primary keys
/// left is removed so `distinct_keys` stays accurate.
///
/// ```rust
/// use tabledb_core::BTreeIndex;
///
/// let mut index: BTreeIndex<String> = BTreeIndex::new();
/// index.insert("en".to_string(), "pk2");
/// assert_eq!(index.lookup(&"en".to_string()).len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct BTreeIndex<K: Ord + Clone> {
    entries: BTreeMap<K, BTreeSet<String>>,
    count: usize,
}

impl<K: Ord + Clone> Default for BTreeIndex<K> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            count: 0,
        }
    }
}

impl<K: Ord + Clone> BTreeIndex<K> {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a (key, primary key) pair. Returns false if it was present.
    pub fn insert(&mut self, key: K, pk: &str) -> bool {
        let inserted = self.entries.entry(key).or_default().insert(pk.to_string());
        if inserted {
            self.count += 1;
        }
        inserted
    }

    /// Removes a (key, primary key) pair. Returns false if it was absent.
    pub fn remove(&mut self, key: &K, pk: &str) -> bool {
        let Some(set) = self.entries.get_mut(key) else {
            return false;
        };
        if !set.remove(pk) {
            return false;
        }
        self.count -= 1;
        if set.is_empty() {
            self.entries.remove(key);
        }
        true
    }

    /// Primary keys stored under `key`.
    #[must_use]
    pub fn lookup(&self, key: &K) -> BTreeSet<String> {
        self.entries.get(key).cloned().unwrap_or_default()
    }

    /// Primary keys stored under any key in `range`.
    pub fn range<R: RangeBounds<K>>(&self, range: R) -> BTreeSet<String> {
        self.entries
            .range(range)
            .flat_map(|(_, pks)| pks.iter().cloned())
            .collect()
    }

    /// Primary keys under keys strictly greater than `key`.
    #[must_use]
    pub fn greater_than(&self, key: &K) -> BTreeSet<String> {
        self.range((Bound::Excluded(key.clone()), Bound::Unbounded))
    }

    /// Primary keys under keys greater than or equal to `key`.
    #[must_use]
    pub fn greater_than_or_equal(&self, key: &K) -> BTreeSet<String> {
        self.range((Bound::Included(key.clone()), Bound::Unbounded))
    }

    /// Primary keys under keys strictly less than `key`.
    #[must_use]
    pub fn less_than(&self, key: &K) -> BTreeSet<String> {
        self.range((Bound::Unbounded, Bound::Excluded(key.clone())))
    }

    /// Primary keys under keys less than or equal to `key`.
    #[must_use]
    pub fn less_than_or_equal(&self, key: &K) -> BTreeSet<String> {
        self.range((Bound::Unbounded, Bound::Included(key.clone())))
    }

    /// Primary keys under keys in `min..=max`. Empty when `min > max`.
    #[must_use]
    pub fn between(&self, min: &K, max: &K) -> BTreeSet<String> {
        if min > max {
            return BTreeSet::new();
        }
        self.range(min.clone()..=max.clone())
    }

    /// Number of (key, primary key) pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the index holds no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn distinct_keys(&self) -> usize {
        self.entries.len()
    }

    /// Removes every pair.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.count = 0;
    }
}

impl BTreeIndex<String> {
    /// Primary keys under keys starting with `prefix`.
    #[must_use]
    pub fn prefix(&self, prefix: &str) -> BTreeSet<String> {
        self.entries
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .flat_map(|(_, pks)| pks.iter().cloned())
            .collect()
    }
}
