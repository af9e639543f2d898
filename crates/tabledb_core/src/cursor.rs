//! Key enumeration.

use crate::error::TableResult;
use crate::table::Table;

/// Options for [`Table::keys`] and [`Table::key_cursor`].
///
/// ```rust
/// use tabledb_core::KeysOptions;
///
/// let options = KeysOptions::new().prefix("person").limit(10);
/// assert_eq!(options.prefix.as_deref(), Some("person"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeysOptions {
    /// Only keys starting with this prefix.
    pub prefix: Option<String>,
    /// At most this many keys.
    pub limit: Option<usize>,
}

impl KeysOptions {
    /// Every key, no limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to keys starting with `prefix`.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Caps the number of keys.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Lazy forward iterator over the table's keys.
///
/// Each step asks the table for the first key after the one returned last,
/// so the cursor holds no lock between steps and sees keys inserted ahead
/// of it. [`len`](Self::len) is the number of matching keys when the cursor
/// was created.
pub struct KeyCursor<'t> {
    table: &'t Table,
    prefix: String,
    last: Option<String>,
    remaining: Option<usize>,
    len: usize,
    done: bool,
}

impl<'t> KeyCursor<'t> {
    pub(crate) fn new(table: &'t Table, options: KeysOptions, len: usize) -> Self {
        Self {
            table,
            prefix: options.prefix.unwrap_or_default(),
            last: None,
            remaining: options.limit,
            len,
            done: false,
        }
    }

    /// Number of keys the cursor covered when it was created.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the cursor covered no keys when it was created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Releases the cursor.
    pub fn release(self) {}

    fn advance(&mut self) -> TableResult<Option<String>> {
        if self.remaining == Some(0) {
            return Ok(None);
        }
        let next = self.table.next_key(self.last.as_deref(), &self.prefix)?;
        if let Some(key) = &next {
            self.last = Some(key.clone());
            if let Some(remaining) = self.remaining.as_mut() {
                *remaining -= 1;
            }
        }
        Ok(next)
    }
}

impl Iterator for KeyCursor<'_> {
    type Item = TableResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.advance() {
            Ok(Some(key)) => Some(Ok(key)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl std::fmt::Debug for KeyCursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCursor")
            .field("prefix", &self.prefix)
            .field("last", &self.last)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}
