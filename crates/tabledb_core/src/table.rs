//! The table facade and recovery.

use crate::config::{Config, LockMode};
use crate::cursor::{KeyCursor, KeysOptions};
use crate::error::{TableError, TableResult};
use crate::file::{self, FileLock};
use crate::index::{canonical_column, IndexKind, IndexManager};
use crate::log::{recover, LogRecord, TableLog};
use crate::query::{self, Plan, PreparedQuery, Query, QueryBuilder, Row};
use crate::store::Store;
use crate::transaction::{rollback, Transaction, UndoEntry};
use crate::types::TransactionId;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;
use tabledb_codec::{decode_record, encode_record, Record, Value};
use tabledb_storage::{FileBackend, FileOptions, InMemoryBackend, StorageBackend};
use tracing::{debug, info, warn};

/// An open table.
///
/// A table maps non-empty primary keys to [`Record`]s. It is `Send + Sync`;
/// every method takes `&self` and serializes on an internal lock.
///
/// # Opening a Table
///
/// ```rust,no_run
/// use tabledb_core::{Record, Table};
///
/// let table = Table::open("people.tdb")?;
/// table.put("pk0", &Record::from([("name", "jim"), ("age", "25")]))?;
/// assert_eq!(table.get("pk0")?.unwrap().get("name"), Some("jim"));
/// table.close()?;
/// # Ok::<(), tabledb_core::TableError>(())
/// ```
///
/// # Transactions
///
/// One transaction at a time, owned by the thread that began it. Its
/// mutations are visible immediately to that thread; other threads wait
/// (up to [`Config::lock_timeout`]) until it commits or aborts.
///
/// ```rust
/// use tabledb_core::{Record, Table, TableError};
///
/// let table = Table::open_in_memory()?;
/// let result: Result<(), TableError> = table.transaction(|t| {
///     t.put("pk0", &Record::from([("name", "jim")]))?;
///     Err(TableError::invalid_argument("changed my mind"))
/// });
/// assert!(result.is_err());
/// assert_eq!(table.size()?, 0);
/// # Ok::<(), TableError>(())
/// ```
pub struct Table {
    path: Option<PathBuf>,
    config: Config,
    read_only: bool,
    inner: Mutex<TableInner>,
    txn_released: Condvar,
}

struct TableInner {
    open: bool,
    log: TableLog,
    store: Store,
    indexes: IndexManager,
    txn: Option<Transaction>,
    next_txid: u64,
    lock: Option<FileLock>,
}

impl Table {
    /// Opens or creates the table file at `path` with default settings.
    ///
    /// # Errors
    ///
    /// Returns `Locked` if another handle holds the file, or a corruption
    /// error if the log is damaged.
    pub fn open(path: impl AsRef<Path>) -> TableResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens the table file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` (code 3) when the file is missing and may not be
    /// created, `Locked` if another handle holds a conflicting lock, or a
    /// corruption error if the log is damaged.
    pub fn open_with_config(path: impl AsRef<Path>, config: Config) -> TableResult<Self> {
        let path = path.as_ref();
        let may_create = config.create_if_missing && !config.read_only;
        if !may_create && !path.exists() {
            return Err(TableError::NotFound {
                path: path.to_path_buf(),
            });
        }
        if may_create {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
        }

        let lock = match config.lock {
            LockMode::NonBlocking => Some(FileLock::acquire(path, config.read_only)?),
            LockMode::None => None,
        };
        let backend = FileBackend::open(
            path,
            FileOptions {
                read_only: config.read_only,
                create: may_create,
                truncate: config.truncate && !config.read_only,
            },
        )?;

        let table = Self::assemble(Some(path.to_path_buf()), config, Box::new(backend), lock)?;
        info!(
            path = %path.display(),
            records = table.inner.lock().store.len(),
            read_only = table.read_only,
            "table opened"
        );
        Ok(table)
    }

    /// Opens a table over an arbitrary backend, replaying its contents.
    ///
    /// No file lock is taken and compaction rewrites the backend in place.
    ///
    /// # Errors
    ///
    /// Returns a corruption error if the backend holds a damaged log.
    pub fn open_with_backend(backend: Box<dyn StorageBackend>, config: Config) -> TableResult<Self> {
        Self::assemble(None, config, backend, None)
    }

    /// Opens an empty, non-persistent table.
    ///
    /// # Errors
    ///
    /// Does not fail in practice; the signature matches the other openers.
    pub fn open_in_memory() -> TableResult<Self> {
        Self::open_with_backend(Box::new(InMemoryBackend::new()), Config::default())
    }

    fn assemble(
        path: Option<PathBuf>,
        config: Config,
        backend: Box<dyn StorageBackend>,
        lock: Option<FileLock>,
    ) -> TableResult<Self> {
        let read_only = config.read_only || backend.is_read_only();
        let mut log = TableLog::new(backend, config.sync_on_commit);

        let image = log.read_image()?;
        let recovered = recover(&image)?;
        if recovered.has_torn_tail() && !read_only {
            warn!(
                discarded = recovered.total_len - recovered.valid_len,
                "truncating partial frame at end of table log"
            );
            log.truncate(recovered.valid_len)?;
            log.sync()?;
        }

        let mut indexes = IndexManager::new();
        indexes.rebuild(&recovered.index_defs, &recovered.store)?;

        Ok(Self {
            path,
            config,
            read_only,
            inner: Mutex::new(TableInner {
                open: true,
                log,
                store: recovered.store,
                indexes,
                txn: None,
                next_txid: recovered.next_txid,
                lock,
            }),
            txn_released: Condvar::new(),
        })
    }

    // ========================================================================
    // Locking
    // ========================================================================

    /// Blocks while another thread's transaction is open.
    fn wait_turn(&self, inner: &mut MutexGuard<'_, TableInner>) -> TableResult<()> {
        let started = Instant::now();
        let deadline = started.checked_add(self.config.lock_timeout);
        while inner
            .txn
            .as_ref()
            .is_some_and(|txn| !txn.is_owned_by_current_thread())
        {
            match deadline {
                Some(deadline) => {
                    if self.txn_released.wait_until(inner, deadline).timed_out()
                        && inner.txn.is_some()
                    {
                        return Err(TableError::Busy {
                            waited: started.elapsed(),
                        });
                    }
                }
                None => self.txn_released.wait(inner),
            }
            if !inner.open {
                return Err(TableError::Closed);
            }
        }
        Ok(())
    }

    fn guard(&self) -> TableResult<MutexGuard<'_, TableInner>> {
        let mut inner = self.inner.lock();
        if !inner.open {
            return Err(TableError::Closed);
        }
        self.wait_turn(&mut inner)?;
        Ok(inner)
    }

    fn writer(&self) -> TableResult<MutexGuard<'_, TableInner>> {
        let inner = self.guard()?;
        if self.read_only {
            return Err(TableError::ReadOnly);
        }
        Ok(inner)
    }

    // ========================================================================
    // Records
    // ========================================================================

    /// Returns the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Fails if the table is closed or busy.
    pub fn get(&self, key: &str) -> TableResult<Option<Record>> {
        self.guard()?.store.get_record(key)
    }

    /// Stores `record` under `key`, replacing any previous record.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty key or a record that uses the
    /// reserved `:pk` (or empty) column name, `ReadOnly` on read-only
    /// tables, or an I/O error if the log write fails.
    pub fn put(&self, key: &str, record: &Record) -> TableResult<()> {
        validate_key(key)?;
        record.check_columns()?;
        let mut inner = self.writer()?;
        inner.write_record(key, record)?;
        inner.settle()
    }

    /// Stores a dynamic value, which must be a map of text to text or an
    /// even-length array of texts.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for any other value; the table is not
    /// touched.
    pub fn put_value(&self, key: &str, value: Value) -> TableResult<()> {
        let record = Record::try_from(value)?;
        self.put(key, &record)
    }

    /// Stores `record` only if `key` is absent. Returns whether it was
    /// stored.
    ///
    /// # Errors
    ///
    /// Same as [`put`](Self::put).
    pub fn put_keep(&self, key: &str, record: &Record) -> TableResult<bool> {
        validate_key(key)?;
        record.check_columns()?;
        let mut inner = self.writer()?;
        if inner.store.contains(key) {
            return Ok(false);
        }
        inner.write_record(key, record)?;
        inner.settle()?;
        Ok(true)
    }

    /// Deletes the record under `key`, returning it. A missing key is not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns `ReadOnly` on read-only tables, or an I/O error if the log
    /// write fails.
    pub fn delete(&self, key: &str) -> TableResult<Option<Record>> {
        let mut inner = self.writer()?;
        let txid = inner.txid();
        let removed = inner.remove_record(key, txid)?;
        if removed.is_some() {
            inner.settle()?;
        }
        Ok(removed)
    }

    /// Fetches the present keys among `keys`, in the order asked.
    ///
    /// # Errors
    ///
    /// Fails if the table is closed or busy.
    pub fn get_many<I, S>(&self, keys: I) -> TableResult<Vec<(String, Record)>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let inner = self.guard()?;
        let mut found = Vec::new();
        for key in keys {
            let key = key.as_ref();
            if let Some(record) = inner.store.get_record(key)? {
                found.push((key.to_string(), record));
            }
        }
        Ok(found)
    }

    /// Returns the next value of the table's unique-id counter.
    ///
    /// Ids start at 1, strictly increase, survive reopening, and are never
    /// handed out twice, even when the surrounding transaction aborts or
    /// the table is cleared.
    ///
    /// # Errors
    ///
    /// Returns `ReadOnly` on read-only tables, or an I/O error if the log
    /// write fails.
    pub fn generate_unique_id(&self) -> TableResult<u64> {
        let mut inner = self.writer()?;
        let id = inner.store.next_unique_id();
        inner.log.append(&LogRecord::UniqueId { value: id })?;
        inner.log.commit_point()?;
        Ok(id)
    }

    /// Number of records.
    ///
    /// # Errors
    ///
    /// Fails if the table is closed or busy.
    pub fn size(&self) -> TableResult<usize> {
        Ok(self.guard()?.store.len())
    }

    /// Keys in lexical order, filtered and capped by `options`.
    ///
    /// # Errors
    ///
    /// Fails if the table is closed or busy.
    pub fn keys(&self, options: KeysOptions) -> TableResult<Vec<String>> {
        let inner = self.guard()?;
        let prefix = options.prefix.as_deref().unwrap_or("");
        Ok(inner
            .store
            .keys_with_prefix(prefix)
            .take(options.limit.unwrap_or(usize::MAX))
            .map(str::to_string)
            .collect())
    }

    /// A lazy cursor over the keys selected by `options`.
    ///
    /// # Errors
    ///
    /// Fails if the table is closed or busy.
    pub fn key_cursor(&self, options: KeysOptions) -> TableResult<KeyCursor<'_>> {
        let len = {
            let inner = self.guard()?;
            let prefix = options.prefix.as_deref().unwrap_or("");
            let matching = inner.store.keys_with_prefix(prefix).count();
            options.limit.map_or(matching, |limit| matching.min(limit))
        };
        Ok(KeyCursor::new(self, options, len))
    }

    pub(crate) fn next_key(&self, after: Option<&str>, prefix: &str) -> TableResult<Option<String>> {
        Ok(self
            .guard()?
            .store
            .next_key(after, prefix)
            .map(str::to_string))
    }

    /// Deletes every record whose key starts with `prefix`. Returns how
    /// many were deleted.
    ///
    /// # Errors
    ///
    /// Returns `ReadOnly` on read-only tables, or an I/O error if the log
    /// write fails.
    pub fn delete_keys_with_prefix(&self, prefix: &str) -> TableResult<usize> {
        let mut inner = self.writer()?;
        let count = inner.store.keys_with_prefix(prefix).count();
        if count == 0 {
            return Ok(0);
        }
        let txid = inner.txid();
        inner.log.append(&LogRecord::DeletePrefix {
            txid,
            prefix: prefix.to_string(),
        })?;
        let removed = inner.store.remove_prefix(prefix);
        if !inner.indexes.is_empty() {
            for (key, bytes) in &removed {
                let record = decode_record(bytes)?;
                inner.indexes.on_change(key, Some(&record), None);
            }
        }
        inner.journal(UndoEntry::Records { removed })?;
        inner.settle()?;
        debug!(prefix, count, "deleted keys with prefix");
        Ok(count)
    }

    /// Deletes every record. Index declarations and the unique-id counter
    /// are kept.
    ///
    /// # Errors
    ///
    /// Returns `ReadOnly` on read-only tables, or an I/O error if the log
    /// write fails.
    pub fn clear(&self) -> TableResult<()> {
        let mut inner = self.writer()?;
        let txid = inner.txid();
        inner.log.append(&LogRecord::Clear { txid })?;
        let removed = inner.store.take_all();
        inner.indexes.clear_entries();
        inner.journal(UndoEntry::Records { removed })?;
        inner.settle()
    }

    /// Every record, in key order.
    ///
    /// # Errors
    ///
    /// Fails if the table is closed or busy.
    pub fn values(&self) -> TableResult<Vec<Record>> {
        Ok(self.entries()?.into_iter().map(|(_, record)| record).collect())
    }

    /// Every (key, record) pair, in key order.
    ///
    /// # Errors
    ///
    /// Fails if the table is closed or busy.
    pub fn entries(&self) -> TableResult<Vec<(String, Record)>> {
        let inner = self.guard()?;
        inner
            .store
            .iter()
            .map(|(key, bytes)| Ok((key.to_string(), decode_record(bytes)?)))
            .collect()
    }

    /// The first pair in key order for which `predicate` holds.
    ///
    /// # Errors
    ///
    /// Fails if the table is closed or busy.
    pub fn find<P>(&self, mut predicate: P) -> TableResult<Option<(String, Record)>>
    where
        P: FnMut(&str, &Record) -> bool,
    {
        let inner = self.guard()?;
        for (key, bytes) in inner.store.iter() {
            let record = decode_record(bytes)?;
            if predicate(key, &record) {
                return Ok(Some((key.to_string(), record)));
            }
        }
        Ok(None)
    }

    // ========================================================================
    // Indexes
    // ========================================================================

    /// Declares, replaces or removes the index on `column` (`""` or `":pk"`
    /// for the primary key).
    ///
    /// Removing an index that does not exist is a no-op that still
    /// reports success, so repeated removals are idempotent. The return
    /// value is always `true`.
    ///
    /// # Errors
    ///
    /// Returns `ReadOnly` on read-only tables, or an I/O error if the log
    /// write fails.
    pub fn set_index(&self, column: &str, kind: IndexKind) -> TableResult<bool> {
        let mut inner = self.writer()?;
        let column = canonical_column(column).to_string();
        if kind == IndexKind::Remove && inner.indexes.definition(&column).is_none() {
            return Ok(true);
        }
        let txid = inner.txid();
        inner.log.append(&LogRecord::SetIndex {
            txid,
            column: column.clone(),
            kind,
        })?;
        let TableInner { store, indexes, .. } = &mut *inner;
        let previous = indexes.set(&column, kind, store)?;
        inner.journal(UndoEntry::Index { column, previous })?;
        inner.settle()?;
        Ok(true)
    }

    /// Declared indexes by column; the primary key appears as `""`.
    ///
    /// # Errors
    ///
    /// Fails if the table is closed or busy.
    pub fn indexes(&self) -> TableResult<BTreeMap<String, IndexKind>> {
        Ok(self.guard()?.indexes.definitions())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Runs a query built by `build`.
    ///
    /// ```rust
    /// use tabledb_core::{Operator, Record, Table};
    ///
    /// let table = Table::open_in_memory()?;
    /// table.put("pk0", &Record::from([("name", "jim"), ("age", "25")]))?;
    /// table.put("pk1", &Record::from([("name", "jack"), ("age", "44")]))?;
    ///
    /// let rows = table.query(|q| {
    ///     q.add("age", Operator::GreaterThan, "40").pk_only();
    /// })?;
    /// assert_eq!(rows.len(), 1);
    /// # Ok::<(), tabledb_core::TableError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a bad condition, or fails if the table
    /// is closed or busy.
    pub fn query<F>(&self, build: F) -> TableResult<Vec<Row>>
    where
        F: FnOnce(&mut QueryBuilder),
    {
        let query = build_query(build)?;
        self.run_query(&query)
    }

    /// Builds a query to run later with [`PreparedQuery::run`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a bad condition.
    pub fn prepare_query<F>(&self, build: F) -> TableResult<PreparedQuery<'_>>
    where
        F: FnOnce(&mut QueryBuilder),
    {
        Ok(PreparedQuery::new(self, build_query(build)?))
    }

    pub(crate) fn run_query(&self, query: &Query) -> TableResult<Vec<Row>> {
        let inner = self.guard()?;
        query::execute(query, &inner.store, &inner.indexes)
    }

    /// Reports whether the query would be answered from an index or by a
    /// full scan, without materializing rows.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a bad condition, or fails if the table
    /// is closed or busy.
    pub fn explain<F>(&self, build: F) -> TableResult<Plan>
    where
        F: FnOnce(&mut QueryBuilder),
    {
        let query = build_query(build)?;
        let inner = self.guard()?;
        Ok(query::plan(&query, &inner.indexes))
    }

    /// Deletes every record the query selects (after ordering, offset and
    /// limit). Returns how many were deleted.
    ///
    /// Outside a transaction the deletions are logged as one atomic batch.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a bad condition, `ReadOnly` on
    /// read-only tables, or an I/O error if the log write fails.
    pub fn delete_matching<F>(&self, build: F) -> TableResult<usize>
    where
        F: FnOnce(&mut QueryBuilder),
    {
        let query = build_query(build)?;
        let mut inner = self.writer()?;
        let (_, selected) = query::select(&query, &inner.store, &inner.indexes)?;
        if selected.is_empty() {
            return Ok(0);
        }

        let batch = inner.txn.is_none();
        let txid = if batch {
            let txid = inner.allocate_txid();
            inner.log.append(&LogRecord::Begin { txid })?;
            txid
        } else {
            inner.txid()
        };
        for (key, _) in &selected {
            inner.remove_record(key, txid)?;
        }
        if batch {
            inner.log.append(&LogRecord::Commit { txid })?;
        }
        inner.settle()?;
        debug!(deleted = selected.len(), "deleted query matches");
        Ok(selected.len())
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Starts a transaction owned by the calling thread.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if this thread already has one open,
    /// `Busy` if another thread's transaction outlasts the lock timeout, or
    /// `ReadOnly` on read-only tables.
    pub fn begin(&self) -> TableResult<()> {
        let mut inner = self.writer()?;
        if inner.txn.is_some() {
            return Err(TableError::invalid_argument(
                "a transaction is already active on this thread",
            ));
        }
        let txid = inner.allocate_txid();
        inner.log.append(&LogRecord::Begin { txid })?;
        inner.txn = Some(Transaction::new(txid));
        debug!(%txid, "transaction started");
        Ok(())
    }

    /// Commits the calling thread's transaction.
    ///
    /// # Errors
    ///
    /// Returns `TransactionState` if no transaction is active, or an I/O
    /// error if the commit marker cannot be written.
    pub fn commit(&self) -> TableResult<()> {
        let mut inner = self.guard()?;
        inner.commit_active()?;
        self.txn_released.notify_all();
        Ok(())
    }

    /// Rolls back the calling thread's transaction, restoring records and
    /// indexes to their state at `begin`.
    ///
    /// # Errors
    ///
    /// Returns `TransactionState` if no transaction is active.
    pub fn abort(&self) -> TableResult<()> {
        let mut inner = self.guard()?;
        let result = inner.abort_active();
        self.txn_released.notify_all();
        result
    }

    /// Whether the calling thread has an open transaction.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        let inner = self.inner.lock();
        inner.open
            && inner
                .txn
                .as_ref()
                .is_some_and(|txn| txn.is_active() && txn.is_owned_by_current_thread())
    }

    /// Runs `body` inside a transaction.
    ///
    /// The transaction commits when `body` returns `Ok` and aborts when it
    /// returns `Err` or panics. If `body` ends the transaction itself (for
    /// example with an explicit [`abort`](Self::abort)), that outcome
    /// stands.
    ///
    /// # Errors
    ///
    /// Returns the body's error after aborting, or the error raised by
    /// `begin` or `commit`. A failed abort after a body error is logged and
    /// the body's error is returned.
    pub fn transaction<T, E, F>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<TableError>,
    {
        self.begin()?;
        let guard = AbortOnUnwind { table: self };
        let result = body(self);
        std::mem::forget(guard);

        match result {
            Ok(value) => {
                if self.in_transaction() {
                    self.commit()?;
                }
                Ok(value)
            }
            Err(e) => {
                if self.in_transaction() {
                    if let Err(abort_err) = self.abort() {
                        warn!(error = %abort_err, "abort after failed transaction body failed");
                    }
                }
                Err(e)
            }
        }
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Rewrites the log so it holds only the current state.
    ///
    /// File-backed tables write the new log beside the old one and rename
    /// it into place, so a crash leaves either the old or the new log.
    ///
    /// # Errors
    ///
    /// Returns `TransactionState` while a transaction is open, `ReadOnly`
    /// on read-only tables, or an I/O error.
    pub fn compact(&self) -> TableResult<()> {
        let mut inner = self.writer()?;
        inner.compact(self.path.as_deref())
    }

    /// Flushes and syncs the log.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the sync fails.
    pub fn flush(&self) -> TableResult<()> {
        let mut inner = self.guard()?;
        if self.read_only {
            return Ok(());
        }
        inner.log.sync()
    }

    /// Closes the table: rolls back an open transaction, syncs the log,
    /// compacts if configured, and releases the file lock.
    ///
    /// Closing twice is a no-op. Every other method fails with `Closed`
    /// afterwards.
    ///
    /// # Errors
    ///
    /// Returns `Busy` if another thread's transaction outlasts the lock
    /// timeout, or an I/O error.
    pub fn close(&self) -> TableResult<()> {
        self.shutdown(true)
    }

    fn shutdown(&self, wait: bool) -> TableResult<()> {
        let mut inner = self.inner.lock();
        if !inner.open {
            return Ok(());
        }
        if wait {
            self.wait_turn(&mut inner)?;
        }

        if inner.txn.is_some() {
            warn!("closing table with an open transaction; rolling it back");
            inner.abort_active()?;
        }
        if !self.read_only {
            inner.log.sync()?;
            if self.config.compact_on_close {
                inner.compact(self.path.as_deref())?;
            }
        }
        if let Some(lock) = inner.lock.take() {
            lock.release()?;
        }
        inner.open = false;
        self.txn_released.notify_all();
        info!(
            path = ?self.path,
            records = inner.store.len(),
            "table closed"
        );
        Ok(())
    }

    /// Path of the table file; `None` for in-memory tables.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether mutations are rejected.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Whether [`close`](Self::close) has not been called yet.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.lock().open
    }

    /// The configuration the table was opened with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

fn validate_key(key: &str) -> TableResult<()> {
    if key.is_empty() {
        return Err(TableError::invalid_argument("primary key must not be empty"));
    }
    Ok(())
}

fn build_query<F>(build: F) -> TableResult<Query>
where
    F: FnOnce(&mut QueryBuilder),
{
    let mut builder = QueryBuilder::new();
    build(&mut builder);
    builder.build()
}

impl TableInner {
    fn txid(&self) -> TransactionId {
        self.txn
            .as_ref()
            .map_or(TransactionId::AUTOCOMMIT, Transaction::id)
    }

    fn allocate_txid(&mut self) -> TransactionId {
        let txid = TransactionId::new(self.next_txid);
        self.next_txid += 1;
        txid
    }

    fn journal(&mut self, entry: UndoEntry) -> TableResult<()> {
        match self.txn.as_mut() {
            Some(txn) => txn.record(entry),
            None => Ok(()),
        }
    }

    /// Commit point for autocommitted mutations.
    fn settle(&mut self) -> TableResult<()> {
        if self.txn.is_none() {
            self.log.commit_point()?;
        }
        Ok(())
    }

    fn write_record(&mut self, key: &str, record: &Record) -> TableResult<()> {
        let bytes = encode_record(record);
        let txid = self.txid();
        self.log.append(&LogRecord::Put {
            txid,
            key: key.to_string(),
            value: bytes.clone(),
        })?;
        let previous = self.store.put(key.to_string(), bytes);
        if !self.indexes.is_empty() {
            let old = previous.as_deref().map(decode_record).transpose()?;
            self.indexes.on_change(key, old.as_ref(), Some(record));
        }
        self.journal(UndoEntry::Record {
            key: key.to_string(),
            previous,
        })
    }

    fn remove_record(&mut self, key: &str, txid: TransactionId) -> TableResult<Option<Record>> {
        let Some(previous) = self.store.remove(key) else {
            return Ok(None);
        };
        if let Err(e) = self.log.append(&LogRecord::Delete {
            txid,
            key: key.to_string(),
        }) {
            self.store.put(key.to_string(), previous);
            return Err(e);
        }
        let old = decode_record(&previous)?;
        self.indexes.on_change(key, Some(&old), None);
        self.journal(UndoEntry::Record {
            key: key.to_string(),
            previous: Some(previous),
        })?;
        Ok(Some(old))
    }

    fn commit_active(&mut self) -> TableResult<()> {
        let Some(txid) = self.txn.as_ref().map(Transaction::id) else {
            return Err(TableError::transaction_state("no active transaction to commit"));
        };
        self.log.append(&LogRecord::Commit { txid })?;
        self.log.commit_point()?;
        if let Some(mut txn) = self.txn.take() {
            txn.mark_committed();
        }
        debug!(%txid, "transaction committed");
        Ok(())
    }

    fn abort_active(&mut self) -> TableResult<()> {
        let Some(txn) = self.txn.as_mut() else {
            return Err(TableError::transaction_state("no active transaction to abort"));
        };
        let txid = txn.id();
        let undo = txn.take_undo();
        let undone = undo.len();

        let restored = rollback(undo, &mut self.store, &mut self.indexes);
        let logged = self
            .log
            .append(&LogRecord::Abort { txid })
            .and_then(|_| self.log.commit_point());
        if let Some(mut txn) = self.txn.take() {
            txn.mark_aborted();
        }
        debug!(%txid, undone, "transaction aborted");
        restored.and(logged)
    }

    fn compact(&mut self, path: Option<&Path>) -> TableResult<()> {
        if self.txn.is_some() {
            return Err(TableError::transaction_state(
                "cannot compact while a transaction is active",
            ));
        }
        let before = self.log.size()?;

        let mut records = Vec::with_capacity(1 + self.indexes.len() + self.store.len());
        records.push(LogRecord::Snapshot {
            unique_id: self.store.unique_id(),
        });
        for (column, kind) in self.indexes.definitions() {
            records.push(LogRecord::SetIndex {
                txid: TransactionId::AUTOCOMMIT,
                column,
                kind,
            });
        }
        for (key, bytes) in self.store.iter() {
            records.push(LogRecord::Put {
                txid: TransactionId::AUTOCOMMIT,
                key: key.to_string(),
                value: bytes.to_vec(),
            });
        }

        match path {
            Some(path) => {
                let mut image = Vec::new();
                for record in &records {
                    image.extend_from_slice(&record.encode_frame()?);
                }
                file::replace_file(path, &image)?;
                let backend = FileBackend::open(
                    path,
                    FileOptions {
                        read_only: false,
                        create: false,
                        truncate: false,
                    },
                )?;
                self.log.replace_backend(Box::new(backend));
            }
            None => self.log.rewrite(&records)?,
        }

        info!(
            before,
            after = self.log.size()?,
            records = self.store.len(),
            "table compacted"
        );
        Ok(())
    }
}

/// Aborts the open transaction if the body of [`Table::transaction`]
/// unwinds.
struct AbortOnUnwind<'t> {
    table: &'t Table,
}

impl Drop for AbortOnUnwind<'_> {
    fn drop(&mut self) {
        if thread::panicking() && self.table.in_transaction() {
            if let Err(e) = self.table.abort() {
                warn!(error = %e, "failed to roll back transaction after panic");
            }
        }
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Table")
            .field("path", &self.path)
            .field("open", &inner.open)
            .field("records", &inner.store.len())
            .field("indexes", &inner.indexes.len())
            .field(
                "transaction",
                &inner
                    .txn
                    .as_ref()
                    .map(|txn| (txn.id(), txn.state(), txn.undo_len())),
            )
            .finish_non_exhaustive()
    }
}

impl Drop for Table {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown(false) {
            warn!(error = %e, "error closing table on drop");
        }
    }
}
