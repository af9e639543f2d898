//! The backend trait.

use crate::error::StorageResult;

/// An append-only byte store with random reads.
///
/// Table files are written strictly at the end; the only way to shrink a
/// backend is [`truncate`](StorageBackend::truncate), which compaction and
/// truncate-on-open use.
///
/// # Invariants
///
/// - `append` returns the offset the bytes were written at
/// - `read_at(offset, len)` returns exactly what was appended there
/// - after `sync` returns, everything appended survives a crash
///
/// Implementations must be `Send + Sync` so a table handle can be shared
/// between threads.
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes at `offset`.
    ///
    /// # Errors
    ///
    /// Fails with `ReadPastEnd` if the range is not fully stored, or on I/O
    /// failure.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends `data` and returns the offset it starts at.
    ///
    /// # Errors
    ///
    /// Fails with `ReadOnly` on read-only backends, or on I/O failure.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Pushes buffered writes to the operating system.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Forces data and metadata to stable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Current size in bytes, which is also the next append offset.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Drops every byte at or after `new_size`.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidTruncate` if `new_size` exceeds the current size,
    /// `ReadOnly` on read-only backends, or on I/O failure.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;

    /// Whether writes are rejected.
    fn is_read_only(&self) -> bool {
        false
    }

    /// Reads the whole store.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`size`](StorageBackend::size) and
    /// [`read_at`](StorageBackend::read_at).
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        let size = self.size()?;
        self.read_at(0, size as usize)
    }
}
