//! Table file management: advisory locking and atomic replacement.
//!
//! A table at `people.tdb` uses two sidecar files next to it:
//!
//! ```text
//! people.tdb           the table log
//! people.tdb.lock      advisory lock (fs2), never holds data
//! people.tdb.compact   compaction output, renamed over the log when complete
//! ```
//!
//! The lock lives in its own file so replacing the log during compaction
//! does not drop it.

use crate::error::{TableError, TableResult};
use fs2::FileExt;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Path of the lock file guarding the table at `path`.
#[must_use]
pub fn lock_path(path: &Path) -> PathBuf {
    with_suffix(path, ".lock")
}

/// Path compaction writes to before renaming over the table at `path`.
#[must_use]
pub fn compaction_path(path: &Path) -> PathBuf {
    with_suffix(path, ".compact")
}

/// An advisory lock on a table, held until released or dropped.
///
/// Writers take the lock exclusively; read-only handles share it.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
    shared: bool,
}

impl FileLock {
    /// Takes the lock for the table at `table_path` without blocking.
    ///
    /// # Errors
    ///
    /// Returns `Locked` if a conflicting lock is held, or an I/O error if
    /// the lock file cannot be opened.
    pub fn acquire(table_path: &Path, shared: bool) -> TableResult<Self> {
        let path = lock_path(table_path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let locked = if shared {
            FileExt::try_lock_shared(&file)
        } else {
            FileExt::try_lock_exclusive(&file)
        };
        if locked.is_err() {
            return Err(TableError::Locked);
        }
        debug!(path = %path.display(), shared, "table lock acquired");
        Ok(Self { file, path, shared })
    }

    /// Whether this is a shared (reader) lock.
    #[must_use]
    pub fn is_shared(&self) -> bool {
        self.shared
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Releases the lock.
    ///
    /// # Errors
    ///
    /// Returns an error if unlocking fails.
    pub fn release(self) -> TableResult<()> {
        FileExt::unlock(&self.file)?;
        debug!(path = %self.path.display(), "table lock released");
        Ok(())
    }
}

/// Atomically replaces `target` with `contents`.
///
/// The bytes go to [`compaction_path`] first, are synced, and are then
/// renamed over `target`; the directory is synced last so the rename is
/// durable.
///
/// # Errors
///
/// Returns an error on any I/O failure. `target` is untouched unless the
/// rename itself succeeded.
pub fn replace_file(target: &Path, contents: &[u8]) -> TableResult<()> {
    let temp = compaction_path(target);
    let mut file = File::create(&temp)?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp, target)?;
    sync_directory(target)
}

/// Syncs the directory containing `path`.
///
/// # Errors
///
/// Returns an error if the directory cannot be opened or synced.
#[cfg(unix)]
pub fn sync_directory(path: &Path) -> TableResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    File::open(dir)?.sync_all()?;
    Ok(())
}

/// Syncs the directory containing `path`.
///
/// NTFS journals metadata, so there is nothing to do here.
///
/// # Errors
///
/// Never fails on this platform.
#[cfg(not(unix))]
pub fn sync_directory(_path: &Path) -> TableResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn sidecar_paths() {
        let path = Path::new("tmp/people.tdb");
        assert_eq!(lock_path(path), PathBuf::from("tmp/people.tdb.lock"));
        assert_eq!(compaction_path(path), PathBuf::from("tmp/people.tdb.compact"));
    }

    #[test]
    fn exclusive_lock_excludes() {
        let temp = tempdir().unwrap();
        let table = temp.path().join("t.tdb");

        let lock = FileLock::acquire(&table, false).unwrap();
        assert!(matches!(
            FileLock::acquire(&table, false),
            Err(TableError::Locked)
        ));
        assert!(matches!(
            FileLock::acquire(&table, true),
            Err(TableError::Locked)
        ));
        lock.release().unwrap();
        FileLock::acquire(&table, false).unwrap();
    }

    #[test]
    fn shared_locks_coexist() {
        let temp = tempdir().unwrap();
        let table = temp.path().join("t.tdb");

        let first = FileLock::acquire(&table, true).unwrap();
        let second = FileLock::acquire(&table, true).unwrap();
        assert!(first.is_shared() && second.is_shared());
        assert!(FileLock::acquire(&table, false).is_err());
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = tempdir().unwrap();
        let table = temp.path().join("t.tdb");
        {
            let _lock = FileLock::acquire(&table, false).unwrap();
        }
        FileLock::acquire(&table, false).unwrap();
    }

    #[test]
    fn replace_file_swaps_contents() {
        let temp = tempdir().unwrap();
        let target = temp.path().join("t.tdb");
        fs::write(&target, b"old").unwrap();

        replace_file(&target, b"new contents").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"new contents");
        assert!(!compaction_path(&target).exists());
    }
}
