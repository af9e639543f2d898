//! Single-file backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::{Mutex, RwLock};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// How a [`FileBackend`] opens its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileOptions {
    /// Open without write access. Implies no creation and no truncation.
    pub read_only: bool,
    /// Create the file when it does not exist.
    pub create: bool,
    /// Discard existing contents on open.
    pub truncate: bool,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            read_only: false,
            create: true,
            truncate: false,
        }
    }
}

impl FileOptions {
    /// Options for a read-only open of an existing file.
    #[must_use]
    pub const fn read_only() -> Self {
        Self {
            read_only: true,
            create: false,
            truncate: false,
        }
    }
}

/// A backend stored in one file.
///
/// Reads seek and read under a lock; appends always go to the end of the
/// file. The cached size is the source of truth for offsets, so a torn
/// write left by a crash is simply overwritten by the next truncate.
///
/// # Example
///
/// ```no_run
/// use tabledb_storage::{FileBackend, FileOptions, StorageBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("people.tdb"), FileOptions::default()).unwrap();
/// backend.append(b"frame").unwrap();
/// backend.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: Mutex<File>,
    size: RwLock<u64>,
    read_only: bool,
}

impl FileBackend {
    /// Opens the file at `path` according to `options`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the file is missing and may not be created,
    /// or an I/O error from the operating system.
    pub fn open(path: &Path, options: FileOptions) -> StorageResult<Self> {
        let create = options.create && !options.read_only;
        if !create && !path.exists() {
            return Err(StorageError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let file = OpenOptions::new()
            .read(true)
            .write(!options.read_only)
            .create(create)
            .truncate(false)
            .open(path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => StorageError::NotFound {
                    path: path.to_path_buf(),
                },
                _ => StorageError::Io(e),
            })?;

        if options.truncate && !options.read_only {
            file.set_len(0)?;
        }

        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            size: RwLock::new(size),
            read_only: options.read_only,
        })
    }

    /// Path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let size = *self.size.read();
        if offset.saturating_add(len as u64) > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }
        if len == 0 {
            return Ok(Vec::new());
        }

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        if self.read_only {
            return Err(StorageError::ReadOnly);
        }

        let mut size = self.size.write();
        let offset = *size;
        if data.is_empty() {
            return Ok(offset);
        }

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        *size += data.len() as u64;
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        if !self.read_only {
            self.file.lock().flush()?;
        }
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        if !self.read_only {
            self.file.lock().sync_all()?;
        }
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(*self.size.read())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        if self.read_only {
            return Err(StorageError::ReadOnly);
        }

        let mut size = self.size.write();
        if new_size > *size {
            return Err(StorageError::InvalidTruncate {
                requested: new_size,
                size: *size,
            });
        }

        let file = self.file.lock();
        file.set_len(new_size)?;
        file.sync_all()?;
        *size = new_size;
        Ok(())
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_missing_file_by_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.tdb");

        let backend = FileBackend::open(&path, FileOptions::default()).unwrap();
        assert_eq!(backend.size().unwrap(), 0);
        assert!(path.exists());
        assert_eq!(backend.path(), path);
    }

    #[test]
    fn read_only_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.tdb");

        let result = FileBackend::open(&path, FileOptions::read_only());
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn no_create_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.tdb");
        let options = FileOptions {
            create: false,
            ..FileOptions::default()
        };

        assert!(matches!(
            FileBackend::open(&path, options),
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn append_then_read_back() {
        let dir = tempdir().unwrap();
        let mut backend =
            FileBackend::open(&dir.path().join("t.tdb"), FileOptions::default()).unwrap();

        assert_eq!(backend.append(b"name").unwrap(), 0);
        assert_eq!(backend.append(b"jim").unwrap(), 4);
        assert_eq!(backend.read_at(4, 3).unwrap(), b"jim");
        assert_eq!(backend.read_all().unwrap(), b"namejim");
    }

    #[test]
    fn read_past_end_fails() {
        let dir = tempdir().unwrap();
        let mut backend =
            FileBackend::open(&dir.path().join("t.tdb"), FileOptions::default()).unwrap();
        backend.append(b"abc").unwrap();

        assert!(matches!(
            backend.read_at(2, 5),
            Err(StorageError::ReadPastEnd { .. })
        ));
    }

    #[test]
    fn contents_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.tdb");
        {
            let mut backend = FileBackend::open(&path, FileOptions::default()).unwrap();
            backend.append(b"durable").unwrap();
            backend.sync().unwrap();
        }

        let backend = FileBackend::open(&path, FileOptions::read_only()).unwrap();
        assert!(backend.is_read_only());
        assert_eq!(backend.read_all().unwrap(), b"durable");
    }

    #[test]
    fn read_only_rejects_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.tdb");
        FileBackend::open(&path, FileOptions::default()).unwrap();

        let mut backend = FileBackend::open(&path, FileOptions::read_only()).unwrap();
        assert!(matches!(backend.append(b"x"), Err(StorageError::ReadOnly)));
        assert!(matches!(backend.truncate(0), Err(StorageError::ReadOnly)));
    }

    #[test]
    fn truncate_on_open_discards_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.tdb");
        {
            let mut backend = FileBackend::open(&path, FileOptions::default()).unwrap();
            backend.append(b"old data").unwrap();
            backend.sync().unwrap();
        }

        let options = FileOptions {
            truncate: true,
            ..FileOptions::default()
        };
        let backend = FileBackend::open(&path, options).unwrap();
        assert_eq!(backend.size().unwrap(), 0);
    }

    #[test]
    fn truncate_shrinks_and_appends_continue() {
        let dir = tempdir().unwrap();
        let mut backend =
            FileBackend::open(&dir.path().join("t.tdb"), FileOptions::default()).unwrap();
        backend.append(b"hello world").unwrap();

        backend.truncate(5).unwrap();
        assert_eq!(backend.append(b"!").unwrap(), 5);
        assert_eq!(backend.read_all().unwrap(), b"hello!");
        assert!(matches!(
            backend.truncate(100),
            Err(StorageError::InvalidTruncate { .. })
        ));
    }
}
