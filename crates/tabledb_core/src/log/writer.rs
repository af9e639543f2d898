//! Log writer.

use crate::error::TableResult;
use crate::log::record::LogRecord;
use tabledb_storage::StorageBackend;
use tracing::trace;

/// Appends frames to the table's backend.
///
/// The log is the table's only persistent state: every mutation is
/// appended here before it is applied in memory. A commit point flushes
/// and, when configured, syncs what was appended.
pub struct TableLog {
    backend: Box<dyn StorageBackend>,
    sync_on_commit: bool,
}

impl TableLog {
    /// Wraps a backend.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_commit: bool) -> Self {
        Self {
            backend,
            sync_on_commit,
        }
    }

    /// Appends one record. Returns the offset of its frame.
    ///
    /// # Errors
    ///
    /// Fails on oversized payloads, read-only backends or I/O failure.
    pub fn append(&mut self, record: &LogRecord) -> TableResult<u64> {
        let frame = record.encode_frame()?;
        let offset = self.backend.append(&frame)?;
        trace!(offset, kind = ?record.record_type(), "log append");
        Ok(offset)
    }

    /// Makes everything appended so far durable as configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush or sync fails.
    pub fn commit_point(&mut self) -> TableResult<()> {
        self.backend.flush()?;
        if self.sync_on_commit {
            self.backend.sync()?;
        }
        Ok(())
    }

    /// Flushes and syncs unconditionally.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush or sync fails.
    pub fn sync(&mut self) -> TableResult<()> {
        self.backend.flush()?;
        self.backend.sync()?;
        Ok(())
    }

    /// Reads the whole log image.
    ///
    /// # Errors
    ///
    /// Propagates backend read failures.
    pub fn read_image(&self) -> TableResult<Vec<u8>> {
        Ok(self.backend.read_all()?)
    }

    /// Drops everything at or after `len`.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn truncate(&mut self, len: u64) -> TableResult<()> {
        self.backend.truncate(len)?;
        Ok(())
    }

    /// Replaces the log contents with `records` in place and syncs.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn rewrite(&mut self, records: &[LogRecord]) -> TableResult<()> {
        self.backend.truncate(0)?;
        for record in records {
            self.append(record)?;
        }
        self.sync()
    }

    /// Swaps in a new backend, returning the old one.
    pub fn replace_backend(
        &mut self,
        backend: Box<dyn StorageBackend>,
    ) -> Box<dyn StorageBackend> {
        std::mem::replace(&mut self.backend, backend)
    }

    /// Current log size in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    pub fn size(&self) -> TableResult<u64> {
        Ok(self.backend.size()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::LogReader;
    use crate::types::TransactionId;
    use tabledb_storage::InMemoryBackend;

    fn put(key: &str) -> LogRecord {
        LogRecord::Put {
            txid: TransactionId::AUTOCOMMIT,
            key: key.into(),
            value: vec![0x80],
        }
    }

    #[test]
    fn append_and_read_back() {
        let mut log = TableLog::new(Box::new(InMemoryBackend::new()), true);
        assert_eq!(log.append(&put("a")).unwrap(), 0);
        let second = log.append(&put("b")).unwrap();
        assert!(second > 0);
        log.commit_point().unwrap();

        let image = log.read_image().unwrap();
        let records: Vec<_> = LogReader::new(&image).map(|r| r.unwrap().1).collect();
        assert_eq!(records, vec![put("a"), put("b")]);
    }

    #[test]
    fn rewrite_replaces_contents() {
        let mut log = TableLog::new(Box::new(InMemoryBackend::new()), false);
        for key in ["a", "b", "c"] {
            log.append(&put(key)).unwrap();
        }
        log.rewrite(&[put("z")]).unwrap();

        let image = log.read_image().unwrap();
        let records: Vec<_> = LogReader::new(&image).map(|r| r.unwrap().1).collect();
        assert_eq!(records, vec![put("z")]);
        assert_eq!(log.size().unwrap(), image.len() as u64);
    }
}
