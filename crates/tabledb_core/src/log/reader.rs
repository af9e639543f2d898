//! Frame-by-frame log reader.

use crate::error::{TableError, TableResult};
use crate::log::record::{
    compute_crc32, LogRecord, LogRecordType, CRC_SIZE, HEADER_SIZE, LOG_MAGIC, LOG_VERSION,
};

/// Iterates over the frames of a log image.
///
/// A frame cut short at the end of the image (a crash mid-append) ends the
/// iteration cleanly; [`LogReader::valid_len`] then tells how many bytes
/// hold complete frames. Damage anywhere else is an error:
///
/// - checksum mismatch
/// - wrong magic
/// - unknown record type
/// - a version newer than this build understands
pub struct LogReader<'a> {
    data: &'a [u8],
    offset: usize,
    finished: bool,
}

impl<'a> LogReader<'a> {
    /// Creates a reader over a full log image.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            finished: false,
        }
    }

    /// Bytes consumed by complete frames so far.
    #[must_use]
    pub fn valid_len(&self) -> u64 {
        self.offset as u64
    }

    /// Whether bytes remain after the last complete frame.
    #[must_use]
    pub fn has_torn_tail(&self) -> bool {
        self.finished && self.offset < self.data.len()
    }

    fn read_next(&mut self) -> TableResult<Option<(u64, LogRecord)>> {
        let start = self.offset;
        let rest = &self.data[start..];
        if rest.len() < HEADER_SIZE {
            return Ok(None);
        }

        if rest[0..4] != LOG_MAGIC {
            return Err(TableError::corruption(format!("invalid magic at offset {start}")));
        }

        let version = u16::from_le_bytes([rest[4], rest[5]]);
        if version > LOG_VERSION {
            return Err(TableError::corruption(format!(
                "unsupported log version {version} at offset {start}"
            )));
        }

        let type_byte = rest[6];
        let record_type = LogRecordType::from_byte(type_byte).ok_or_else(|| {
            TableError::corruption(format!("unknown record type {type_byte} at offset {start}"))
        })?;

        let payload_len = u32::from_le_bytes([rest[7], rest[8], rest[9], rest[10]]) as usize;
        let Some(total_len) = HEADER_SIZE
            .checked_add(payload_len)
            .and_then(|n| n.checked_add(CRC_SIZE))
        else {
            return Ok(None);
        };
        if rest.len() < total_len {
            return Ok(None);
        }

        let payload_end = HEADER_SIZE + payload_len;
        let stored = u32::from_le_bytes([
            rest[payload_end],
            rest[payload_end + 1],
            rest[payload_end + 2],
            rest[payload_end + 3],
        ]);
        let computed = compute_crc32(&rest[..payload_end]);
        if stored != computed {
            return Err(TableError::ChecksumMismatch {
                offset: start as u64,
                expected: stored,
                actual: computed,
            });
        }

        let record = LogRecord::decode_payload(record_type, &rest[HEADER_SIZE..payload_end])?;
        self.offset += total_len;
        Ok(Some((start as u64, record)))
    }
}

impl Iterator for LogReader<'_> {
    type Item = TableResult<(u64, LogRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_next() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionId;
    use proptest::prelude::*;

    fn image(records: &[LogRecord]) -> Vec<u8> {
        records
            .iter()
            .flat_map(|r| r.encode_frame().unwrap())
            .collect()
    }

    fn sample() -> Vec<LogRecord> {
        vec![
            LogRecord::Put {
                txid: TransactionId::AUTOCOMMIT,
                key: "a".into(),
                value: vec![0x80],
            },
            LogRecord::Delete {
                txid: TransactionId::AUTOCOMMIT,
                key: "a".into(),
            },
        ]
    }

    #[test]
    fn reads_every_frame() {
        let data = image(&sample());
        let mut reader = LogReader::new(&data);
        let records: Vec<_> = reader.by_ref().map(|r| r.unwrap().1).collect();
        assert_eq!(records, sample());
        assert_eq!(reader.valid_len(), data.len() as u64);
        assert!(!reader.has_torn_tail());
    }

    #[test]
    fn empty_image_is_empty() {
        assert_eq!(LogReader::new(&[]).count(), 0);
    }

    #[test]
    fn torn_tail_stops_cleanly() {
        let mut data = image(&sample());
        let first_len = sample()[0].encode_frame().unwrap().len();
        data.truncate(data.len() - 2);

        let mut reader = LogReader::new(&data);
        let records: Vec<_> = reader.by_ref().collect::<TableResult<_>>().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(reader.valid_len(), first_len as u64);
        assert!(reader.has_torn_tail());
    }

    #[test]
    fn flipped_byte_is_checksum_error() {
        let mut data = image(&sample());
        data[HEADER_SIZE + 2] ^= 0xFF;
        let err = LogReader::new(&data).next().unwrap().unwrap_err();
        assert!(matches!(err, TableError::ChecksumMismatch { offset: 0, .. }));
    }

    #[test]
    fn bad_magic_is_corruption() {
        let mut data = image(&sample());
        data[0] = b'X';
        let err = LogReader::new(&data).next().unwrap().unwrap_err();
        assert!(matches!(err, TableError::Corruption { .. }));
    }

    #[test]
    fn future_version_is_corruption() {
        let mut data = image(&sample());
        data[4] = 0xFF;
        let err = LogReader::new(&data).next().unwrap().unwrap_err();
        assert!(matches!(err, TableError::Corruption { .. }));
    }

    proptest! {
        #[test]
        fn arbitrary_bytes_never_panic(data in prop::collection::vec(any::<u8>(), 0..96)) {
            let mut reader = LogReader::new(&data);
            for item in reader.by_ref() {
                if item.is_err() {
                    break;
                }
            }
            prop_assert!(reader.valid_len() <= data.len() as u64);
        }

        #[test]
        fn any_cut_of_a_valid_log_is_a_clean_prefix(cut in 0usize..200) {
            let data = image(&sample());
            let cut = cut.min(data.len());
            let mut reader = LogReader::new(&data[..cut]);
            let read = reader.by_ref().collect::<TableResult<Vec<_>>>();
            prop_assert!(read.is_ok());
            prop_assert!(reader.valid_len() <= cut as u64);
        }
    }
}
