//! Log record types and payload serialization.

use crate::error::{TableError, TableResult};
use crate::index::IndexKind;
use crate::types::TransactionId;

/// Magic bytes opening every log frame.
pub const LOG_MAGIC: [u8; 4] = *b"TTLG";

/// Current log format version.
pub const LOG_VERSION: u16 = 1;

/// magic (4) + version (2) + type (1) + length (4)
pub(crate) const HEADER_SIZE: usize = 11;

pub(crate) const CRC_SIZE: usize = 4;

/// Type byte of a log frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LogRecordType {
    /// A transaction started.
    Begin = 1,
    /// A record was stored.
    Put = 2,
    /// A record was deleted.
    Delete = 3,
    /// Every record under a key prefix was deleted.
    DeletePrefix = 4,
    /// Every record was deleted.
    Clear = 5,
    /// An index was declared or removed.
    SetIndex = 6,
    /// The unique-id counter advanced.
    UniqueId = 7,
    /// A transaction committed.
    Commit = 8,
    /// A transaction was rolled back.
    Abort = 9,
    /// Start of a compacted log.
    Snapshot = 10,
}

impl LogRecordType {
    /// Converts a byte to a record type.
    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Begin),
            2 => Some(Self::Put),
            3 => Some(Self::Delete),
            4 => Some(Self::DeletePrefix),
            5 => Some(Self::Clear),
            6 => Some(Self::SetIndex),
            7 => Some(Self::UniqueId),
            8 => Some(Self::Commit),
            9 => Some(Self::Abort),
            10 => Some(Self::Snapshot),
            _ => None,
        }
    }

    /// Converts the record type to a byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// One entry of the table log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    /// A transaction started.
    Begin {
        /// Transaction id.
        txid: TransactionId,
    },
    /// `key` now holds the encoded record `value`.
    Put {
        /// Owning transaction, or autocommit.
        txid: TransactionId,
        /// Primary key.
        key: String,
        /// Encoded record.
        value: Vec<u8>,
    },
    /// `key` was deleted.
    Delete {
        /// Owning transaction, or autocommit.
        txid: TransactionId,
        /// Primary key.
        key: String,
    },
    /// Every key starting with `prefix` was deleted.
    DeletePrefix {
        /// Owning transaction, or autocommit.
        txid: TransactionId,
        /// Key prefix.
        prefix: String,
    },
    /// Every record was deleted.
    Clear {
        /// Owning transaction, or autocommit.
        txid: TransactionId,
    },
    /// An index on `column` was declared with `kind`.
    SetIndex {
        /// Owning transaction, or autocommit.
        txid: TransactionId,
        /// Indexed column, `""` for the primary key.
        column: String,
        /// Declared kind; `Remove` drops the index.
        kind: IndexKind,
    },
    /// The unique-id counter reached `value`. Never rolled back.
    UniqueId {
        /// Last id handed out.
        value: u64,
    },
    /// A transaction committed.
    Commit {
        /// Transaction id.
        txid: TransactionId,
    },
    /// A transaction was rolled back.
    Abort {
        /// Transaction id.
        txid: TransactionId,
    },
    /// First frame of a compacted log.
    Snapshot {
        /// Unique-id counter at compaction time.
        unique_id: u64,
    },
}

impl LogRecord {
    /// Largest payload a frame can carry.
    pub const MAX_PAYLOAD_SIZE: usize = u32::MAX as usize;

    /// Returns the record type.
    #[must_use]
    pub fn record_type(&self) -> LogRecordType {
        match self {
            Self::Begin { .. } => LogRecordType::Begin,
            Self::Put { .. } => LogRecordType::Put,
            Self::Delete { .. } => LogRecordType::Delete,
            Self::DeletePrefix { .. } => LogRecordType::DeletePrefix,
            Self::Clear { .. } => LogRecordType::Clear,
            Self::SetIndex { .. } => LogRecordType::SetIndex,
            Self::UniqueId { .. } => LogRecordType::UniqueId,
            Self::Commit { .. } => LogRecordType::Commit,
            Self::Abort { .. } => LogRecordType::Abort,
            Self::Snapshot { .. } => LogRecordType::Snapshot,
        }
    }

    /// The transaction this record belongs to, if any.
    #[must_use]
    pub fn txid(&self) -> Option<TransactionId> {
        match self {
            Self::Begin { txid }
            | Self::Put { txid, .. }
            | Self::Delete { txid, .. }
            | Self::DeletePrefix { txid, .. }
            | Self::Clear { txid }
            | Self::SetIndex { txid, .. }
            | Self::Commit { txid }
            | Self::Abort { txid } => Some(*txid),
            Self::UniqueId { .. } | Self::Snapshot { .. } => None,
        }
    }

    /// Serializes the payload (without the frame).
    ///
    /// # Errors
    ///
    /// Fails if a key or value does not fit a 4-byte length.
    pub fn encode_payload(&self) -> TableResult<Vec<u8>> {
        let mut buf = Vec::new();
        match self {
            Self::Begin { txid }
            | Self::Clear { txid }
            | Self::Commit { txid }
            | Self::Abort { txid } => {
                buf.extend_from_slice(&txid.as_u64().to_le_bytes());
            }
            Self::Put { txid, key, value } => {
                buf.extend_from_slice(&txid.as_u64().to_le_bytes());
                put_bytes(&mut buf, key.as_bytes())?;
                put_bytes(&mut buf, value)?;
            }
            Self::Delete { txid, key: text }
            | Self::DeletePrefix {
                txid,
                prefix: text,
            } => {
                buf.extend_from_slice(&txid.as_u64().to_le_bytes());
                put_bytes(&mut buf, text.as_bytes())?;
            }
            Self::SetIndex { txid, column, kind } => {
                buf.extend_from_slice(&txid.as_u64().to_le_bytes());
                put_bytes(&mut buf, column.as_bytes())?;
                buf.push(kind.as_byte());
            }
            Self::UniqueId { value: n } | Self::Snapshot { unique_id: n } => {
                buf.extend_from_slice(&n.to_le_bytes());
            }
        }
        Ok(buf)
    }

    /// Deserializes a record from its type and payload.
    ///
    /// # Errors
    ///
    /// Returns `Corruption` for short payloads, trailing bytes, invalid
    /// UTF-8 keys or unknown index kinds.
    pub fn decode_payload(record_type: LogRecordType, payload: &[u8]) -> TableResult<Self> {
        let mut reader = PayloadReader::new(payload);
        let record = match record_type {
            LogRecordType::Begin => Self::Begin {
                txid: reader.txid()?,
            },
            LogRecordType::Clear => Self::Clear {
                txid: reader.txid()?,
            },
            LogRecordType::Commit => Self::Commit {
                txid: reader.txid()?,
            },
            LogRecordType::Abort => Self::Abort {
                txid: reader.txid()?,
            },
            LogRecordType::Put => Self::Put {
                txid: reader.txid()?,
                key: reader.string()?,
                value: reader.bytes()?.to_vec(),
            },
            LogRecordType::Delete => Self::Delete {
                txid: reader.txid()?,
                key: reader.string()?,
            },
            LogRecordType::DeletePrefix => Self::DeletePrefix {
                txid: reader.txid()?,
                prefix: reader.string()?,
            },
            LogRecordType::SetIndex => Self::SetIndex {
                txid: reader.txid()?,
                column: reader.string()?,
                kind: IndexKind::from_byte(reader.u8()?)?,
            },
            LogRecordType::UniqueId => Self::UniqueId {
                value: reader.u64()?,
            },
            LogRecordType::Snapshot => Self::Snapshot {
                unique_id: reader.u64()?,
            },
        };
        reader.finish(record_type)?;
        Ok(record)
    }

    /// Serializes the full frame: header, payload and checksum.
    ///
    /// # Errors
    ///
    /// Propagates payload encoding failures.
    pub fn encode_frame(&self) -> TableResult<Vec<u8>> {
        let payload = self.encode_payload()?;
        let len = u32::try_from(payload.len())
            .map_err(|_| TableError::invalid_argument("log record payload too large"))?;

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        frame.extend_from_slice(&LOG_MAGIC);
        frame.extend_from_slice(&LOG_VERSION.to_le_bytes());
        frame.push(self.record_type().as_byte());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&payload);

        let crc = compute_crc32(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        Ok(frame)
    }
}

fn put_bytes(buf: &mut Vec<u8>, data: &[u8]) -> TableResult<()> {
    let len = u32::try_from(data.len())
        .map_err(|_| TableError::invalid_argument("log field larger than 4 GiB"))?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(data);
    Ok(())
}

struct PayloadReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> TableResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| TableError::corruption("unexpected end of log payload"))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> TableResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> TableResult<u32> {
        let bytes: [u8; 4] = self
            .take(4)?
            .try_into()
            .map_err(|_| TableError::corruption("invalid u32"))?;
        Ok(u32::from_le_bytes(bytes))
    }

    fn u64(&mut self) -> TableResult<u64> {
        let bytes: [u8; 8] = self
            .take(8)?
            .try_into()
            .map_err(|_| TableError::corruption("invalid u64"))?;
        Ok(u64::from_le_bytes(bytes))
    }

    fn txid(&mut self) -> TableResult<TransactionId> {
        self.u64().map(TransactionId::new)
    }

    fn bytes(&mut self) -> TableResult<&'a [u8]> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    fn string(&mut self) -> TableResult<String> {
        let bytes = self.bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| TableError::corruption("log key is not valid UTF-8"))
    }

    fn finish(&self, record_type: LogRecordType) -> TableResult<()> {
        if self.pos != self.data.len() {
            return Err(TableError::corruption(format!(
                "trailing bytes in {record_type:?} record: expected {} bytes, got {}",
                self.pos,
                self.data.len()
            )));
        }
        Ok(())
    }
}

/// Computes the IEEE CRC32 of `data`.
#[must_use]
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ 0xEDB8_8320
                } else {
                    crc >> 1
                };
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        crc = (crc >> 8) ^ CRC32_TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize];
    }
    !crc
}
