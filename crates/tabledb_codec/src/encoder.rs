//! Record encoder.

use crate::record::Record;

/// CBOR major type for text strings.
pub(crate) const MAJOR_TEXT: u8 = 3;

/// CBOR major type for arrays.
pub(crate) const MAJOR_ARRAY: u8 = 4;

/// Encodes a record into its stored form.
#[must_use]
pub fn encode_record(record: &Record) -> Vec<u8> {
    let mut encoder = RecordEncoder::with_capacity(record.encoded_len_hint());
    encoder.encode(record);
    encoder.into_bytes()
}

/// Streaming record encoder.
///
/// Several records may be written back to back into one buffer; the core
/// log uses this to frame payloads without intermediate allocations.
#[derive(Debug, Default)]
pub struct RecordEncoder {
    buffer: Vec<u8>,
}

impl RecordEncoder {
    /// Creates an empty encoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an encoder with `capacity` bytes preallocated.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Appends the encoding of `record`.
    pub fn encode(&mut self, record: &Record) {
        self.write_head(MAJOR_ARRAY, (record.len() * 2) as u64);
        for (name, value) in record.iter() {
            self.write_text(name);
            self.write_text(value);
        }
    }

    /// Bytes written so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the encoder.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    fn write_text(&mut self, text: &str) {
        self.write_head(MAJOR_TEXT, text.len() as u64);
        self.buffer.extend_from_slice(text.as_bytes());
    }

    #[allow(clippy::cast_possible_truncation)]
    fn write_head(&mut self, major_type: u8, value: u64) {
        let mt = major_type << 5;

        if value < 24 {
            self.buffer.push(mt | value as u8);
        } else if let Ok(v) = u8::try_from(value) {
            self.buffer.push(mt | 24);
            self.buffer.push(v);
        } else if let Ok(v) = u16::try_from(value) {
            self.buffer.push(mt | 25);
            self.buffer.extend_from_slice(&v.to_be_bytes());
        } else if let Ok(v) = u32::try_from(value) {
            self.buffer.push(mt | 26);
            self.buffer.extend_from_slice(&v.to_be_bytes());
        } else {
            self.buffer.push(mt | 27);
            self.buffer.extend_from_slice(&value.to_be_bytes());
        }
    }
}
