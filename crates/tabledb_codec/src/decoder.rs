//! Record decoder.

use crate::encoder::{MAJOR_ARRAY, MAJOR_TEXT};
use crate::error::{CodecError, CodecResult};
use crate::record::Record;

/// Decodes one record that must span all of `bytes`.
///
/// # Errors
///
/// Fails if the bytes are truncated, followed by trailing data, or are not
/// an alternating column/value text array.
pub fn decode_record(bytes: &[u8]) -> CodecResult<Record> {
    let mut decoder = RecordDecoder::new(bytes);
    let record = decoder.decode()?;
    if !decoder.is_empty() {
        return Err(CodecError::TrailingBytes {
            count: decoder.remaining().len(),
        });
    }
    Ok(record)
}

/// Streaming decoder over back-to-back record encodings.
///
/// The decoder only accepts what [`crate::RecordEncoder`] produces:
/// definite lengths in their shortest form, text items only, an even item
/// count, and no repeated column names.
pub struct RecordDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> RecordDecoder<'a> {
    /// Creates a decoder over `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Whether every byte has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Decodes the next record.
    ///
    /// # Errors
    ///
    /// See [`decode_record`].
    pub fn decode(&mut self) -> CodecResult<Record> {
        let items = self.read_head(MAJOR_ARRAY)?;
        if items % 2 != 0 {
            return Err(CodecError::invalid_structure(format!(
                "odd item count {items}"
            )));
        }
        // every item takes at least one byte
        if items > self.remaining().len() as u64 {
            return Err(CodecError::UnexpectedEof);
        }

        let mut record = Record::with_capacity((items / 2) as usize);
        for _ in 0..items / 2 {
            let name = self.read_text()?;
            let value = self.read_text()?;
            if record.contains(name) {
                return Err(CodecError::invalid_structure(format!(
                    "duplicate column {name:?}"
                )));
            }
            record.insert(name, value);
        }
        Ok(record)
    }

    fn read_byte(&mut self) -> CodecResult<u8> {
        let byte = *self.data.get(self.pos).ok_or(CodecError::UnexpectedEof)?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_slice(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(CodecError::UnexpectedEof)?;
        if end > self.data.len() {
            return Err(CodecError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_text(&mut self) -> CodecResult<&'a str> {
        let len = self.read_head(MAJOR_TEXT)?;
        let len = usize::try_from(len).map_err(|_| CodecError::UnexpectedEof)?;
        let bytes = self.read_slice(len)?;
        std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)
    }

    fn read_head(&mut self, expected_major: u8) -> CodecResult<u64> {
        let initial = self.read_byte()?;
        let major = initial >> 5;
        if major != expected_major {
            return Err(CodecError::invalid_structure(format!(
                "expected major type {expected_major}, found {major}"
            )));
        }

        let (value, minimum) = match initial & 0x1f {
            info @ 0..=23 => return Ok(u64::from(info)),
            24 => (u64::from(self.read_byte()?), 24),
            25 => {
                let b = self.read_slice(2)?;
                (u64::from(u16::from_be_bytes([b[0], b[1]])), 0x100)
            }
            26 => {
                let b = self.read_slice(4)?;
                (u64::from(u32::from_be_bytes([b[0], b[1], b[2], b[3]])), 0x1_0000)
            }
            27 => {
                let b = self.read_slice(8)?;
                let mut arr = [0u8; 8];
                arr.copy_from_slice(b);
                (u64::from_be_bytes(arr), 0x1_0000_0000)
            }
            31 => {
                return Err(CodecError::invalid_structure(
                    "indefinite-length items are not allowed",
                ))
            }
            info => {
                return Err(CodecError::invalid_structure(format!(
                    "reserved additional info {info}"
                )))
            }
        };

        if value < minimum {
            return Err(CodecError::invalid_structure(
                "length not in shortest form",
            ));
        }
        Ok(value)
    }
}
