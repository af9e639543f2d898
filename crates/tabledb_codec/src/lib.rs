//! # TableDB Codec
//!
//! Rows of a TableDB table are [`Record`]s: ordered, string-keyed,
//! string-valued column lists. This crate defines the record type, the
//! dynamic [`Value`] handed over by binding layers, and the byte encoding
//! records are stored in.
//!
//! ## Encoding
//!
//! A record is a definite-length CBOR array of text strings that alternate
//! column name and column value:
//!
//! ```text
//! [ "name", "jim", "age", "25" ]   ->   84 64 6e616d65 63 6a696d 63 616765 62 3235
//! ```
//!
//! Lengths use the shortest CBOR argument form, so a record has exactly one
//! encoding and column order survives the round trip.
//!
//! ## Usage
//!
//! ```
//! use tabledb_codec::{decode_record, encode_record, Record};
//!
//! let record = Record::from([("name", "jim"), ("age", "25")]);
//! let bytes = encode_record(&record);
//! assert_eq!(decode_record(&bytes).unwrap(), record);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod record;
mod value;

pub use decoder::{decode_record, RecordDecoder};
pub use encoder::{encode_record, RecordEncoder};
pub use error::{CodecError, CodecResult};
pub use record::{is_reserved_column, Record, PK_COLUMN};
pub use value::Value;

/// Types with a byte encoding.
pub trait Encode {
    /// Encodes `self`.
    fn encode(&self) -> CodecResult<Vec<u8>>;
}

/// Types that can be rebuilt from their byte encoding.
pub trait Decode: Sized {
    /// Decodes a value from `bytes`.
    fn decode(bytes: &[u8]) -> CodecResult<Self>;
}

impl Encode for Record {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        Ok(encode_record(self))
    }
}

impl Decode for Record {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        decode_record(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record_strategy() -> impl Strategy<Value = Record> {
        prop::collection::vec((".{0,12}", ".{0,40}"), 0..12)
            .prop_map(|pairs| pairs.into_iter().collect::<Record>())
    }

    #[test]
    fn empty_record_roundtrip() {
        let record = Record::new();
        let bytes = record.encode().unwrap();
        assert_eq!(bytes, vec![0x80]);
        assert_eq!(Record::decode(&bytes).unwrap(), record);
    }

    #[test]
    fn column_order_is_preserved() {
        let record = Record::from([("name", "jim"), ("age", "25"), ("lang", "ja,en")]);
        let decoded = Record::decode(&record.encode().unwrap()).unwrap();
        let columns: Vec<_> = decoded.columns().collect();
        assert_eq!(columns, vec!["name", "age", "lang"]);
    }

    #[test]
    fn known_bytes() {
        let record = Record::from([("a", "B")]);
        assert_eq!(encode_record(&record), vec![0x82, 0x61, b'a', 0x61, b'B']);
    }

    proptest! {
        #[test]
        fn roundtrip(record in record_strategy()) {
            let bytes = encode_record(&record);
            prop_assert_eq!(decode_record(&bytes).unwrap(), record);
        }

        #[test]
        fn decoder_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
            let _ = decode_record(&bytes);
        }
    }
}
