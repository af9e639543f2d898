//! Property-based test generators using proptest.
//!
//! Provides strategies for generating keys, records and mutation
//! sequences that keep the table's input rules (non-empty keys, unique
//! column names).

use proptest::prelude::*;
use tabledb_codec::Record;
use tabledb_core::Operator;

/// Strategy for generating valid primary keys.
pub fn key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{1,6}[0-9]{0,2}").expect("Invalid regex")
}

/// Strategy for generating column names.
pub fn column_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{1,8}").expect("Invalid regex")
}

/// Strategy for generating arbitrary records, including empty ones and
/// values with separators and non-ASCII text.
pub fn record_strategy() -> impl Strategy<Value = Record> {
    prop::collection::vec((column_strategy(), ".{0,16}"), 0..6)
        .prop_map(|pairs| pairs.into_iter().collect::<Record>())
}

/// Strategy for generating person records whose `age` is usually, but not
/// always, numeric.
pub fn person_strategy() -> impl Strategy<Value = Record> {
    let age = prop_oneof![
        4 => (0u32..100).prop_map(|n| n.to_string()),
        1 => prop::string::string_regex("[a-z]{1,3}").expect("Invalid regex"),
    ];
    (
        prop::string::string_regex("j[a-z]{1,4}").expect("Invalid regex"),
        prop::option::of(age),
    )
        .prop_map(|(name, age)| {
            let mut record = Record::from([("name", name)]);
            if let Some(age) = age {
                record.insert("age", age);
            }
            record
        })
}

/// Strategy for operators a decimal index can answer.
pub fn decimal_operator_strategy() -> impl Strategy<Value = Operator> {
    prop_oneof![
        Just(Operator::Equals),
        Just(Operator::NumEquals),
        Just(Operator::GreaterThan),
        Just(Operator::GreaterOrEqual),
        Just(Operator::LessThan),
        Just(Operator::LessOrEqual),
    ]
}

/// Strategy for keys drawn from the ten keys `k0` to `k9`.
pub fn small_key_strategy() -> impl Strategy<Value = String> {
    prop::sample::select((0..10).map(|n| format!("k{n}")).collect::<Vec<_>>())
}

/// A single table mutation.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Store a record.
    Put(String, Record),
    /// Delete a key.
    Delete(String),
}

/// Strategy for generating mutation sequences over a small key space, so
/// overwrites and deletes of existing keys are common.
pub fn mutations_strategy(max_len: usize) -> impl Strategy<Value = Vec<Mutation>> {
    let mutation = prop_oneof![
        3 => (small_key_strategy(), person_strategy()).prop_map(|(k, r)| Mutation::Put(k, r)),
        1 => small_key_strategy().prop_map(Mutation::Delete),
    ];
    prop::collection::vec(mutation, 0..max_len)
}
