//! Benchmark utilities.

#![warn(missing_docs)]

use rand::Rng;
use tabledb_codec::Record;
use tabledb_core::Table;

/// Random lowercase text of `len` characters.
pub fn random_text(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen_range(b'a'..=b'z') as char).collect()
}

/// A person record with a random name, a random age and `extra` padding
/// columns.
pub fn random_person(extra: usize) -> Record {
    let mut rng = rand::thread_rng();
    let mut record = Record::from([
        ("name".to_string(), random_text(8)),
        ("age".to_string(), rng.gen_range(0..100u32).to_string()),
    ]);
    for i in 0..extra {
        record.insert(format!("col{i}"), random_text(16));
    }
    record
}

/// An in-memory table holding `count` random people keyed `pk<i>`.
pub fn populated_table(count: usize) -> Table {
    let table = Table::open_in_memory().unwrap();
    for i in 0..count {
        table.put(&format!("pk{i}"), &random_person(2)).unwrap();
    }
    table
}
