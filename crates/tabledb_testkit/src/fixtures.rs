//! Test fixtures and table helpers.
//!
//! Provides convenience functions for setting up test tables and the
//! small people data set most scenarios query against.

use std::path::{Path, PathBuf};
use tabledb_core::{Config, Row, Table};
use tabledb_codec::Record;
use tempfile::TempDir;

/// The people data set: key, name, age, spoken languages.
pub const PEOPLE: [(&str, &str, &str, &str); 4] = [
    ("pk0", "jim", "25", "ja,en"),
    ("pk1", "jeff", "32", "en,es"),
    ("pk2", "jack", "44", "en"),
    ("pk3", "jake", "45", "en,li"),
];

/// A file-backed test table with automatic cleanup.
pub struct TestTable {
    /// The table instance.
    pub table: Table,
    path: PathBuf,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: TempDir,
}

impl TestTable {
    /// Creates a new file-backed table in a fresh temporary directory.
    pub fn file() -> Self {
        Self::file_with_config(Config::default())
    }

    /// Creates a new file-backed table with `config`.
    pub fn file_with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("test.tdb");
        let table = Table::open_with_config(&path, config).expect("Failed to open table");
        Self {
            table,
            path,
            _temp_dir: temp_dir,
        }
    }

    /// Path of the table file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Closes the table and opens the same file again with default
    /// settings.
    pub fn reopen(self) -> Self {
        self.reopen_with_config(Config::default())
    }

    /// Closes the table and opens the same file again with `config`.
    pub fn reopen_with_config(self, config: Config) -> Self {
        let Self {
            table,
            path,
            _temp_dir,
        } = self;
        table.close().expect("Failed to close table");
        drop(table);
        let table = Table::open_with_config(&path, config).expect("Failed to reopen table");
        Self {
            table,
            path,
            _temp_dir,
        }
    }
}

impl std::ops::Deref for TestTable {
    type Target = Table;

    fn deref(&self) -> &Self::Target {
        &self.table
    }
}

/// Builds a person record.
pub fn person(name: &str, age: &str, lang: &str) -> Record {
    Record::from([("name", name), ("age", age), ("lang", lang)])
}

/// Stores the [`PEOPLE`] data set in `table`.
pub fn load_people(table: &Table) {
    for (pk, name, age, lang) in PEOPLE {
        table
            .put(pk, &person(name, age, lang))
            .expect("Failed to store person");
    }
}

/// An in-memory table holding the [`PEOPLE`] data set.
pub fn prepare_table_with_data() -> Table {
    let table = Table::open_in_memory().expect("Failed to open in-memory table");
    load_people(&table);
    table
}

/// Stores `count` records keyed `person<i>` and `count` keyed `animal<i>`.
pub fn load_people_and_animals(table: &Table, count: usize) {
    for i in 0..count {
        table
            .put(&format!("person{i}"), &Record::from([("name", format!("person{i}"))]))
            .expect("Failed to store person");
        table
            .put(&format!("animal{i}"), &Record::from([("name", format!("animal{i}"))]))
            .expect("Failed to store animal");
    }
}

/// Runs a test with a temporary in-memory table.
///
/// # Example
///
/// ```rust
/// use tabledb_testkit::with_temp_table;
///
/// with_temp_table(|table| {
///     assert_eq!(table.size().unwrap(), 0);
/// });
/// ```
pub fn with_temp_table<F, R>(f: F) -> R
where
    F: FnOnce(&Table) -> R,
{
    let table = Table::open_in_memory().expect("Failed to open in-memory table");
    f(&table)
}

/// Runs a test with a temporary file-backed table.
pub fn with_file_table<F, R>(f: F) -> R
where
    F: FnOnce(&Table, &Path) -> R,
{
    let test_table = TestTable::file();
    f(&test_table.table, test_table.path())
}

/// Primary keys of `rows`, skipping rows that carry none.
pub fn keys_of(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .filter_map(|row| row.key().map(str::to_string))
        .collect()
}

/// Values of `column` in `rows`, skipping rows that lack it.
pub fn column_of(rows: &[Row], column: &str) -> Vec<String> {
    rows.iter()
        .filter_map(|row| row.get(column).map(str::to_string))
        .collect()
}
