//! Prepared queries.

use super::builder::Query;
use super::row::Row;
use crate::error::TableResult;
use crate::table::Table;
use std::cell::Cell;

/// A query bound to a table, ready to run repeatedly.
///
/// Created by [`Table::prepare_query`]. Each [`run`](Self::run) sees the
/// table as it is at that moment; [`count`](Self::count) is computed by the
/// first run or count and then cached.
pub struct PreparedQuery<'t> {
    table: &'t Table,
    query: Query,
    count: Cell<Option<usize>>,
}

impl<'t> PreparedQuery<'t> {
    pub(crate) fn new(table: &'t Table, query: Query) -> Self {
        Self {
            table,
            query,
            count: Cell::new(None),
        }
    }

    /// The underlying query.
    #[must_use]
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Executes the query.
    ///
    /// # Errors
    ///
    /// Fails if the table is closed, busy, or a record does not decode.
    pub fn run(&self) -> TableResult<Vec<Row>> {
        let rows = self.table.run_query(&self.query)?;
        if self.count.get().is_none() {
            self.count.set(Some(rows.len()));
        }
        Ok(rows)
    }

    /// Number of rows, executing the query only if it has not run yet.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub fn count(&self) -> TableResult<usize> {
        match self.count.get() {
            Some(count) => Ok(count),
            None => self.run().map(|rows| rows.len()),
        }
    }

    /// Alias of [`run`](Self::run).
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub fn to_vec(&self) -> TableResult<Vec<Row>> {
        self.run()
    }

    /// Executes the query, consuming it.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub fn into_rows(self) -> TableResult<Vec<Row>> {
        self.run()
    }
}
