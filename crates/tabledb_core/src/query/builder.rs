//! Query construction.

use super::condition::{Condition, Operator};
use super::row::Shape;
use crate::error::{TableError, TableResult};
use std::fmt;
use std::str::FromStr;

/// Sort direction of an ordered query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending string order; a missing column sorts as `""`.
    Asc,
    /// Descending string order.
    Desc,
    /// Ascending numeric order; missing or non-numeric values sort as 0.
    NumAsc,
    /// Descending numeric order.
    NumDesc,
}

impl FromStr for Direction {
    type Err = TableError;

    fn from_str(s: &str) -> TableResult<Self> {
        match s.trim_start_matches(':') {
            "asc" | "strasc" => Ok(Self::Asc),
            "desc" | "strdesc" => Ok(Self::Desc),
            "numasc" => Ok(Self::NumAsc),
            "numdesc" => Ok(Self::NumDesc),
            other => Err(TableError::invalid_argument(format!(
                "unknown sort direction {other:?}"
            ))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
            Self::NumAsc => "numasc",
            Self::NumDesc => "numdesc",
        })
    }
}

/// A validated query.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub(crate) conditions: Vec<Condition>,
    pub(crate) order: Option<(String, Direction)>,
    pub(crate) limit: Option<usize>,
    pub(crate) offset: usize,
    pub(crate) shape: Shape,
}

impl Query {
    /// The conditions, all of which must hold.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Ordering column and direction.
    #[must_use]
    pub fn order(&self) -> Option<(&str, Direction)> {
        self.order.as_ref().map(|(c, d)| (c.as_str(), *d))
    }

    /// Maximum number of rows.
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Rows skipped before the limit applies.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Output shape.
    #[must_use]
    pub fn shape(&self) -> Shape {
        self.shape
    }
}

/// Collects conditions and options for [`crate::Table::query`].
///
/// Adding a bad condition does not fail on the spot; the first error is
/// kept and returned when the query runs, and nothing is executed.
///
/// ```rust
/// use tabledb_core::{Direction, Operator, QueryBuilder};
///
/// let mut q = QueryBuilder::new();
/// q.add("lang", Operator::Includes, "en")
///     .order_by("name", Direction::Desc)
///     .limit(2);
/// assert!(q.build().is_ok());
/// ```
#[derive(Debug, Default)]
pub struct QueryBuilder {
    query: Query,
    error: Option<TableError>,
}

impl QueryBuilder {
    /// Creates an empty builder: no conditions, key order, full shape.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition.
    pub fn add(
        &mut self,
        column: impl Into<String>,
        op: Operator,
        operand: impl Into<String>,
    ) -> &mut Self {
        self.add_condition(column, op, operand, false)
    }

    /// Adds a negated condition.
    pub fn add_negated(
        &mut self,
        column: impl Into<String>,
        op: Operator,
        operand: impl Into<String>,
    ) -> &mut Self {
        self.add_condition(column, op, operand, true)
    }

    /// Adds a condition, negated when `negate` is set.
    pub fn add_condition(
        &mut self,
        column: impl Into<String>,
        op: Operator,
        operand: impl Into<String>,
        negate: bool,
    ) -> &mut Self {
        match Condition::new(column, op, operand, negate) {
            Ok(condition) => self.query.conditions.push(condition),
            Err(e) => self.fail(e),
        }
        self
    }

    /// Adds a condition from an operator name such as `"includes"` or
    /// `"gt"`. The condition is negated when `affirmative` is false.
    pub fn add_str(
        &mut self,
        column: impl Into<String>,
        op: &str,
        operand: impl Into<String>,
        affirmative: bool,
    ) -> &mut Self {
        match op.parse::<Operator>() {
            Ok(op) => self.add_condition(column, op, operand, !affirmative),
            Err(e) => {
                self.fail(e);
                self
            }
        }
    }

    /// Orders results by `column` (`":pk"` for the primary key).
    pub fn order_by(&mut self, column: impl Into<String>, direction: Direction) -> &mut Self {
        self.query.order = Some((column.into(), direction));
        self
    }

    /// Orders results using a direction name (`asc`, `desc`, `numasc`,
    /// `numdesc`, or the `strasc`/`strdesc` spellings).
    pub fn order_by_str(&mut self, column: impl Into<String>, direction: &str) -> &mut Self {
        match direction.parse::<Direction>() {
            Ok(direction) => self.order_by(column, direction),
            Err(e) => {
                self.fail(e);
                self
            }
        }
    }

    /// Returns at most `limit` rows.
    pub fn limit(&mut self, limit: usize) -> &mut Self {
        self.query.limit = Some(limit);
        self
    }

    /// Skips the first `offset` rows.
    pub fn offset(&mut self, offset: usize) -> &mut Self {
        self.query.offset = offset;
        self
    }

    /// Returns primary keys only.
    pub fn pk_only(&mut self) -> &mut Self {
        self.query.shape = Shape::PkOnly;
        self
    }

    /// Returns records without the injected primary key.
    pub fn no_pk(&mut self) -> &mut Self {
        self.query.shape = Shape::NoPk;
        self
    }

    fn fail(&mut self, error: TableError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Finishes the query.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while adding conditions.
    pub fn build(self) -> TableResult<Query> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.query),
        }
    }
}
