//! Ad-hoc queries.
//!
//! A query is a conjunction of [`Condition`]s, each of which may be
//! negated, plus an optional ordering, offset and limit, and an output
//! [`Shape`]. Results are produced in this order:
//!
//! 1. filter, visiting keys in lexical order
//! 2. stable sort by the order column, if one is set
//! 3. skip `offset` rows, then keep at most `limit`
//!
//! When exactly one non-negated condition can be answered by a declared
//! index, its candidate keys replace the full scan. Every condition is
//! still checked on each candidate, so the rows are the same either way.

mod builder;
mod condition;
mod engine;
mod prepared;
mod row;

pub use builder::{Direction, Query, QueryBuilder};
pub use condition::{Condition, Operator};
pub use engine::Plan;
pub use prepared::PreparedQuery;
pub use row::{Row, Shape};

pub(crate) use engine::{execute, plan, select};
