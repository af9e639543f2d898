//! Transactions.
//!
//! A table has at most one open transaction. It is owned by the thread
//! that called `begin`; other threads block until it ends or their lock
//! timeout passes.

mod state;
mod undo;

pub use state::{Transaction, TransactionState};
pub use undo::UndoEntry;

pub(crate) use undo::rollback;
