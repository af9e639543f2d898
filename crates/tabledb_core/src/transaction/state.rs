//! Transaction state.

use super::undo::UndoEntry;
use crate::error::{TableError, TableResult};
use crate::types::TransactionId;
use std::thread::{self, ThreadId};

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Mutations are being recorded.
    Active,
    /// The transaction committed.
    Committed,
    /// The transaction was rolled back.
    Aborted,
}

/// The table's open transaction.
///
/// Mutations inside a transaction are applied to the in-memory table
/// immediately and visible to the owning thread; the undo journal records
/// how to reverse each of them on abort. Other threads wait until the
/// transaction ends.
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    owner: ThreadId,
    state: TransactionState,
    undo: Vec<UndoEntry>,
}

impl Transaction {
    /// Starts a transaction owned by the calling thread.
    pub(crate) fn new(id: TransactionId) -> Self {
        Self {
            id,
            owner: thread::current().id(),
            state: TransactionState::Active,
            undo: Vec::new(),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Checks if the transaction is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Whether the calling thread started this transaction.
    #[must_use]
    pub fn is_owned_by_current_thread(&self) -> bool {
        self.owner == thread::current().id()
    }

    /// Appends an entry to the undo journal.
    pub(crate) fn record(&mut self, entry: UndoEntry) -> TableResult<()> {
        self.ensure_active()?;
        self.undo.push(entry);
        Ok(())
    }

    /// Number of journaled mutations.
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    /// Takes the undo journal, newest entry last.
    pub(crate) fn take_undo(&mut self) -> Vec<UndoEntry> {
        std::mem::take(&mut self.undo)
    }

    pub(crate) fn mark_committed(&mut self) {
        self.state = TransactionState::Committed;
        self.undo.clear();
    }

    pub(crate) fn mark_aborted(&mut self) {
        self.state = TransactionState::Aborted;
    }

    fn ensure_active(&self) -> TableResult<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            TransactionState::Committed => {
                Err(TableError::transaction_state("transaction already committed"))
            }
            TransactionState::Aborted => {
                Err(TableError::transaction_state("transaction already aborted"))
            }
        }
    }
}
