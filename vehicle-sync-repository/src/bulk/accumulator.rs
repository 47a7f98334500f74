//! Pending batch and the accumulator that owns it between flushes.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::errors::SearchIndexError;
use crate::types::DocumentOperation;

/// An ordered group of operations waiting to be flushed, with its running totals.
///
/// `len()` always equals the number of operations and `size_bytes()` only grows
/// while the batch is open; both are reset together when the accumulator swaps the
/// batch out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingBatch {
    operations: Vec<DocumentOperation>,
    size_bytes: usize,
}

impl PendingBatch {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, operation: DocumentOperation) {
        self.size_bytes += operation.size_bytes();
        self.operations.push(operation);
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Sum of the approximate sizes of the operations.
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Operations in enqueue order.
    pub fn operations(&self) -> &[DocumentOperation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<DocumentOperation> {
        self.operations
    }
}

impl FromIterator<DocumentOperation> for PendingBatch {
    fn from_iter<I: IntoIterator<Item = DocumentOperation>>(iter: I) -> Self {
        let mut batch = Self::new();
        for operation in iter {
            batch.push(operation);
        }
        batch
    }
}

#[derive(Debug, Default)]
struct AccumulatorState {
    batch: PendingBatch,
    sealed: bool,
}

/// Holds the open batch and hands it over atomically to flushes.
///
/// Appending and swapping out the batch happen under the same lock, so an
/// operation is either part of exactly one snapshot or still pending; it can
/// never be lost between a size check and a swap, or counted in two flushes.
#[derive(Debug, Default)]
pub struct BatchAccumulator {
    state: Mutex<AccumulatorState>,
}

impl BatchAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    // Critical sections never leave the state half-updated, so a poisoned lock
    // still guards a consistent batch.
    fn lock(&self) -> MutexGuard<'_, AccumulatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an operation and return the batch's `(op_count, size_bytes)` right after it.
    ///
    /// # Returns
    ///
    /// * `Ok((usize, usize))` - Counters observed atomically with the append
    /// * `Err(SearchIndexError::ClosedError)` - The accumulator has been sealed
    pub fn enqueue(&self, operation: DocumentOperation) -> Result<(usize, usize), SearchIndexError> {
        let mut state = self.lock();
        if state.sealed {
            return Err(SearchIndexError::ClosedError);
        }
        state.batch.push(operation);
        Ok((state.batch.len(), state.batch.size_bytes()))
    }

    /// Swap the open batch for an empty one and return it. The result may be empty.
    pub fn snapshot_and_reset(&self) -> PendingBatch {
        std::mem::take(&mut self.lock().batch)
    }

    /// Reject every later enqueue and return whatever was still pending.
    pub fn seal_and_snapshot(&self) -> PendingBatch {
        let mut state = self.lock();
        state.sealed = true;
        std::mem::take(&mut state.batch)
    }

    /// Current `(op_count, size_bytes)` of the open batch.
    pub fn pending(&self) -> (usize, usize) {
        let state = self.lock();
        (state.batch.len(), state.batch.size_bytes())
    }

    pub fn is_sealed(&self) -> bool {
        self.lock().sealed
    }
}
