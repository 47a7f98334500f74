//! Flush outcome callbacks.

use tracing::{debug, error, info, warn};

use crate::bulk::accumulator::PendingBatch;
use crate::errors::SearchIndexError;
use crate::types::BatchOperationSummary;
use crate::utils::duration_millis;

/// Receives the lifecycle of every flush.
///
/// For each flush, `before_flush` runs first and then exactly one of `after_flush`
/// or `after_flush_error`. Callbacks run on the flush task and must not block for
/// long; they observe the batch but cannot change it.
pub trait BulkListener: Send + Sync {
    /// Called right before the batch is sent to the backend.
    fn before_flush(&self, _execution_id: u64, _batch: &PendingBatch) {}

    /// The backend processed the batch. `summary` may contain per-operation failures,
    /// which are reported here and never retried by the processor.
    fn after_flush(&self, execution_id: u64, batch: &PendingBatch, summary: &BatchOperationSummary);

    /// The batch could not be delivered; every operation in it is lost from the
    /// processor's point of view.
    fn after_flush_error(&self, execution_id: u64, batch: &PendingBatch, error: &SearchIndexError);
}

/// Listener that reports flush outcomes through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingListener;

impl BulkListener for LoggingListener {
    fn before_flush(&self, execution_id: u64, batch: &PendingBatch) {
        debug!(
            execution_id = execution_id,
            op_count = batch.len(),
            size_bytes = batch.size_bytes(),
            "Flushing batch"
        );
    }

    fn after_flush(&self, execution_id: u64, batch: &PendingBatch, summary: &BatchOperationSummary) {
        let took_ms = duration_millis(summary.took);

        if !summary.has_failures() {
            info!(
                execution_id = execution_id,
                op_count = batch.len(),
                took_ms = took_ms,
                "Committed batch"
            );
            return;
        }

        warn!(
            execution_id = execution_id,
            op_count = batch.len(),
            succeeded = summary.succeeded,
            failed = summary.failed,
            took_ms = took_ms,
            "Committed batch with failures"
        );
        for result in summary.results.iter().filter(|r| !r.success) {
            error!(
                execution_id = execution_id,
                collection = %result.collection,
                id = %result.id,
                kind = %result.kind,
                status = ?result.status,
                error = result.error.as_deref().unwrap_or("unknown error"),
                "Operation failed"
            );
        }
    }

    fn after_flush_error(&self, execution_id: u64, batch: &PendingBatch, error: &SearchIndexError) {
        let first = batch.operations().first();
        error!(
            execution_id = execution_id,
            op_count = batch.len(),
            first_collection = first.map(|op| op.collection()).unwrap_or_default(),
            first_id = first.map(|op| op.id()).unwrap_or_default(),
            error = %error,
            "Batch flush failed; operations were not written"
        );
    }
}
