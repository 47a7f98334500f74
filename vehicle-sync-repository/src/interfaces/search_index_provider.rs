//! Search index provider trait definition.
//!
//! This module defines the capability the bulk commit engine needs from a backend,
//! allowing for different implementations (OpenSearch, Elasticsearch, in-memory mocks).

use async_trait::async_trait;

use crate::errors::SearchIndexError;
use crate::types::{BatchOperationSummary, DocumentOperation};

/// Abstracts the underlying search index implementation (OpenSearch, Elasticsearch, etc.).
///
/// One provider instance is the engine handle shared by every flush task, so implementations
/// must be safe to call concurrently. Connection management, node discovery and wire-level
/// retries are entirely the provider's concern.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Apply a batch of operations in order and report the outcome of each one.
    ///
    /// # Arguments
    ///
    /// * `operations` - The batch, in enqueue order
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - The backend processed the batch; individual items may
    ///   still have failed, one result per operation in the same order
    /// * `Err(SearchIndexError)` - The batch could not be delivered at all
    async fn apply_batch(
        &self,
        operations: &[DocumentOperation],
    ) -> Result<BatchOperationSummary, SearchIndexError>;

    /// Release the connection to the backend.
    ///
    /// Called exactly once by the bulk processor during close, after the final drain.
    async fn close(&self) -> Result<(), SearchIndexError> {
        Ok(())
    }
}
