//! Loader module for the vehicle sync ingest.
//!
//! Hands processed events to the bulk processor, which buffers them and commits
//! them to the search index.

use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::errors::IngestError;
use crate::processor::ProcessedEvent;
use vehicle_sync_repository::config::DEFAULT_DRAIN_TIMEOUT;
use vehicle_sync_repository::{BulkProcessor, DrainStatus, ProcessorState};

/// Default collection vehicle documents are written to.
pub const DEFAULT_VEHICLE_INDEX: &str = "vehicles";

/// Configuration for the search loader.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Collection the documents are written to.
    pub collection: String,
    /// How long `close` waits for in-flight flushes.
    pub drain_timeout: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_VEHICLE_INDEX.to_string(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

/// Loader that writes vehicle documents through the bulk processor.
///
/// `load` returns as soon as the operations are buffered; the processor decides
/// when they are committed.
pub struct SearchLoader {
    processor: BulkProcessor,
    config: LoaderConfig,
}

impl SearchLoader {
    /// Create a new search loader writing to the default collection.
    pub fn new(processor: BulkProcessor) -> Self {
        Self::with_config(processor, LoaderConfig::default())
    }

    /// Create a new search loader with custom configuration.
    pub fn with_config(processor: BulkProcessor, config: LoaderConfig) -> Self {
        Self { processor, config }
    }

    /// Enqueue a batch of processed events.
    ///
    /// Returns the number of operations handed to the processor. Stops at the
    /// first rejected operation; the ones before it stay buffered.
    #[instrument(skip(self, events), fields(event_count = events.len()))]
    pub async fn load(&self, events: Vec<ProcessedEvent>) -> Result<usize, IngestError> {
        let collection = self.config.collection.as_str();
        let mut enqueued = 0;

        for event in events {
            match event {
                ProcessedEvent::Index(document) => {
                    let id = document.document_id().to_string();
                    self.processor
                        .enqueue_index(collection, &id, document.into_payload())
                        .await?;
                }
                ProcessedEvent::Update { document, upsert } => {
                    let id = document.document_id().to_string();
                    self.processor
                        .enqueue_update(collection, &id, document.into_payload(), upsert)
                        .await?;
                }
                ProcessedEvent::Delete { vehicle_id } => {
                    self.processor.enqueue_delete(collection, &vehicle_id).await?;
                }
            }
            enqueued += 1;
        }

        Ok(enqueued)
    }

    /// Ask the processor to flush whatever is buffered.
    pub async fn flush(&self) -> Result<(), IngestError> {
        self.processor.flush_now().await?;
        Ok(())
    }

    /// Close the processor with the configured drain timeout.
    pub async fn close(&self) -> Result<DrainStatus, IngestError> {
        self.close_with_timeout(self.config.drain_timeout).await
    }

    /// Close the processor, flushing what is buffered and waiting up to
    /// `drain_timeout` for in-flight flushes.
    #[instrument(skip(self))]
    pub async fn close_with_timeout(&self, drain_timeout: Duration) -> Result<DrainStatus, IngestError> {
        let status = self.processor.close(drain_timeout).await?;
        match status {
            DrainStatus::Drained => info!("Search loader closed, all flushes completed"),
            DrainStatus::TimedOut => warn!(
                drain_timeout_secs = drain_timeout.as_secs(),
                "Search loader closed before all flushes completed"
            ),
        }
        Ok(status)
    }

    /// Check that the processor still accepts operations.
    pub fn check_ready(&self) -> Result<(), IngestError> {
        match self.processor.state() {
            ProcessorState::Open => Ok(()),
            state => Err(IngestError::loader(format!(
                "bulk processor is not accepting operations ({:?})",
                state
            ))),
        }
    }

    /// Number of buffered operations not yet handed to a flush.
    pub fn pending(&self) -> usize {
        self.processor.pending().0
    }
}
