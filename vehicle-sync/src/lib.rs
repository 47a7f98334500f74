//! # Vehicle Sync
//!
//! Keeps the vehicle search index in step with the vehicle database - consumes
//! change events from Kafka and commits them to OpenSearch through a buffering
//! bulk processor.
//!
//! ## Architecture
//!
//! The sync follows the Consumer-Processor-Loader pattern:
//!
//! 1. **Consumer**: Receives vehicle change events from Kafka
//! 2. **Processor**: Resolves events into index, update and delete writes
//! 3. **Loader**: Buffers the writes in the bulk processor, which commits them
//!    by size, byte volume, or interval
//! 4. **Orchestrator**: Coordinates the flow and the graceful shutdown
//!
//! ## Modules
//!
//! - [`config`]: Configuration and dependency initialization
//! - [`consumer`]: Kafka consumer for vehicle events
//! - [`processor`]: Turns events into index writes
//! - [`loader`]: Hands writes to the bulk processor
//! - [`orchestrator`]: Coordinates the ingest flow
//! - [`errors`]: Error types for the ingest

pub mod config;
pub mod consumer;
pub mod errors;
pub mod loader;
pub mod orchestrator;
pub mod processor;

pub use config::{Dependencies, SyncConfig};
pub use errors::IngestError;

use thiserror::Error;

/// Errors that can occur during sync initialization or execution.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Ingest error.
    #[error("Ingest error: {0}")]
    IngestError(#[from] IngestError),
}

impl SyncError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
