//! # Vehicle Sync Repository
//!
//! This crate provides the bulk commit engine used to keep the vehicle search
//! index in sync, the backend interface it writes through, and a concrete
//! implementation for OpenSearch.

pub mod bulk;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod types;
pub mod utils;

pub use bulk::{
    BulkListener, BulkProcessor, DrainStatus, FlushTrigger, LoggingListener, PendingBatch,
    ProcessorState,
};
pub use config::BulkProcessorConfig;
pub use errors::SearchIndexError;
pub use interfaces::SearchIndexProvider;
pub use opensearch::{OpenSearchProvider, UpdateByQuerySummary};
pub use types::{BatchOperationResult, BatchOperationSummary, DocumentOperation, OperationKind};
pub use utils::parse_endpoints;
