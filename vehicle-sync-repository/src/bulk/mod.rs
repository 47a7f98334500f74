//! Bulk commit engine.
//!
//! Operations are buffered by a [`BatchAccumulator`], checked against a
//! [`FlushPolicy`] after every enqueue, and committed by a [`CommitExecutor`]
//! that runs a bounded number of flushes at once. [`BulkProcessor`] ties the
//! pieces together and owns the flush timer and the close sequence.

mod accumulator;
mod executor;
mod listener;
mod policy;
mod processor;

pub use accumulator::{BatchAccumulator, PendingBatch};
pub use executor::{CommitExecutor, DrainStatus, FlushTask};
pub use listener::{BulkListener, LoggingListener};
pub use policy::{FlushPolicy, FlushTrigger};
pub use processor::{BulkProcessor, ProcessorState};
