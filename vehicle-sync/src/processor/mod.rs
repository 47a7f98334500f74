//! Processor module for the vehicle sync ingest.
//!
//! Resolves vehicle events into search index writes.

mod vehicle_processor;

pub use vehicle_processor::{ProcessedEvent, VehicleProcessor};
