//! Vehicle processor implementation.
//!
//! Resolves vehicle events into the writes the loader hands to the bulk engine.

use tracing::{debug, instrument, warn};

use crate::consumer::{VehicleEvent, VehicleEventType};
use vehicle_sync_shared::VehicleDocument;

/// Processed result from the vehicle processor.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessedEvent {
    /// Document to be written in full (create or replace).
    Index(VehicleDocument),
    /// Fields to merge into an existing document.
    Update {
        document: VehicleDocument,
        /// Create the document from `document` when it does not exist yet.
        upsert: bool,
    },
    /// Document to be deleted.
    Delete { vehicle_id: String },
}

/// Processor that turns vehicle events into search index writes.
#[derive(Debug, Clone)]
pub struct VehicleProcessor {
    update_upsert: bool,
}

impl VehicleProcessor {
    /// Create a processor whose updates create missing documents.
    pub fn new() -> Self {
        Self::with_update_upsert(true)
    }

    /// Create a processor with an explicit upsert flag for update events.
    pub fn with_update_upsert(update_upsert: bool) -> Self {
        Self { update_upsert }
    }

    /// Process a batch of vehicle events.
    ///
    /// Events without a usable vehicle id are dropped.
    #[instrument(skip(self, events), fields(event_count = events.len()))]
    pub fn process_batch(&self, events: Vec<VehicleEvent>) -> Vec<ProcessedEvent> {
        let processed: Vec<ProcessedEvent> = events
            .into_iter()
            .filter_map(|event| self.process_event(event))
            .collect();

        debug!(processed_count = processed.len(), "Processed event batch");
        processed
    }

    /// Process a single vehicle event.
    fn process_event(&self, event: VehicleEvent) -> Option<ProcessedEvent> {
        let vehicle_id = event.vehicle_id.trim();
        if vehicle_id.is_empty() {
            warn!(event_type = ?event.event_type, "Dropping vehicle event without vehicle_id");
            return None;
        }
        let vehicle_id = vehicle_id.to_string();

        let processed = match event.event_type {
            VehicleEventType::Upsert => {
                ProcessedEvent::Index(VehicleDocument::new(vehicle_id, event.fields))
            }
            VehicleEventType::Update => {
                if event.fields.is_empty() {
                    debug!(vehicle_id = %vehicle_id, "Skipping update without changed fields");
                    return None;
                }
                ProcessedEvent::Update {
                    document: VehicleDocument::new(vehicle_id, event.fields),
                    upsert: self.update_upsert,
                }
            }
            VehicleEventType::Delete => ProcessedEvent::Delete { vehicle_id },
        };
        Some(processed)
    }
}

impl Default for VehicleProcessor {
    fn default() -> Self {
        Self::new()
    }
}
