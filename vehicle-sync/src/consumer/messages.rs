//! Message types for the consumer.
//!
//! Defines the event structures that flow through the ingest.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::IngestError;

/// Types of vehicle events that can be received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleEventType {
    /// Vehicle row was inserted or fully rewritten.
    Upsert,
    /// Some columns of the vehicle row changed.
    Update,
    /// Vehicle row was deleted.
    Delete,
}

impl VehicleEventType {
    fn from_op(op: &str) -> Option<Self> {
        match op.to_ascii_lowercase().as_str() {
            "upsert" | "insert" | "index" => Some(Self::Upsert),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// A vehicle change event received from Kafka.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleEvent {
    /// The type of event.
    pub event_type: VehicleEventType,
    /// The vehicle's identifier, used as the document id.
    pub vehicle_id: String,
    /// Changed columns (for upsert and update events).
    pub fields: Map<String, Value>,
}

/// Wire shape of a vehicle event.
#[derive(Debug, Deserialize)]
struct RawVehicleEvent {
    op: String,
    vehicle_id: Value,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl VehicleEvent {
    /// Create a new upsert event.
    pub fn upsert(vehicle_id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            event_type: VehicleEventType::Upsert,
            vehicle_id: vehicle_id.into(),
            fields,
        }
    }

    /// Create a new update event.
    pub fn update(vehicle_id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            event_type: VehicleEventType::Update,
            vehicle_id: vehicle_id.into(),
            fields,
        }
    }

    /// Create a new delete event.
    pub fn delete(vehicle_id: impl Into<String>) -> Self {
        Self {
            event_type: VehicleEventType::Delete,
            vehicle_id: vehicle_id.into(),
            fields: Map::new(),
        }
    }

    /// Decode a Kafka payload holding one event object or an array of them.
    ///
    /// Events with an unknown `op` are skipped with a warning.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<VehicleEvent>)` - The decoded events, possibly empty
    /// * `Err(IngestError::ParseError)` - The payload is not valid event JSON
    pub fn decode_payload(payload: &[u8]) -> Result<Vec<Self>, IngestError> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| IngestError::parse(format!("Invalid JSON payload: {}", e)))?;

        match value {
            Value::Array(items) => {
                let mut events = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(event) = Self::from_value(item)? {
                        events.push(event);
                    }
                }
                Ok(events)
            }
            other => Ok(Self::from_value(other)?.into_iter().collect()),
        }
    }

    fn from_value(value: Value) -> Result<Option<Self>, IngestError> {
        let raw: RawVehicleEvent = serde_json::from_value(value)
            .map_err(|e| IngestError::parse(format!("Invalid vehicle event: {}", e)))?;

        let vehicle_id = match raw.vehicle_id {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            other => {
                return Err(IngestError::parse(format!(
                    "vehicle_id must be a string or number, got {}",
                    other
                )))
            }
        };

        let Some(event_type) = VehicleEventType::from_op(&raw.op) else {
            warn!(op = %raw.op, vehicle_id = %vehicle_id, "Skipping event with unknown op");
            return Ok(None);
        };

        Ok(Some(Self {
            event_type,
            vehicle_id,
            fields: raw.fields,
        }))
    }
}

/// Messages that flow through the ingest.
#[derive(Debug)]
pub enum StreamMessage {
    /// A batch of vehicle events with associated offsets for acknowledgment.
    Events {
        events: Vec<VehicleEvent>,
        offsets: Vec<(String, i32, i64)>,
    },
    /// Acknowledgment that events were accepted by the loader.
    Acknowledgment {
        offsets: Vec<(String, i32, i64)>,
        success: bool,
        error: Option<String>,
    },
    /// Stream has ended.
    End,
    /// An error occurred.
    Error(String),
}
