//! Vehicle document types for the search index.
//!
//! This module defines the document structure that is indexed in the search engine
//! for each vehicle record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Document representation of a vehicle in the search index.
///
/// The upstream record is schemaless from the point of view of the sync: every
/// attribute carried by the change event lands in `fields` and is flattened into
/// the top level of the indexed document.
///
/// # Fields
///
/// - `vehicle_id`: Unique identifier for the vehicle, also used as the document ID
/// - `fields`: Record attributes as received from the upstream feed
/// - `synced_at`: Timestamp when the document was resolved for indexing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VehicleDocument {
    pub vehicle_id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    pub synced_at: DateTime<Utc>,
}

impl VehicleDocument {
    /// Create a new document stamped with the current time.
    ///
    /// # Example
    ///
    /// ```
    /// use serde_json::{json, Map};
    /// use vehicle_sync_shared::VehicleDocument;
    ///
    /// let mut fields = Map::new();
    /// fields.insert("vin".to_string(), json!("LSVAU2180N2183294"));
    /// let doc = VehicleDocument::new("v-100", fields);
    /// assert_eq!(doc.document_id(), "v-100");
    /// ```
    pub fn new(vehicle_id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            fields,
            synced_at: Utc::now(),
        }
    }

    /// The document ID used in the search index.
    pub fn document_id(&self) -> &str {
        &self.vehicle_id
    }

    /// Flatten the document into the JSON object sent to the search engine.
    ///
    /// `vehicle_id` and `synced_at` always win over attributes of the same name
    /// in `fields`.
    pub fn into_payload(self) -> Map<String, Value> {
        let mut payload = self.fields;
        payload.insert("vehicle_id".to_string(), Value::String(self.vehicle_id));
        payload.insert(
            "synced_at".to_string(),
            Value::String(self.synced_at.to_rfc3339()),
        );
        payload
    }
}
