//! Operation and result types for bulk index writes.

use std::fmt;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::errors::SearchIndexError;

/// The kind of write a `DocumentOperation` performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Create or replace the whole document.
    Index,
    /// Merge fields into an existing document, optionally creating it.
    Update,
    /// Remove the document.
    Delete,
}

impl OperationKind {
    /// The bulk API action name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pending write against a named collection.
///
/// Operations are validated when built and immutable afterwards: the accumulator
/// owns them until they are handed over to a flush. The approximate size used by
/// the byte-size flush trigger is computed once here.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentOperation {
    kind: OperationKind,
    collection: String,
    id: String,
    payload: Option<Map<String, Value>>,
    upsert: bool,
    size_bytes: usize,
}

impl DocumentOperation {
    /// Build an index operation that creates or replaces the document.
    pub fn index(
        collection: impl Into<String>,
        id: impl Into<String>,
        payload: Map<String, Value>,
    ) -> Result<Self, SearchIndexError> {
        Self::build(OperationKind::Index, collection.into(), id.into(), Some(payload), false)
    }

    /// Build an index operation from a raw JSON object string.
    pub fn index_json(
        collection: impl Into<String>,
        id: impl Into<String>,
        json: &str,
    ) -> Result<Self, SearchIndexError> {
        Self::index(collection, id, parse_json_object(json)?)
    }

    /// Build an update operation. With `upsert` the document is created when absent.
    pub fn update(
        collection: impl Into<String>,
        id: impl Into<String>,
        payload: Map<String, Value>,
        upsert: bool,
    ) -> Result<Self, SearchIndexError> {
        Self::build(OperationKind::Update, collection.into(), id.into(), Some(payload), upsert)
    }

    /// Build an update operation from a raw JSON object string.
    pub fn update_json(
        collection: impl Into<String>,
        id: impl Into<String>,
        json: &str,
        upsert: bool,
    ) -> Result<Self, SearchIndexError> {
        Self::update(collection, id, parse_json_object(json)?, upsert)
    }

    /// Build a delete operation.
    pub fn delete(
        collection: impl Into<String>,
        id: impl Into<String>,
    ) -> Result<Self, SearchIndexError> {
        Self::build(OperationKind::Delete, collection.into(), id.into(), None, false)
    }

    fn build(
        kind: OperationKind,
        collection: String,
        id: String,
        payload: Option<Map<String, Value>>,
        upsert: bool,
    ) -> Result<Self, SearchIndexError> {
        if collection.trim().is_empty() {
            return Err(SearchIndexError::validation("collection is required"));
        }
        if id.trim().is_empty() {
            return Err(SearchIndexError::validation(format!(
                "document id is required (collection={})",
                collection
            )));
        }

        let payload_bytes = match &payload {
            Some(map) => serde_json::to_vec(map)
                .map_err(|e| SearchIndexError::serialization(e.to_string()))?
                .len(),
            None => 0,
        };
        let size_bytes = collection.len() + id.len() + payload_bytes;

        Ok(Self {
            kind,
            collection,
            id,
            payload,
            upsert: kind == OperationKind::Update && upsert,
            size_bytes,
        })
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Document fields; `None` for deletes.
    pub fn payload(&self) -> Option<&Map<String, Value>> {
        self.payload.as_ref()
    }

    /// Whether an update creates the document when it is missing. Always `false` for
    /// index and delete operations.
    pub fn upsert(&self) -> bool {
        self.upsert
    }

    /// Approximate size: collection and id lengths plus the serialized payload length.
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }
}

fn parse_json_object(json: &str) -> Result<Map<String, Value>, SearchIndexError> {
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(SearchIndexError::validation(format!(
            "payload must be a JSON object, got {}",
            json_type_name(&other)
        ))),
        Err(e) => Err(SearchIndexError::validation(format!(
            "payload is not valid JSON: {}",
            e
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Result of a batch operation for a single item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOperationResult {
    /// The collection the operation targeted.
    pub collection: String,
    /// The document identifier.
    pub id: String,
    /// What the operation did.
    pub kind: OperationKind,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Item status reported by the backend, when it reports one.
    pub status: Option<u16>,
    /// Failure reason if the operation failed.
    pub error: Option<String>,
}

impl BatchOperationResult {
    /// A successful result for `operation`.
    pub fn succeeded(operation: &DocumentOperation, status: Option<u16>) -> Self {
        Self {
            collection: operation.collection().to_string(),
            id: operation.id().to_string(),
            kind: operation.kind(),
            success: true,
            status,
            error: None,
        }
    }

    /// A failed result for `operation`.
    pub fn failed(
        operation: &DocumentOperation,
        status: Option<u16>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            collection: operation.collection().to_string(),
            id: operation.id().to_string(),
            kind: operation.kind(),
            success: false,
            status,
            error: Some(error.into()),
        }
    }
}

/// Summary of a batch operation containing aggregate statistics and individual results.
///
/// Results are in the same order as the operations of the flushed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOperationSummary {
    /// Total number of items in the batch.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Time the backend reports it spent on the batch.
    pub took: Duration,
    /// Individual results for each item.
    pub results: Vec<BatchOperationResult>,
}

impl BatchOperationSummary {
    /// Build a summary, deriving the counters from `results`.
    pub fn from_results(results: Vec<BatchOperationResult>, took: Duration) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            took,
            results,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Human readable description of every failed item, one per line.
    pub fn failure_message(&self) -> String {
        self.results
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.success)
            .map(|(position, r)| {
                format!(
                    "[{}]: {} [{}/{}] status [{}]: {}",
                    position,
                    r.kind,
                    r.collection,
                    r.id,
                    r.status.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
                    r.error.as_deref().unwrap_or("unknown error")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The partial write error for this summary, if any item failed.
    pub fn partial_write_error(&self) -> Option<SearchIndexError> {
        if !self.has_failures() {
            return None;
        }
        Some(SearchIndexError::partial_write(
            self.failed,
            self.total,
            self.failure_message(),
        ))
    }
}
