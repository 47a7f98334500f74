//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! on top of the OpenSearch `_bulk` API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use opensearch::{
    http::request::JsonBody,
    http::transport::{Connection, ConnectionPool, SingleNodeConnectionPool, TransportBuilder},
    BulkParts, OpenSearch, UpdateByQueryParts,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::types::{BatchOperationResult, BatchOperationSummary, DocumentOperation, OperationKind};

/// Result of an update-by-query call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateByQuerySummary {
    /// Documents matched by the query.
    #[serde(default)]
    pub total: u64,
    /// Documents actually updated.
    #[serde(default)]
    pub updated: u64,
    /// Time the backend reports it spent.
    #[serde(default, rename = "took")]
    pub took_ms: u64,
    /// Per-document failures as reported by the backend.
    #[serde(default)]
    pub failures: Vec<Value>,
}

/// Connection pool that hands out the configured nodes in turn.
#[derive(Debug, Clone)]
pub struct RoundRobinPool {
    connections: Vec<Connection>,
    next: Arc<AtomicUsize>,
}

impl RoundRobinPool {
    /// Create a pool over `endpoints`, which must not be empty.
    pub fn new(endpoints: &[Url]) -> Self {
        Self {
            connections: endpoints.iter().cloned().map(Connection::new).collect(),
            next: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn next_index(&self) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed) % self.connections.len()
    }
}

impl ConnectionPool for RoundRobinPool {
    fn next(&self) -> Connection {
        self.connections[self.next_index()].clone()
    }
}

/// OpenSearch provider implementation.
///
/// Writes batches with a single `_bulk` request per flush. With more than one
/// endpoint, requests are spread round-robin across the nodes.
///
/// # Example
///
/// ```ignore
/// use vehicle_sync_repository::{parse_endpoints, OpenSearchProvider};
///
/// let endpoints = parse_endpoints("es-1:9200,es-2:9200")?;
/// let provider = OpenSearchProvider::new(&endpoints)?;
/// provider.ping().await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider for the given endpoints.
    ///
    /// No request is sent here; use [`OpenSearchProvider::ping`] to check connectivity.
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchProvider)` - A new provider instance
    /// * `Err(SearchIndexError)` - If no endpoint is given or the transport cannot be built
    pub fn new(endpoints: &[Url]) -> Result<Self, SearchIndexError> {
        let transport = match endpoints {
            [] => {
                return Err(SearchIndexError::config(
                    "at least one search engine endpoint is required",
                ))
            }
            [single] => TransportBuilder::new(SingleNodeConnectionPool::new(single.clone()))
                .disable_proxy()
                .build(),
            many => TransportBuilder::new(RoundRobinPool::new(many))
                .disable_proxy()
                .build(),
        }
        .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        info!(
            endpoints = ?endpoints.iter().map(Url::as_str).collect::<Vec<_>>(),
            "Created OpenSearch provider"
        );

        Ok(Self {
            client: OpenSearch::new(transport),
        })
    }

    /// Check that the cluster answers.
    pub async fn ping(&self) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .ping()
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            return Err(SearchIndexError::connection(format!(
                "Ping failed with status {}",
                status
            )));
        }
        Ok(())
    }

    /// Apply `script` to every document in `collection` matching `query`.
    ///
    /// This goes straight to the backend and bypasses the bulk buffer.
    ///
    /// # Arguments
    ///
    /// * `collection` - Target index
    /// * `query` - Query DSL object selecting the documents
    /// * `script` - Painless source run against each matched document
    #[instrument(skip(self, query, script))]
    pub async fn update_by_query(
        &self,
        collection: &str,
        query: Value,
        script: &str,
    ) -> Result<UpdateByQuerySummary, SearchIndexError> {
        let body = build_update_by_query_body(query, script)?;

        let response = self
            .client
            .update_by_query(UpdateByQueryParts::Index(&[collection]))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Update by query request failed");
            return Err(SearchIndexError::connection(format!(
                "Update by query failed with status {}: {}",
                status, error_body
            )));
        }

        let summary = response
            .json::<UpdateByQuerySummary>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        debug!(
            total = summary.total,
            updated = summary.updated,
            took_ms = summary.took_ms,
            failures = summary.failures.len(),
            "Update by query completed"
        );
        Ok(summary)
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    /// Send the whole batch as one `_bulk` request.
    ///
    /// Transport failures and non-2xx statuses for the request as a whole are
    /// connectivity errors. Otherwise the returned summary carries one result per
    /// operation, in order.
    async fn apply_batch(
        &self,
        operations: &[DocumentOperation],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        if operations.is_empty() {
            return Ok(BatchOperationSummary::from_results(Vec::new(), Duration::ZERO));
        }

        let body: Vec<JsonBody<Value>> = build_bulk_body(operations)
            .into_iter()
            .map(JsonBody::new)
            .collect();

        let started = Instant::now();
        let response = self
            .client
            .bulk(BulkParts::None)
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Bulk request failed");
            return Err(SearchIndexError::connection(format!(
                "Bulk request failed with status {}: {}",
                status, error_body
            )));
        }

        let response_body = response
            .json::<Value>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        parse_bulk_response(operations, &response_body, started.elapsed())
    }
}

/// Build the NDJSON lines of a `_bulk` request: an action line per operation,
/// followed by a source line for index and update.
pub fn build_bulk_body(operations: &[DocumentOperation]) -> Vec<Value> {
    let mut lines = Vec::with_capacity(operations.len() * 2);

    for operation in operations {
        let meta = json!({ "_index": operation.collection(), "_id": operation.id() });
        let empty = Map::new();
        let payload = operation.payload().unwrap_or(&empty);

        match operation.kind() {
            OperationKind::Index => {
                lines.push(json!({ "index": meta }));
                lines.push(Value::Object(payload.clone()));
            }
            OperationKind::Update => {
                lines.push(json!({ "update": meta }));
                lines.push(json!({ "doc": payload, "doc_as_upsert": operation.upsert() }));
            }
            OperationKind::Delete => {
                lines.push(json!({ "delete": meta }));
            }
        }
    }

    lines
}

/// Map a `_bulk` response back onto the operations that produced it.
///
/// Items are matched by position. A delete that finds nothing (404) counts as a
/// success. `fallback_took` is used when the response carries no `took`.
pub fn parse_bulk_response(
    operations: &[DocumentOperation],
    response: &Value,
    fallback_took: Duration,
) -> Result<BatchOperationSummary, SearchIndexError> {
    let items = response
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| SearchIndexError::parse("bulk response has no items array"))?;

    let took = response
        .get("took")
        .and_then(Value::as_u64)
        .map(Duration::from_millis)
        .unwrap_or(fallback_took);

    let results = operations
        .iter()
        .enumerate()
        .map(|(position, operation)| match items.get(position) {
            Some(item) => item_result(operation, item),
            None => BatchOperationResult::failed(operation, None, "missing from bulk response"),
        })
        .collect();

    Ok(BatchOperationSummary::from_results(results, took))
}

fn item_result(operation: &DocumentOperation, item: &Value) -> BatchOperationResult {
    // Each item is an object with a single key naming the action.
    let Some(detail) = item.as_object().and_then(|o| o.values().next()) else {
        return BatchOperationResult::failed(operation, None, "malformed bulk response item");
    };

    let status = detail
        .get("status")
        .and_then(Value::as_u64)
        .and_then(|s| u16::try_from(s).ok());

    if let Some(err) = detail.get("error") {
        return BatchOperationResult::failed(operation, status, describe_item_error(err));
    }

    match status {
        Some(s) if (200..300).contains(&s) => BatchOperationResult::succeeded(operation, status),
        Some(404) if operation.kind() == OperationKind::Delete => {
            BatchOperationResult::succeeded(operation, status)
        }
        Some(s) => BatchOperationResult::failed(operation, status, format!("unexpected status {}", s)),
        None => BatchOperationResult::failed(operation, None, "bulk response item has no status"),
    }
}

fn describe_item_error(err: &Value) -> String {
    match err {
        Value::Object(obj) => {
            let kind = obj.get("type").and_then(Value::as_str).unwrap_or("error");
            match obj.get("reason").and_then(Value::as_str) {
                Some(reason) => format!("{}: {}", kind, reason),
                None => kind.to_string(),
            }
        }
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Body of an `_update_by_query` request.
pub fn build_update_by_query_body(query: Value, script: &str) -> Result<Value, SearchIndexError> {
    if !query.is_object() {
        return Err(SearchIndexError::validation("query must be a JSON object"));
    }
    if script.trim().is_empty() {
        return Err(SearchIndexError::validation("script cannot be empty"));
    }

    Ok(json!({
        "query": query,
        "script": {
            "source": script,
            "lang": "painless"
        }
    }))
}
