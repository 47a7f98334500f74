//! OpenSearch implementation of the search index provider.
//!
//! This module provides a concrete implementation of `SearchIndexProvider`
//! using OpenSearch as the backend.

mod provider;

pub use provider::{
    build_bulk_body, build_update_by_query_body, parse_bulk_response, OpenSearchProvider,
    RoundRobinPool, UpdateByQuerySummary,
};
