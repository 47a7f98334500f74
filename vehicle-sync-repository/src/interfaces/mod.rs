//! Interface definitions for the search index backend.
//!
//! This module defines the abstract `SearchIndexProvider` trait that the bulk
//! commit engine writes through, allowing swappable backend implementations.

mod search_index_provider;

pub use search_index_provider::SearchIndexProvider;
