//! Error types for the vehicle sync repository.
//!
//! This module provides a unified error type for the bulk engine and its backends.

mod search_index_error;

pub use search_index_error::SearchIndexError;
