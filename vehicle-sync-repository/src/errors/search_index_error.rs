//! Search index error types.
//!
//! This module defines the unified error type for the bulk commit engine and the
//! backends it writes to. The variants double as the error taxonomy callers use to
//! tell validation, connectivity, partial-write and lifecycle failures apart.

use thiserror::Error;

/// Unified errors from the bulk commit engine and search index backends.
///
/// - `ValidationError` is returned synchronously from enqueue; the operation is never buffered.
/// - `ConnectionError` is delivered through `BulkListener::after_flush_error`; the batch is lost
///   from the engine's point of view.
/// - `PartialWriteError` summarizes per-operation failures of a batch the backend accepted; it is
///   built from the summary delivered through `BulkListener::after_flush`.
/// - `ClosedError` is returned by any operation attempted once the engine started closing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchIndexError {
    /// Validation error (e.g., missing collection or document id).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Failed to reach the search index backend, or the backend rejected the whole request.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The backend accepted the batch but some operations failed.
    #[error("Partial write: {failed} of {total} operations failed: {message}")]
    PartialWriteError {
        failed: usize,
        total: usize,
        message: String,
    },

    /// The engine is closing or closed.
    #[error("Bulk processor is closed")]
    ClosedError,

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Failed to parse response from search index backend.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize data for the search index backend.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SearchIndexError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a partial write error.
    pub fn partial_write(failed: usize, total: usize, msg: impl Into<String>) -> Self {
        Self::PartialWriteError {
            failed,
            total,
            message: msg.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Whether this error means the engine refused the call because it is shutting down.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::ClosedError)
    }
}
