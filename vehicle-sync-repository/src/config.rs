//! Configuration types for the bulk processor.

use std::time::Duration;

use crate::errors::SearchIndexError;

/// Default number of buffered operations that triggers a flush.
pub const DEFAULT_MAX_OPS: usize = 1000;

/// Default buffered byte size that triggers a flush (10 MiB).
pub const DEFAULT_MAX_BYTES: usize = 10 * 1024 * 1024;

/// Default period of the background flush timer.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of flushes allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENT_FLUSHES: usize = 2;

/// Default time `close` waits for in-flight flushes.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Configuration for the bulk processor.
///
/// Each flush trigger can be disabled by setting it to `None`. With every trigger
/// disabled, operations are only written by `flush_now` and `close`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkProcessorConfig {
    /// Flush once this many operations are buffered.
    pub max_ops: Option<usize>,
    /// Flush once the buffered operations reach this approximate size in bytes.
    pub max_bytes: Option<usize>,
    /// Flush on this period regardless of the thresholds.
    pub flush_interval: Option<Duration>,
    /// Upper bound on concurrently executing flushes. Must be at least 1.
    pub max_concurrent_flushes: usize,
    /// How long `close` waits for in-flight flushes before giving up on them.
    pub drain_timeout: Duration,
}

impl Default for BulkProcessorConfig {
    fn default() -> Self {
        Self {
            max_ops: Some(DEFAULT_MAX_OPS),
            max_bytes: Some(DEFAULT_MAX_BYTES),
            flush_interval: Some(DEFAULT_FLUSH_INTERVAL),
            max_concurrent_flushes: DEFAULT_MAX_CONCURRENT_FLUSHES,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

impl BulkProcessorConfig {
    /// Create a config with every automatic trigger disabled.
    ///
    /// Buffered operations are only written by `flush_now` and `close`.
    pub fn manual() -> Self {
        Self {
            max_ops: None,
            max_bytes: None,
            flush_interval: None,
            ..Self::default()
        }
    }

    pub fn with_max_ops(mut self, max_ops: Option<usize>) -> Self {
        self.max_ops = max_ops;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: Option<usize>) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn with_flush_interval(mut self, flush_interval: Option<Duration>) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    pub fn with_max_concurrent_flushes(mut self, max_concurrent_flushes: usize) -> Self {
        self.max_concurrent_flushes = max_concurrent_flushes;
        self
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// Check the configuration for values the processor cannot run with.
    ///
    /// Zero thresholds are rejected; disabling a trigger is spelled `None`.
    pub fn validate(&self) -> Result<(), SearchIndexError> {
        if self.max_ops == Some(0) {
            return Err(SearchIndexError::config(
                "max_ops must be at least 1 (use None to disable)",
            ));
        }
        if self.max_bytes == Some(0) {
            return Err(SearchIndexError::config(
                "max_bytes must be at least 1 (use None to disable)",
            ));
        }
        if self.flush_interval == Some(Duration::ZERO) {
            return Err(SearchIndexError::config(
                "flush_interval must be positive (use None to disable)",
            ));
        }
        if self.max_concurrent_flushes == 0 {
            return Err(SearchIndexError::config(
                "max_concurrent_flushes must be at least 1",
            ));
        }
        if u32::try_from(self.max_concurrent_flushes).is_err() {
            return Err(SearchIndexError::config(format!(
                "max_concurrent_flushes {} is too large",
                self.max_concurrent_flushes
            )));
        }
        Ok(())
    }
}
