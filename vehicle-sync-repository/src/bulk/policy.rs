//! Flush trigger policy.

use std::fmt;
use std::time::Duration;

use crate::config::BulkProcessorConfig;

/// Why a flush was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// The buffered operation count reached `max_ops`.
    MaxOps,
    /// The buffered byte size reached `max_bytes`.
    MaxBytes,
    /// The periodic flush timer fired.
    Interval,
    /// `flush_now` was called.
    Manual,
    /// Final drain during `close`.
    Close,
}

impl fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MaxOps => "max_ops",
            Self::MaxBytes => "max_bytes",
            Self::Interval => "interval",
            Self::Manual => "manual",
            Self::Close => "close",
        };
        f.write_str(name)
    }
}

/// Decides whether the pending batch must be flushed.
///
/// Threshold checks run synchronously after every enqueue and are plain
/// comparisons; the interval is handed to the processor's timer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushPolicy {
    max_ops: Option<usize>,
    max_bytes: Option<usize>,
    flush_interval: Option<Duration>,
}

impl FlushPolicy {
    pub fn new(
        max_ops: Option<usize>,
        max_bytes: Option<usize>,
        flush_interval: Option<Duration>,
    ) -> Self {
        Self {
            max_ops,
            max_bytes,
            flush_interval,
        }
    }

    pub fn from_config(config: &BulkProcessorConfig) -> Self {
        Self::new(config.max_ops, config.max_bytes, config.flush_interval)
    }

    /// Evaluate the thresholds against the counters observed right after an enqueue.
    ///
    /// The count threshold is reported first when both are crossed.
    pub fn evaluate(&self, op_count: usize, size_bytes: usize) -> Option<FlushTrigger> {
        if self.max_ops.is_some_and(|max| op_count >= max) {
            return Some(FlushTrigger::MaxOps);
        }
        if self.max_bytes.is_some_and(|max| size_bytes >= max) {
            return Some(FlushTrigger::MaxBytes);
        }
        None
    }

    pub fn flush_interval(&self) -> Option<Duration> {
        self.flush_interval
    }
}
