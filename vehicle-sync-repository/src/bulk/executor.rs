//! Bounded-concurrency execution of flush tasks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout_at;
use tracing::{debug, instrument, warn};

use crate::bulk::accumulator::PendingBatch;
use crate::bulk::listener::BulkListener;
use crate::bulk::policy::FlushTrigger;
use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::utils::duration_millis;

/// Outcome of waiting for in-flight flushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainStatus {
    /// Every submitted flush reached its completion callback.
    Drained,
    /// The timeout elapsed first; the remaining flushes keep running detached.
    TimedOut,
}

/// A snapshot handed to the executor, with its metadata.
#[derive(Debug, Clone)]
pub struct FlushTask {
    pub execution_id: u64,
    pub trigger: FlushTrigger,
    pub started_at: DateTime<Utc>,
    pub batch: PendingBatch,
}

/// Runs flush tasks against the provider with at most `max_concurrent` in flight.
///
/// A slot must be reserved before a task is submitted. Reserving waits while all
/// slots are busy, which is how backpressure reaches the callers that trigger
/// flushes.
pub struct CommitExecutor {
    provider: Arc<dyn SearchIndexProvider>,
    listener: Arc<dyn BulkListener>,
    slots: Arc<Semaphore>,
    max_concurrent: u32,
    next_execution_id: AtomicU64,
}

impl CommitExecutor {
    pub fn new(
        provider: Arc<dyn SearchIndexProvider>,
        listener: Arc<dyn BulkListener>,
        max_concurrent: usize,
    ) -> Result<Self, SearchIndexError> {
        let max_concurrent = u32::try_from(max_concurrent)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                SearchIndexError::config(format!(
                    "invalid max_concurrent_flushes: {}",
                    max_concurrent
                ))
            })?;

        Ok(Self {
            provider,
            listener,
            slots: Arc::new(Semaphore::new(max_concurrent as usize)),
            max_concurrent,
            next_execution_id: AtomicU64::new(1),
        })
    }

    /// Wait for a free execution slot.
    ///
    /// # Returns
    ///
    /// * `Ok(OwnedSemaphorePermit)` - The slot, released when the flush completes
    /// * `Err(SearchIndexError::ClosedError)` - The executor has been drained
    pub async fn reserve(&self) -> Result<OwnedSemaphorePermit, SearchIndexError> {
        Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| SearchIndexError::ClosedError)
    }

    /// Start flushing `batch` in the background using a reserved slot.
    ///
    /// Returns the execution id, or `None` for an empty batch, in which case the
    /// slot is released immediately and no callback fires.
    pub fn submit(
        &self,
        slot: OwnedSemaphorePermit,
        batch: PendingBatch,
        trigger: FlushTrigger,
    ) -> Option<u64> {
        let task = self.task(batch, trigger)?;
        let execution_id = task.execution_id;

        let provider = Arc::clone(&self.provider);
        let listener = Arc::clone(&self.listener);
        tokio::spawn(async move {
            execute_flush(provider.as_ref(), listener.as_ref(), &task).await;
            drop(slot);
        });

        Some(execution_id)
    }

    /// Flush `batch` in the background as soon as a slot frees up.
    ///
    /// Used when the caller cannot wait for a slot itself. The flush still runs,
    /// and reports to the listener, if the executor is closed in the meantime.
    pub fn submit_when_free(&self, batch: PendingBatch, trigger: FlushTrigger) -> Option<u64> {
        let task = self.task(batch, trigger)?;
        let execution_id = task.execution_id;

        let slots = Arc::clone(&self.slots);
        let provider = Arc::clone(&self.provider);
        let listener = Arc::clone(&self.listener);
        tokio::spawn(async move {
            let slot = slots.acquire_owned().await.ok();
            execute_flush(provider.as_ref(), listener.as_ref(), &task).await;
            drop(slot);
        });

        Some(execution_id)
    }

    fn task(&self, batch: PendingBatch, trigger: FlushTrigger) -> Option<FlushTask> {
        if batch.is_empty() {
            return None;
        }

        Some(FlushTask {
            execution_id: self.next_execution_id.fetch_add(1, Ordering::Relaxed),
            trigger,
            started_at: Utc::now(),
            batch,
        })
    }

    /// Number of flushes currently holding a slot.
    pub fn in_flight(&self) -> usize {
        (self.max_concurrent as usize).saturating_sub(self.slots.available_permits())
    }

    /// Wait up to `timeout` for every in-flight flush, then refuse new reservations.
    pub async fn drain(&self, timeout: Duration) -> DrainStatus {
        self.drain_until(tokio::time::Instant::now() + timeout).await
    }

    /// Wait until `deadline` for every in-flight flush.
    ///
    /// New reservations are refused once everything drained. After a timeout the
    /// slots stay open so detached flushes can still take their turn.
    pub async fn drain_until(&self, deadline: tokio::time::Instant) -> DrainStatus {
        match timeout_at(deadline, self.slots.acquire_many(self.max_concurrent)).await {
            Ok(_) => {
                self.slots.close();
                DrainStatus::Drained
            }
            Err(_) => {
                warn!(
                    in_flight = self.in_flight(),
                    "Timed out waiting for in-flight flushes"
                );
                DrainStatus::TimedOut
            }
        }
    }
}

#[instrument(
    skip_all,
    fields(
        execution_id = task.execution_id,
        trigger = %task.trigger,
        op_count = task.batch.len()
    )
)]
async fn execute_flush(
    provider: &dyn SearchIndexProvider,
    listener: &dyn BulkListener,
    task: &FlushTask,
) {
    listener.before_flush(task.execution_id, &task.batch);

    let started = Instant::now();
    let outcome = provider.apply_batch(task.batch.operations()).await;
    debug!(
        started_at = %task.started_at.to_rfc3339(),
        elapsed_ms = duration_millis(started.elapsed()),
        "Backend call returned"
    );

    match outcome {
        Ok(summary) => {
            if summary.total != task.batch.len() {
                warn!(
                    expected = task.batch.len(),
                    reported = summary.total,
                    "Backend reported a different number of results than operations sent"
                );
            }
            listener.after_flush(task.execution_id, &task.batch, &summary);
        }
        Err(error) => listener.after_flush_error(task.execution_id, &task.batch, &error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BatchOperationResult, BatchOperationSummary, DocumentOperation};
    use async_trait::async_trait;
    use serde_json::Map;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::mpsc;

    struct SlowProvider {
        delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl SearchIndexProvider for SlowProvider {
        async fn apply_batch(
            &self,
            operations: &[DocumentOperation],
        ) -> Result<BatchOperationSummary, SearchIndexError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let results = operations
                .iter()
                .map(|op| BatchOperationResult::succeeded(op, Some(200)))
                .collect();
            Ok(BatchOperationSummary::from_results(results, self.delay))
        }
    }

    struct ChannelListener(mpsc::UnboundedSender<u64>);

    impl BulkListener for ChannelListener {
        fn after_flush(&self, execution_id: u64, _: &PendingBatch, _: &BatchOperationSummary) {
            let _ = self.0.send(execution_id);
        }

        fn after_flush_error(&self, execution_id: u64, _: &PendingBatch, _: &SearchIndexError) {
            let _ = self.0.send(execution_id);
        }
    }

    fn batch(id: &str) -> PendingBatch {
        std::iter::once(DocumentOperation::index("vehicles", id, Map::new()).unwrap()).collect()
    }

    fn executor(delay: Duration, max: usize) -> (CommitExecutor, Arc<SlowProvider>, mpsc::UnboundedReceiver<u64>) {
        let provider = Arc::new(SlowProvider {
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });
        let (tx, rx) = mpsc::unbounded_channel();
        let executor = CommitExecutor::new(provider.clone(), Arc::new(ChannelListener(tx)), max).unwrap();
        (executor, provider, rx)
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let provider = Arc::new(SlowProvider {
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(CommitExecutor::new(provider, Arc::new(ChannelListener(tx)), 0).is_err());
    }

    #[tokio::test]
    async fn test_execution_ids_are_sequential() {
        let (executor, _provider, mut rx) = executor(Duration::ZERO, 1);

        for id in ["v1", "v2", "v3"] {
            let slot = executor.reserve().await.unwrap();
            executor.submit(slot, batch(id), FlushTrigger::Manual);
        }

        let mut seen = vec![rx.recv().await.unwrap(), rx.recv().await.unwrap(), rx.recv().await.unwrap()];
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_empty_batch_is_not_submitted() {
        let (executor, _provider, mut rx) = executor(Duration::ZERO, 1);

        let slot = executor.reserve().await.unwrap();
        assert_eq!(executor.submit(slot, PendingBatch::new(), FlushTrigger::Interval), None);
        assert_eq!(executor.in_flight(), 0);
        assert_eq!(executor.drain(Duration::from_secs(1)).await, DrainStatus::Drained);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let (executor, provider, mut rx) = executor(Duration::from_millis(20), 2);

        for i in 0..8 {
            let slot = executor.reserve().await.unwrap();
            executor.submit(slot, batch(&format!("v{}", i)), FlushTrigger::MaxOps);
        }
        for _ in 0..8 {
            rx.recv().await.unwrap();
        }

        assert!(provider.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_drain_waits_for_in_flight_flushes() {
        let (executor, _provider, mut rx) = executor(Duration::from_millis(30), 2);

        let slot = executor.reserve().await.unwrap();
        executor.submit(slot, batch("v1"), FlushTrigger::Manual);

        assert_eq!(executor.drain(Duration::from_secs(5)).await, DrainStatus::Drained);
        assert_eq!(rx.try_recv().unwrap(), 1);
        assert_eq!(executor.reserve().await.unwrap_err(), SearchIndexError::ClosedError);
    }

    #[tokio::test]
    async fn test_drain_times_out() {
        let (executor, _provider, mut rx) = executor(Duration::from_millis(300), 1);

        let slot = executor.reserve().await.unwrap();
        executor.submit(slot, batch("v1"), FlushTrigger::Close);

        assert_eq!(executor.drain(Duration::from_millis(10)).await, DrainStatus::TimedOut);
        // The detached flush still reports its outcome.
        assert_eq!(rx.recv().await, Some(1));
    }

    #[tokio::test]
    async fn test_submit_when_free_waits_for_a_slot() {
        let (executor, provider, mut rx) = executor(Duration::from_millis(50), 1);

        let slot = executor.reserve().await.unwrap();
        assert_eq!(executor.submit(slot, batch("v1"), FlushTrigger::Manual), Some(1));
        assert_eq!(executor.submit_when_free(batch("v2"), FlushTrigger::Close), Some(2));
        assert_eq!(executor.submit_when_free(PendingBatch::new(), FlushTrigger::Close), None);

        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));
        assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(executor.drain(Duration::from_secs(1)).await, DrainStatus::Drained);
    }
}
