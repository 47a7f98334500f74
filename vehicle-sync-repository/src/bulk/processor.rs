//! The bulk processor: the public entry point of the commit engine.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout_at, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::bulk::accumulator::BatchAccumulator;
use crate::bulk::executor::{CommitExecutor, DrainStatus};
use crate::bulk::listener::{BulkListener, LoggingListener};
use crate::bulk::policy::{FlushPolicy, FlushTrigger};
use crate::config::BulkProcessorConfig;
use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::types::DocumentOperation;

const STATE_OPEN: u8 = 0;
const STATE_CLOSING: u8 = 1;
const STATE_CLOSED: u8 = 2;

/// Lifecycle of a [`BulkProcessor`]. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    /// Accepting operations.
    Open,
    /// `close` is running: the final batch is flushing and in-flight flushes drain.
    Closing,
    /// Terminal. The provider has been released.
    Closed,
}

impl ProcessorState {
    fn from_u8(value: u8) -> Self {
        match value {
            STATE_OPEN => Self::Open,
            STATE_CLOSING => Self::Closing,
            _ => Self::Closed,
        }
    }
}

struct Inner {
    accumulator: BatchAccumulator,
    policy: FlushPolicy,
    executor: CommitExecutor,
    provider: Arc<dyn SearchIndexProvider>,
    // Serializes snapshot-then-submit so batches reach the executor in snapshot order.
    submit_gate: tokio::sync::Mutex<()>,
    state: AtomicU8,
    shutdown_tx: broadcast::Sender<()>,
    timer: Mutex<Option<JoinHandle<()>>>,
    drain_timeout: Duration,
}

impl Inner {
    fn state(&self) -> ProcessorState {
        ProcessorState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Snapshot the pending batch and hand it to the executor.
    ///
    /// The slot is reserved before the snapshot is taken, so dropping this future
    /// while it waits on backpressure leaves the operations pending instead of
    /// losing them.
    async fn request_flush(&self, trigger: FlushTrigger) -> Result<Option<u64>, SearchIndexError> {
        if self.accumulator.pending().0 == 0 {
            return Ok(None);
        }

        let _gate = self.submit_gate.lock().await;
        // Another flush, or the final one in `close`, may have taken everything while we waited.
        if self.accumulator.pending().0 == 0 {
            return Ok(None);
        }
        let slot = self.executor.reserve().await?;
        let batch = self.accumulator.snapshot_and_reset();

        if !batch.is_empty() {
            debug!(
                trigger = %trigger,
                op_count = batch.len(),
                size_bytes = batch.size_bytes(),
                "Submitting batch"
            );
        }
        Ok(self.executor.submit(slot, batch, trigger))
    }

    /// Seal the accumulator and submit whatever it still held.
    ///
    /// Waits for a slot until `deadline`. Past it the final batch is handed to a
    /// detached flush that runs once a slot frees up.
    ///
    /// The submit gate is not taken: a caller holding it has not snapshotted yet
    /// and will find the sealed accumulator empty.
    async fn seal_and_flush(&self, deadline: Instant) -> FinalFlush {
        let batch = self.accumulator.seal_and_snapshot();
        if batch.is_empty() {
            return FinalFlush::Nothing;
        }

        match timeout_at(deadline, self.executor.reserve()).await {
            Ok(Ok(slot)) => match self.executor.submit(slot, batch, FlushTrigger::Close) {
                Some(execution_id) => FinalFlush::Submitted(execution_id),
                None => FinalFlush::Nothing,
            },
            Ok(Err(_)) | Err(_) => match self.executor.submit_when_free(batch, FlushTrigger::Close) {
                Some(execution_id) => FinalFlush::Detached(execution_id),
                None => FinalFlush::Nothing,
            },
        }
    }
}

/// What happened to the batch left over at `close`.
enum FinalFlush {
    Nothing,
    Submitted(u64),
    /// No slot freed up before the drain deadline.
    Detached(u64),
}

impl Drop for Inner {
    fn drop(&mut self) {
        let (pending, _) = self.accumulator.pending();
        if self.state() == ProcessorState::Open && pending > 0 {
            warn!(
                pending = pending,
                "Bulk processor dropped without close; pending operations were discarded"
            );
        }
    }
}

/// Buffers document operations and commits them to the search engine in bulk.
///
/// Operations are flushed when `max_ops` or `max_bytes` is reached, when the flush
/// interval elapses, on `flush_now`, and on `close`. At most
/// `max_concurrent_flushes` flushes run at a time; callers that trigger a flush
/// while all slots are busy wait for one to free up.
///
/// The handle is cheap to clone and every clone drives the same processor. It must
/// be created inside a Tokio runtime.
#[derive(Clone)]
pub struct BulkProcessor {
    inner: Arc<Inner>,
}

impl BulkProcessor {
    /// Create a processor that reports flush outcomes through [`LoggingListener`].
    pub fn new(
        provider: Arc<dyn SearchIndexProvider>,
        config: BulkProcessorConfig,
    ) -> Result<Self, SearchIndexError> {
        Self::with_listener(provider, Arc::new(LoggingListener), config)
    }

    /// Create a processor with a custom flush listener.
    ///
    /// # Returns
    ///
    /// * `Ok(BulkProcessor)` - An open processor, with its flush timer running if configured
    /// * `Err(SearchIndexError::ConfigError)` - Invalid config, or no Tokio runtime available
    pub fn with_listener(
        provider: Arc<dyn SearchIndexProvider>,
        listener: Arc<dyn BulkListener>,
        config: BulkProcessorConfig,
    ) -> Result<Self, SearchIndexError> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            SearchIndexError::config(format!("bulk processor needs a tokio runtime: {}", e))
        })?;

        let executor = CommitExecutor::new(
            Arc::clone(&provider),
            listener,
            config.max_concurrent_flushes,
        )?;
        let (shutdown_tx, _) = broadcast::channel(1);

        let inner = Arc::new(Inner {
            accumulator: BatchAccumulator::new(),
            policy: FlushPolicy::from_config(&config),
            executor,
            provider,
            submit_gate: tokio::sync::Mutex::new(()),
            state: AtomicU8::new(STATE_OPEN),
            shutdown_tx,
            timer: Mutex::new(None),
            drain_timeout: config.drain_timeout,
        });

        if let Some(period) = inner.policy.flush_interval() {
            let shutdown_rx = inner.shutdown_tx.subscribe();
            let handle = runtime.spawn(run_flush_timer(Arc::downgrade(&inner), period, shutdown_rx));
            *inner.timer.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        }

        info!(
            max_ops = ?config.max_ops,
            max_bytes = ?config.max_bytes,
            flush_interval = ?config.flush_interval,
            max_concurrent_flushes = config.max_concurrent_flushes,
            "Bulk processor started"
        );

        Ok(Self { inner })
    }

    pub fn state(&self) -> ProcessorState {
        self.inner.state()
    }

    /// `(op_count, size_bytes)` of the operations not yet handed to a flush.
    pub fn pending(&self) -> (usize, usize) {
        self.inner.accumulator.pending()
    }

    /// Number of flushes currently executing.
    pub fn in_flight_flushes(&self) -> usize {
        self.inner.executor.in_flight()
    }

    fn ensure_open(&self) -> Result<(), SearchIndexError> {
        match self.state() {
            ProcessorState::Open => Ok(()),
            _ => Err(SearchIndexError::ClosedError),
        }
    }

    /// Buffer an operation and flush if it crosses a threshold.
    ///
    /// Returns once the operation is buffered. When it crosses `max_ops` or
    /// `max_bytes`, the call also waits until the resulting flush has been
    /// submitted, which is where backpressure applies. It never waits for the
    /// flush itself to complete.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The operation is buffered or already submitted
    /// * `Err(SearchIndexError::ClosedError)` - The processor is closing or closed
    pub async fn enqueue(&self, operation: DocumentOperation) -> Result<(), SearchIndexError> {
        self.ensure_open()?;
        let (op_count, size_bytes) = self.inner.accumulator.enqueue(operation)?;

        if let Some(trigger) = self.inner.policy.evaluate(op_count, size_bytes) {
            self.inner.request_flush(trigger).await?;
        }
        Ok(())
    }

    /// Buffer a full-document write.
    pub async fn enqueue_index(
        &self,
        collection: &str,
        id: &str,
        payload: Map<String, Value>,
    ) -> Result<(), SearchIndexError> {
        self.enqueue(DocumentOperation::index(collection, id, payload)?).await
    }

    /// Buffer a partial update. With `upsert`, a missing document is created from `payload`.
    pub async fn enqueue_update(
        &self,
        collection: &str,
        id: &str,
        payload: Map<String, Value>,
        upsert: bool,
    ) -> Result<(), SearchIndexError> {
        self.enqueue(DocumentOperation::update(collection, id, payload, upsert)?)
            .await
    }

    pub async fn enqueue_delete(&self, collection: &str, id: &str) -> Result<(), SearchIndexError> {
        self.enqueue(DocumentOperation::delete(collection, id)?).await
    }

    /// Flush whatever is pending right now, ignoring the thresholds.
    ///
    /// Returns the execution id of the submitted flush, or `None` when nothing was
    /// pending. Completion is reported to the listener, not here.
    pub async fn flush_now(&self) -> Result<Option<u64>, SearchIndexError> {
        self.ensure_open()?;
        self.inner.request_flush(FlushTrigger::Manual).await
    }

    /// Close with the configured drain timeout.
    pub async fn close_with_default_timeout(&self) -> Result<DrainStatus, SearchIndexError> {
        self.close(self.inner.drain_timeout).await
    }

    /// Stop accepting operations, flush the remainder and wait for in-flight flushes.
    ///
    /// `drain_timeout` bounds the whole call, including the wait for a slot for the
    /// remainder. Flushes still waiting or running after it are abandoned but keep
    /// their completion callbacks. The provider is closed in either case.
    ///
    /// # Returns
    ///
    /// * `Ok(DrainStatus)` - Whether every flush completed in time
    /// * `Err(SearchIndexError::ClosedError)` - `close` was already called
    #[instrument(skip(self))]
    pub async fn close(&self, drain_timeout: Duration) -> Result<DrainStatus, SearchIndexError> {
        self.inner
            .state
            .compare_exchange(STATE_OPEN, STATE_CLOSING, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| SearchIndexError::ClosedError)?;
        info!("Closing bulk processor");
        let deadline = Instant::now() + drain_timeout;

        // The timer may be parked waiting for a slot; it holds nothing that a
        // cancellation could lose.
        let _ = self.inner.shutdown_tx.send(());
        let timer = self
            .inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = timer {
            handle.abort();
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Flush timer task ended abnormally");
                }
            }
        }

        let mut detached = false;
        match self.inner.seal_and_flush(deadline).await {
            FinalFlush::Submitted(execution_id) => {
                debug!(execution_id = execution_id, "Submitted final batch")
            }
            FinalFlush::Detached(execution_id) => {
                warn!(
                    execution_id = execution_id,
                    "No flush slot freed up before the drain timeout; final batch left to a detached flush"
                );
                detached = true;
            }
            FinalFlush::Nothing => debug!("Nothing left to flush"),
        }

        let status = match self.inner.executor.drain_until(deadline).await {
            DrainStatus::Drained if !detached => DrainStatus::Drained,
            _ => DrainStatus::TimedOut,
        };

        if let Err(e) = self.inner.provider.close().await {
            warn!(error = %e, "Error closing search index provider");
        }
        self.inner.state.store(STATE_CLOSED, Ordering::SeqCst);

        info!(drain_status = ?status, "Bulk processor closed");
        Ok(status)
    }
}

/// Requests an interval flush every `period` until shutdown or until the processor is dropped.
async fn run_flush_timer(
    inner: Weak<Inner>,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("Flush timer stopped");
                break;
            }
            _ = ticker.tick() => {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                if inner.state() != ProcessorState::Open {
                    break;
                }
                if let Err(e) = inner.request_flush(FlushTrigger::Interval).await {
                    warn!(error = %e, "Interval flush failed");
                }
            }
        }
    }
}
