//! Integration tests for the bulk processor.
//!
//! These tests drive `BulkProcessor` against an in-memory provider and a listener
//! that records every callback.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::{mpsc, Semaphore};

use vehicle_sync_repository::{
    BatchOperationResult, BatchOperationSummary, BulkListener, BulkProcessor, BulkProcessorConfig,
    DocumentOperation, DrainStatus, OperationKind, PendingBatch, ProcessorState,
    SearchIndexError, SearchIndexProvider,
};

// Mock provider

#[derive(Default)]
struct MockProvider {
    batches: Mutex<Vec<Vec<DocumentOperation>>>,
    fail_connectivity: AtomicBool,
    gate: Option<Arc<Semaphore>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    close_calls: AtomicUsize,
}

impl MockProvider {
    fn new() -> Self {
        Self::default()
    }

    fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    fn failing() -> Self {
        let provider = Self::default();
        provider.fail_connectivity.store(true, Ordering::SeqCst);
        provider
    }

    fn batch_ids(&self) -> Vec<Vec<String>> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .map(|batch| batch.iter().map(|op| op.id().to_string()).collect())
            .collect()
    }

    fn all_ids(&self) -> Vec<String> {
        self.batch_ids().into_iter().flatten().collect()
    }
}

#[async_trait]
impl SearchIndexProvider for MockProvider {
    async fn apply_batch(
        &self,
        operations: &[DocumentOperation],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_connectivity.load(Ordering::SeqCst) {
            return Err(SearchIndexError::connection("connection refused"));
        }

        self.batches.lock().unwrap().push(operations.to_vec());

        let results = operations
            .iter()
            .map(|op| {
                if op.id().starts_with("bad") {
                    BatchOperationResult::failed(op, Some(400), "mapper_parsing_exception")
                } else {
                    BatchOperationResult::succeeded(op, Some(200))
                }
            })
            .collect();
        Ok(BatchOperationSummary::from_results(results, Duration::from_millis(3)))
    }

    async fn close(&self) -> Result<(), SearchIndexError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// Recording listener

#[derive(Debug, Clone, PartialEq)]
enum FlushEvent {
    Before {
        execution_id: u64,
        ids: Vec<String>,
    },
    After {
        execution_id: u64,
        ids: Vec<String>,
        succeeded: usize,
        failed: usize,
    },
    Error {
        execution_id: u64,
        ids: Vec<String>,
        error: SearchIndexError,
    },
}

struct RecordingListener {
    tx: mpsc::UnboundedSender<FlushEvent>,
}

fn ids(batch: &PendingBatch) -> Vec<String> {
    batch.operations().iter().map(|op| op.id().to_string()).collect()
}

impl BulkListener for RecordingListener {
    fn before_flush(&self, execution_id: u64, batch: &PendingBatch) {
        let _ = self.tx.send(FlushEvent::Before {
            execution_id,
            ids: ids(batch),
        });
    }

    fn after_flush(&self, execution_id: u64, batch: &PendingBatch, summary: &BatchOperationSummary) {
        let _ = self.tx.send(FlushEvent::After {
            execution_id,
            ids: ids(batch),
            succeeded: summary.succeeded,
            failed: summary.failed,
        });
    }

    fn after_flush_error(&self, execution_id: u64, batch: &PendingBatch, error: &SearchIndexError) {
        let _ = self.tx.send(FlushEvent::Error {
            execution_id,
            ids: ids(batch),
            error: error.clone(),
        });
    }
}

// Helpers

fn vehicle(vin: &str) -> Map<String, Value> {
    json!({ "vin": vin, "brand": "BYD" }).as_object().cloned().unwrap()
}

fn processor_with(
    provider: Arc<MockProvider>,
    config: BulkProcessorConfig,
) -> (BulkProcessor, mpsc::UnboundedReceiver<FlushEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let processor =
        BulkProcessor::with_listener(provider, Arc::new(RecordingListener { tx }), config)
            .expect("valid config");
    (processor, rx)
}

fn drain_events(rx: &mut mpsc::UnboundedReceiver<FlushEvent>) -> Vec<FlushEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// Tests

#[tokio::test]
async fn test_flush_now_commits_buffered_operations() {
    let provider = Arc::new(MockProvider::new());
    let config = BulkProcessorConfig::manual().with_max_ops(Some(5));
    let (processor, mut rx) = processor_with(provider.clone(), config);

    for id in ["v1", "v2", "v3"] {
        processor
            .enqueue_index("vehicles", id, vehicle(&format!("LSV-{}", id)))
            .await
            .unwrap();
    }

    assert_eq!(processor.pending().0, 3);
    assert!(provider.batch_ids().is_empty());

    let execution_id = processor.flush_now().await.unwrap().expect("a flush was submitted");

    let expected = vec!["v1".to_string(), "v2".to_string(), "v3".to_string()];
    assert_eq!(
        rx.recv().await.unwrap(),
        FlushEvent::Before {
            execution_id,
            ids: expected.clone()
        }
    );
    assert_eq!(
        rx.recv().await.unwrap(),
        FlushEvent::After {
            execution_id,
            ids: expected.clone(),
            succeeded: 3,
            failed: 0
        }
    );
    assert_eq!(provider.batch_ids(), vec![expected]);
    assert_eq!(processor.pending(), (0, 0));

    processor.close(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_flush_now_with_nothing_pending_is_a_no_op() {
    let provider = Arc::new(MockProvider::new());
    let (processor, mut rx) = processor_with(provider.clone(), BulkProcessorConfig::manual());

    assert_eq!(processor.flush_now().await.unwrap(), None);
    processor.close(Duration::from_secs(5)).await.unwrap();

    assert!(drain_events(&mut rx).is_empty());
    assert!(provider.batch_ids().is_empty());
}

#[tokio::test]
async fn test_max_ops_triggers_flush() {
    let provider = Arc::new(MockProvider::new());
    let config = BulkProcessorConfig::manual().with_max_ops(Some(2));
    let (processor, mut rx) = processor_with(provider.clone(), config);

    processor.enqueue_index("vehicles", "v1", vehicle("A")).await.unwrap();
    processor.enqueue_index("vehicles", "v2", vehicle("B")).await.unwrap();

    match rx.recv().await.unwrap() {
        FlushEvent::Before { ids, .. } => assert_eq!(ids, vec!["v1", "v2"]),
        other => panic!("unexpected event {:?}", other),
    }

    processor.enqueue_index("vehicles", "v3", vehicle("C")).await.unwrap();
    assert_eq!(processor.pending().0, 1);

    match rx.recv().await.unwrap() {
        FlushEvent::After { ids, succeeded, .. } => {
            assert_eq!(ids, vec!["v1", "v2"]);
            assert_eq!(succeeded, 2);
        }
        other => panic!("unexpected event {:?}", other),
    }

    processor.close(Duration::from_secs(5)).await.unwrap();
    assert_eq!(
        provider.batch_ids(),
        vec![vec!["v1".to_string(), "v2".to_string()], vec!["v3".to_string()]]
    );
}

#[tokio::test]
async fn test_max_bytes_triggers_flush() {
    let provider = Arc::new(MockProvider::new());
    let probe = DocumentOperation::index("vehicles", "v1", vehicle("LSV0000000000001")).unwrap();
    let threshold = probe.size_bytes() * 3;
    let config = BulkProcessorConfig::manual().with_max_bytes(Some(threshold));
    let (processor, mut rx) = processor_with(provider.clone(), config);

    processor.enqueue_index("vehicles", "v1", vehicle("LSV0000000000001")).await.unwrap();
    processor.enqueue_index("vehicles", "v2", vehicle("LSV0000000000002")).await.unwrap();
    assert!(rx.try_recv().is_err());
    processor.enqueue_index("vehicles", "v3", vehicle("LSV0000000000003")).await.unwrap();

    match rx.recv().await.unwrap() {
        FlushEvent::Before { ids, .. } => assert_eq!(ids, vec!["v1", "v2", "v3"]),
        other => panic!("unexpected event {:?}", other),
    }

    processor.close(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_no_flush_before_any_threshold() {
    let provider = Arc::new(MockProvider::new());
    let config = BulkProcessorConfig::default()
        .with_max_ops(Some(10))
        .with_max_bytes(Some(10 * 1024 * 1024))
        .with_flush_interval(Some(Duration::from_secs(60)));
    let (processor, mut rx) = processor_with(provider.clone(), config);

    for i in 0..9 {
        processor
            .enqueue_index("vehicles", &format!("v{}", i), vehicle("A"))
            .await
            .unwrap();
    }

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(rx.try_recv().is_err());
    assert!(provider.batch_ids().is_empty());
    assert_eq!(processor.pending().0, 9);

    // The interval flush fires at the 60 second mark.
    match rx.recv().await.unwrap() {
        FlushEvent::Before { ids, .. } => assert_eq!(ids.len(), 9),
        other => panic!("unexpected event {:?}", other),
    }

    processor.close(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_interval_flush_repeats() {
    let provider = Arc::new(MockProvider::new());
    let config = BulkProcessorConfig::manual().with_flush_interval(Some(Duration::from_secs(5)));
    let (processor, mut rx) = processor_with(provider.clone(), config);

    processor.enqueue_delete("vehicles", "v1").await.unwrap();
    tokio::time::sleep(Duration::from_secs(6)).await;
    processor.enqueue_delete("vehicles", "v2").await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    processor.close(Duration::from_secs(5)).await.unwrap();

    assert_eq!(
        provider.batch_ids(),
        vec![vec!["v1".to_string()], vec!["v2".to_string()]]
    );
    let afters = drain_events(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, FlushEvent::After { .. }))
        .count();
    assert_eq!(afters, 2);
}

#[tokio::test]
async fn test_connectivity_failure_keeps_processor_open() {
    let provider = Arc::new(MockProvider::failing());
    let (processor, mut rx) = processor_with(provider.clone(), BulkProcessorConfig::manual());

    processor.enqueue_index("vehicles", "v1", vehicle("A")).await.unwrap();
    let execution_id = processor.flush_now().await.unwrap().unwrap();

    assert!(matches!(rx.recv().await.unwrap(), FlushEvent::Before { .. }));
    match rx.recv().await.unwrap() {
        FlushEvent::Error {
            execution_id: id,
            ids,
            error,
        } => {
            assert_eq!(id, execution_id);
            assert_eq!(ids, vec!["v1"]);
            assert!(matches!(error, SearchIndexError::ConnectionError(_)));
        }
        other => panic!("unexpected event {:?}", other),
    }

    assert_eq!(processor.state(), ProcessorState::Open);
    processor.enqueue_index("vehicles", "v2", vehicle("B")).await.unwrap();
    assert_eq!(processor.pending().0, 1);

    processor.close(Duration::from_secs(5)).await.unwrap();
    let events = drain_events(&mut rx);
    assert!(events.iter().all(|e| !matches!(e, FlushEvent::After { .. })));
}

#[tokio::test]
async fn test_partial_failure_is_reported_not_retried() {
    let provider = Arc::new(MockProvider::new());
    let (processor, mut rx) = processor_with(provider.clone(), BulkProcessorConfig::manual());

    processor.enqueue_index("vehicles", "v1", vehicle("A")).await.unwrap();
    processor.enqueue_index("vehicles", "bad-1", vehicle("B")).await.unwrap();
    processor.flush_now().await.unwrap();

    processor.close(Duration::from_secs(5)).await.unwrap();

    let events = drain_events(&mut rx);
    assert!(events.contains(&FlushEvent::After {
        execution_id: 1,
        ids: vec!["v1".to_string(), "bad-1".to_string()],
        succeeded: 1,
        failed: 1,
    }));
    assert_eq!(provider.batch_ids().len(), 1);
}

#[tokio::test]
async fn test_operations_keep_enqueue_order_within_batch() {
    let provider = Arc::new(MockProvider::new());
    let (processor, _rx) = processor_with(provider.clone(), BulkProcessorConfig::manual());

    processor.enqueue_index("vehicles", "v1", vehicle("A")).await.unwrap();
    processor
        .enqueue_update("vehicles", "v1", vehicle("B"), true)
        .await
        .unwrap();
    processor.enqueue_delete("vehicles", "v1").await.unwrap();

    processor.close(Duration::from_secs(5)).await.unwrap();

    let batches = provider.batches.lock().unwrap();
    let kinds: Vec<OperationKind> = batches[0].iter().map(|op| op.kind()).collect();
    assert_eq!(
        kinds,
        vec![OperationKind::Index, OperationKind::Update, OperationKind::Delete]
    );
}

#[tokio::test]
async fn test_invalid_operation_is_rejected_and_not_buffered() {
    let provider = Arc::new(MockProvider::new());
    let (processor, _rx) = processor_with(provider.clone(), BulkProcessorConfig::manual());

    let err = processor
        .enqueue_index("", "v1", vehicle("A"))
        .await
        .unwrap_err();
    assert!(matches!(err, SearchIndexError::ValidationError(_)));

    let err = processor.enqueue_delete("vehicles", "  ").await.unwrap_err();
    assert!(matches!(err, SearchIndexError::ValidationError(_)));

    assert_eq!(processor.pending(), (0, 0));
    processor.close(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_close_flushes_remainder_and_closes_provider() {
    let provider = Arc::new(MockProvider::new());
    let (processor, _rx) = processor_with(provider.clone(), BulkProcessorConfig::manual());

    for i in 0..5 {
        processor
            .enqueue_index("vehicles", &format!("v{}", i), vehicle("A"))
            .await
            .unwrap();
    }

    let status = processor.close(Duration::from_secs(5)).await.unwrap();

    assert_eq!(status, DrainStatus::Drained);
    assert_eq!(processor.state(), ProcessorState::Closed);
    assert_eq!(provider.all_ids(), vec!["v0", "v1", "v2", "v3", "v4"]);
    assert_eq!(provider.close_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_calls_after_close_are_rejected() {
    let provider = Arc::new(MockProvider::new());
    let (processor, _rx) = processor_with(provider.clone(), BulkProcessorConfig::manual());

    processor.close(Duration::from_secs(5)).await.unwrap();

    assert_eq!(
        processor.enqueue_index("vehicles", "v1", vehicle("A")).await,
        Err(SearchIndexError::ClosedError)
    );
    assert_eq!(processor.flush_now().await, Err(SearchIndexError::ClosedError));
    assert_eq!(
        processor.close(Duration::from_secs(5)).await,
        Err(SearchIndexError::ClosedError)
    );
    assert!(provider.all_ids().is_empty());
    assert_eq!(provider.close_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_enqueue_no_loss_no_duplication() {
    let provider = Arc::new(MockProvider::new());
    let config = BulkProcessorConfig::manual()
        .with_max_ops(Some(7))
        .with_max_concurrent_flushes(3);
    let (processor, _rx) = processor_with(provider.clone(), config);

    let mut handles = Vec::new();
    for task in 0..8 {
        let processor = processor.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..250 {
                processor
                    .enqueue_index("vehicles", &format!("t{}-{}", task, i), vehicle("A"))
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let status = processor.close(Duration::from_secs(30)).await.unwrap();
    assert_eq!(status, DrainStatus::Drained);

    let all = provider.all_ids();
    let unique: HashSet<&String> = all.iter().collect();
    assert_eq!(all.len(), 2000);
    assert_eq!(unique.len(), 2000);
    assert!(provider.max_in_flight.load(Ordering::SeqCst) <= 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_enqueue_racing_close_is_either_flushed_or_rejected() {
    let provider = Arc::new(MockProvider::new());
    let config = BulkProcessorConfig::manual().with_max_ops(Some(16));
    let (processor, _rx) = processor_with(provider.clone(), config);

    let mut handles = Vec::new();
    for task in 0..4 {
        let processor = processor.clone();
        handles.push(tokio::spawn(async move {
            let mut accepted = 0usize;
            for i in 0.. {
                match processor
                    .enqueue_index("vehicles", &format!("t{}-{}", task, i), vehicle("A"))
                    .await
                {
                    Ok(()) => accepted += 1,
                    Err(SearchIndexError::ClosedError) => break,
                    Err(e) => panic!("unexpected error {:?}", e),
                }
                if i % 32 == 0 {
                    tokio::task::yield_now().await;
                }
            }
            accepted
        }));
    }

    tokio::time::sleep(Duration::from_millis(20)).await;
    processor.close(Duration::from_secs(30)).await.unwrap();

    let mut accepted = 0;
    for handle in handles {
        accepted += handle.await.unwrap();
    }

    let all = provider.all_ids();
    let unique: HashSet<&String> = all.iter().collect();
    assert_eq!(all.len(), accepted);
    assert_eq!(unique.len(), accepted);
}

#[tokio::test]
async fn test_backpressure_blocks_trigger_when_slots_are_busy() {
    let gate = Arc::new(Semaphore::new(0));
    let provider = Arc::new(MockProvider::gated(gate.clone()));
    let config = BulkProcessorConfig::manual()
        .with_max_ops(Some(1))
        .with_max_concurrent_flushes(1);
    let (processor, mut rx) = processor_with(provider.clone(), config);

    processor.enqueue_index("vehicles", "v1", vehicle("A")).await.unwrap();
    assert!(matches!(rx.recv().await.unwrap(), FlushEvent::Before { .. }));
    assert_eq!(processor.in_flight_flushes(), 1);

    let blocked = {
        let processor = processor.clone();
        tokio::spawn(async move { processor.enqueue_index("vehicles", "v2", vehicle("B")).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!blocked.is_finished());
    assert_eq!(processor.pending().0, 1);

    gate.add_permits(10);
    blocked.await.unwrap().unwrap();

    processor.close(Duration::from_secs(5)).await.unwrap();
    assert_eq!(
        provider.batch_ids(),
        vec![vec!["v1".to_string()], vec!["v2".to_string()]]
    );
    assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_drain_timeout_reports_timed_out() {
    let gate = Arc::new(Semaphore::new(0));
    let provider = Arc::new(MockProvider::gated(gate.clone()));
    let (processor, mut rx) = processor_with(provider.clone(), BulkProcessorConfig::manual());

    processor.enqueue_index("vehicles", "v1", vehicle("A")).await.unwrap();
    processor.flush_now().await.unwrap();

    let status = processor.close(Duration::from_millis(50)).await.unwrap();

    assert_eq!(status, DrainStatus::TimedOut);
    assert_eq!(processor.state(), ProcessorState::Closed);
    assert_eq!(provider.close_calls.load(Ordering::SeqCst), 1);

    // The abandoned flush still completes and reports.
    gate.add_permits(1);
    loop {
        match rx.recv().await.unwrap() {
            FlushEvent::After { ids, .. } => {
                assert_eq!(ids, vec!["v1"]);
                break;
            }
            FlushEvent::Before { .. } => continue,
            other => panic!("unexpected event {:?}", other),
        }
    }
}

/// Collect the ids of successful flushes until `count` flushes have completed.
async fn committed_ids(rx: &mut mpsc::UnboundedReceiver<FlushEvent>, count: usize) -> Vec<String> {
    let mut committed = Vec::new();
    let mut completed = 0;
    while completed < count {
        match rx.recv().await.unwrap() {
            FlushEvent::After { ids, .. } => {
                committed.extend(ids);
                completed += 1;
            }
            FlushEvent::Before { .. } => continue,
            other => panic!("unexpected event {:?}", other),
        }
    }
    committed
}

#[tokio::test]
async fn test_close_is_bounded_when_every_slot_is_stuck() {
    let gate = Arc::new(Semaphore::new(0));
    let provider = Arc::new(MockProvider::gated(gate.clone()));
    let config = BulkProcessorConfig::manual().with_max_concurrent_flushes(1);
    let (processor, mut rx) = processor_with(provider.clone(), config);

    processor.enqueue_index("vehicles", "v1", vehicle("A")).await.unwrap();
    processor.flush_now().await.unwrap();
    processor.enqueue_index("vehicles", "v2", vehicle("B")).await.unwrap();

    let status = tokio::time::timeout(Duration::from_secs(2), processor.close(Duration::from_millis(100)))
        .await
        .expect("close must honor its drain timeout")
        .unwrap();

    assert_eq!(status, DrainStatus::TimedOut);
    assert_eq!(processor.state(), ProcessorState::Closed);
    assert_eq!(provider.close_calls.load(Ordering::SeqCst), 1);
    assert_eq!(processor.pending().0, 0);

    // Both the stuck flush and the leftover batch complete once the backend answers.
    gate.add_permits(1);
    assert_eq!(committed_ids(&mut rx, 2).await, vec!["v1", "v2"]);
    assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_close_is_bounded_when_the_timer_waits_for_a_slot() {
    let gate = Arc::new(Semaphore::new(0));
    let provider = Arc::new(MockProvider::gated(gate.clone()));
    let config = BulkProcessorConfig::manual()
        .with_flush_interval(Some(Duration::from_millis(20)))
        .with_max_concurrent_flushes(1);
    let (processor, mut rx) = processor_with(provider.clone(), config);

    processor.enqueue_index("vehicles", "v1", vehicle("A")).await.unwrap();
    assert!(matches!(rx.recv().await.unwrap(), FlushEvent::Before { .. }));

    // The next tick finds v2 pending and parks waiting for the only slot.
    processor.enqueue_index("vehicles", "v2", vehicle("B")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let status = tokio::time::timeout(Duration::from_secs(2), processor.close(Duration::from_millis(100)))
        .await
        .expect("close must not wait on the flush timer")
        .unwrap();

    assert_eq!(status, DrainStatus::TimedOut);
    assert_eq!(processor.state(), ProcessorState::Closed);
    assert_eq!(provider.close_calls.load(Ordering::SeqCst), 1);

    gate.add_permits(1);
    assert_eq!(committed_ids(&mut rx, 2).await, vec!["v1", "v2"]);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let provider = Arc::new(MockProvider::new());
    let config = BulkProcessorConfig::default().with_max_concurrent_flushes(0);
    assert!(matches!(
        BulkProcessor::new(provider, config),
        Err(SearchIndexError::ConfigError(_))
    ));
}

#[test]
fn test_processor_requires_runtime() {
    let provider = Arc::new(MockProvider::new());
    assert!(matches!(
        BulkProcessor::new(provider, BulkProcessorConfig::manual()),
        Err(SearchIndexError::ConfigError(_))
    ));
}
