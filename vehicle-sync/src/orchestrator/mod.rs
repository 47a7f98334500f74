//! Orchestrator module for the vehicle sync ingest.
//!
//! Coordinates the consumer, processor, and loader components.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, timeout, Duration};
use tracing::{debug, error, info, instrument, warn};

use crate::consumer::{StreamMessage, VehicleEvent};
use crate::errors::IngestError;
use crate::loader::SearchLoader;
use crate::processor::VehicleProcessor;

/// Source of vehicle events for the orchestrator.
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Subscribe to the configured topics.
    fn subscribe(&self) -> Result<(), IngestError>;

    /// Stream events into `sender` until the source ends or `shutdown` fires.
    ///
    /// Acknowledgments for delivered batches arrive on `ack_receiver`.
    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        ack_receiver: mpsc::Receiver<StreamMessage>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError>;
}

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Size of the message channel buffer.
    pub channel_buffer_size: usize,
    /// Period of the progress log line.
    pub progress_interval: Duration,
    /// How long shutdown waits for the consumer task before aborting it.
    pub consumer_stop_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 1000,
            progress_interval: Duration::from_secs(10),
            consumer_stop_timeout: Duration::from_secs(30),
        }
    }
}

/// Orchestrator that coordinates the ingest components.
///
/// The orchestrator:
/// - Runs the consumer in the background and routes its batches
/// - Acknowledges offsets once the batch is accepted by the bulk processor
/// - Handles shutdown signals and closes the loader on the way out
///
/// Delivery is at-least-once up to the bulk processor's buffer only. Offsets are
/// acknowledged when the operations are buffered, not when they are committed,
/// so a flush that later fails is reported by the processor's listener while
/// Kafka already considers those events consumed. Operations buffered when the
/// process dies are lost the same way; a graceful shutdown drains them.
pub struct Orchestrator {
    consumer: Arc<dyn Consumer>,
    processor: VehicleProcessor,
    loader: SearchLoader,
    config: OrchestratorConfig,
    shutdown_tx: broadcast::Sender<()>,
    /// Total number of events received since startup.
    total_events_processed: Arc<AtomicU64>,
    /// Total number of operations handed to the bulk processor since startup.
    total_operations_enqueued: Arc<AtomicU64>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(
        consumer: Arc<dyn Consumer>,
        processor: VehicleProcessor,
        loader: SearchLoader,
    ) -> Self {
        Self::with_config(consumer, processor, loader, OrchestratorConfig::default())
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        consumer: Arc<dyn Consumer>,
        processor: VehicleProcessor,
        loader: SearchLoader,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            consumer,
            processor,
            loader,
            config,
            shutdown_tx,
            total_events_processed: Arc::new(AtomicU64::new(0)),
            total_operations_enqueued: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Run the orchestrator.
    ///
    /// Returns after the consumer stream ends or a shutdown signal arrives, once
    /// the loader has been closed.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> Result<(), IngestError> {
        info!("Starting vehicle sync orchestrator");

        self.loader.check_ready()?;
        self.consumer.subscribe()?;

        let (event_transmitter, mut event_receiver) =
            mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);
        let (ack_transmitter, ack_receiver) =
            mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);

        // Start consumer in background
        let consumer = Arc::clone(&self.consumer);
        let consumer_shutdown_rx = self.shutdown_tx.subscribe();
        let mut consumer_handle = tokio::spawn(async move {
            if let Err(e) = consumer
                .run(event_transmitter, ack_receiver, consumer_shutdown_rx)
                .await
            {
                error!(error = %e, "Consumer error");
            }
        });

        info!("Ready to process vehicle events");

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut progress_timer = interval(self.config.progress_interval);
        progress_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut prev_events: u64 = 0;
        let mut prev_ops: u64 = 0;
        let mut prev_time = std::time::Instant::now();

        loop {
            tokio::select! {
                msg = event_receiver.recv() => {
                    match msg {
                        Some(StreamMessage::Events { events, offsets }) => {
                            debug!(
                                event_count = events.len(),
                                offset_count = offsets.len(),
                                "Received events from consumer"
                            );
                            let ack = match self.process_events(events).await {
                                Ok(()) => StreamMessage::Acknowledgment {
                                    offsets,
                                    success: true,
                                    error: None,
                                },
                                Err(e) => {
                                    error!(error = %e, "Failed to enqueue events. Not committing offsets");
                                    StreamMessage::Acknowledgment {
                                        offsets,
                                        success: false,
                                        error: Some(e.to_string()),
                                    }
                                }
                            };
                            let _ = ack_transmitter.send(ack).await;
                        }
                        Some(StreamMessage::Error(e)) => {
                            error!(error = %e, "Received error from consumer");
                        }
                        Some(StreamMessage::End) | None => {
                            info!("Consumer stream ended");
                            break;
                        }
                        Some(StreamMessage::Acknowledgment { .. }) => {
                            warn!("Received acknowledgment on event channel (should be on ack channel)");
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown requested");
                    break;
                }
                _ = progress_timer.tick() => {
                    let events = self.total_events_processed.load(Ordering::Relaxed);
                    let ops = self.total_operations_enqueued.load(Ordering::Relaxed);

                    let now = std::time::Instant::now();
                    let elapsed_secs = now.duration_since(prev_time).as_secs_f64();
                    let rate = |current: u64, previous: u64| {
                        if elapsed_secs > 0.0 {
                            (current.saturating_sub(previous) as f64) / elapsed_secs
                        } else {
                            0.0
                        }
                    };

                    info!(
                        events_processed = events,
                        operations_enqueued = ops,
                        pending_operations = self.loader.pending(),
                        events_per_sec = format!("{:.2}", rate(events, prev_events)),
                        operations_per_sec = format!("{:.2}", rate(ops, prev_ops)),
                        "Processing progress"
                    );

                    prev_events = events;
                    prev_ops = ops;
                    prev_time = now;
                }
            }
        }

        // Stop the consumer before draining so nothing new arrives. Dropping the
        // receiver fails any send the consumer is blocked on.
        let _ = self.shutdown_tx.send(());
        drop(ack_transmitter);
        drop(event_receiver);
        if timeout(self.config.consumer_stop_timeout, &mut consumer_handle)
            .await
            .is_err()
        {
            warn!(
                timeout_secs = self.config.consumer_stop_timeout.as_secs(),
                "Consumer did not stop in time, aborting it"
            );
            consumer_handle.abort();
        }

        let drain_status = self.loader.close().await?;

        info!(
            total_events_processed = self.total_events_processed.load(Ordering::Relaxed),
            total_operations_enqueued = self.total_operations_enqueued.load(Ordering::Relaxed),
            drain_status = ?drain_status,
            "Orchestrator shutdown complete"
        );
        Ok(())
    }

    /// Resolve a batch of events and hand the result to the loader.
    ///
    /// Returns once every operation is buffered by the bulk processor; commits
    /// happen asynchronously according to its flush policy.
    async fn process_events(&mut self, events: Vec<VehicleEvent>) -> Result<(), IngestError> {
        let event_count = events.len();
        self.total_events_processed
            .fetch_add(event_count as u64, Ordering::Relaxed);

        let processed = self.processor.process_batch(events);
        if processed.is_empty() {
            debug!("No operations after processing");
            return Ok(());
        }

        let enqueued = self.loader.load(processed).await?;
        self.total_operations_enqueued
            .fetch_add(enqueued as u64, Ordering::Relaxed);

        Ok(())
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// A sender that triggers a graceful shutdown while `run` is borrowed.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }
}
