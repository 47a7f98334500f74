//! Kafka consumer implementation for the vehicle sync.
//!
//! Consumes vehicle change events from Kafka and forwards them to the ingest.

use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer as _, StreamConsumer},
    message::{BorrowedMessage, Message as KafkaMessage},
    Offset, TopicPartitionList,
};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, instrument};

use crate::consumer::messages::{StreamMessage, VehicleEvent};
use crate::errors::IngestError;
use crate::orchestrator::Consumer;

/// Default topic carrying vehicle change events.
pub const DEFAULT_TOPIC: &str = "SYNC_DATABASE_ES";

/// Default batch size for Kafka message batching.
const DEFAULT_BATCH_SIZE: usize = 50;

/// Default batch timeout in milliseconds.
const DEFAULT_BATCH_TIMEOUT_MS: u64 = 1000;

/// Kafka consumer for vehicle events.
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    topics: Vec<String>,
    batch_size: usize,
    batch_timeout: Duration,
}

impl KafkaConsumer {
    /// Create a new Kafka consumer.
    ///
    /// # Arguments
    ///
    /// * `brokers` - Kafka broker addresses (comma-separated)
    /// * `group_id` - Consumer group ID
    /// * `topic` - Topic carrying vehicle events
    ///
    /// # Returns
    ///
    /// * `Ok(KafkaConsumer)` - A new consumer instance
    /// * `Err(IngestError)` - If consumer creation fails
    pub fn new(brokers: &str, group_id: &str, topic: &str) -> Result<Self, IngestError> {
        Self::with_batch_config(
            brokers,
            group_id,
            topic,
            DEFAULT_BATCH_SIZE,
            DEFAULT_BATCH_TIMEOUT_MS,
        )
    }

    /// Create a new Kafka consumer with custom batch configuration.
    ///
    /// # Arguments
    ///
    /// * `batch_size` - Number of messages to batch before sending
    /// * `batch_timeout_ms` - Maximum time to wait before sending a partial batch (milliseconds)
    pub fn with_batch_config(
        brokers: &str,
        group_id: &str,
        topic: &str,
        batch_size: usize,
        batch_timeout_ms: u64,
    ) -> Result<Self, IngestError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .create()
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        info!(
            brokers = %brokers,
            group_id = %group_id,
            topic = %topic,
            batch_size = batch_size,
            batch_timeout_ms = batch_timeout_ms,
            "Created Kafka consumer with batching"
        );

        Ok(Self {
            consumer,
            topics: vec![topic.to_string()],
            batch_size: batch_size.max(1),
            batch_timeout: Duration::from_millis(batch_timeout_ms.max(1)),
        })
    }

    /// Send the buffered events to the orchestrator.
    async fn send_batch(
        &self,
        events: &mut Vec<VehicleEvent>,
        offsets: &mut Vec<(String, i32, i64)>,
        sender: &mpsc::Sender<StreamMessage>,
    ) -> Result<(), IngestError> {
        if offsets.is_empty() {
            return Ok(());
        }

        info!(
            event_count = events.len(),
            offset_count = offsets.len(),
            "Sending batch of events to processor"
        );

        sender
            .send(StreamMessage::Events {
                events: std::mem::take(events),
                offsets: std::mem::take(offsets),
            })
            .await
            .map_err(|e| IngestError::channel(e.to_string()))
    }

    /// Commit offsets for a batch of messages.
    fn commit_offsets(&self, offsets: &[(String, i32, i64)]) -> Result<(), IngestError> {
        if offsets.is_empty() {
            return Ok(());
        }

        let mut tpl = TopicPartitionList::new();
        for (topic, partition, offset) in offsets {
            tpl.add_partition_offset(topic, *partition, Offset::Offset(offset + 1))
                .map_err(|e| IngestError::kafka(e.to_string()))?;
        }

        self.consumer
            .commit(&tpl, CommitMode::Async)
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        Ok(())
    }

    /// Decode a Kafka message into vehicle events.
    ///
    /// Returns `Ok(None)` for messages that carry no work.
    fn parse_message(&self, msg: &BorrowedMessage<'_>) -> Result<Option<Vec<VehicleEvent>>, IngestError> {
        let Some(payload) = msg.payload() else {
            debug!("Received message with empty payload");
            return Ok(None);
        };

        let events = VehicleEvent::decode_payload(payload)?;
        if events.is_empty() {
            return Ok(None);
        }
        Ok(Some(events))
    }
}

#[async_trait]
impl Consumer for KafkaConsumer {
    /// Subscribe to configured topics.
    fn subscribe(&self) -> Result<(), IngestError> {
        let topics: Vec<&str> = self.topics.iter().map(|s| s.as_str()).collect();

        self.consumer
            .subscribe(&topics)
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        info!(topics = ?self.topics, "Subscribed to Kafka topics");
        Ok(())
    }

    /// Start consuming messages and send them through the channel.
    ///
    /// Offsets are committed only after the orchestrator acknowledges a batch.
    /// Messages that carry no work or cannot be decoded are acknowledged with
    /// the batch they arrived in.
    #[instrument(skip(self, sender, ack_receiver, shutdown))]
    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        mut ack_receiver: mpsc::Receiver<StreamMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError> {
        use futures::StreamExt;

        let mut message_stream = self.consumer.stream();
        let mut events: Vec<VehicleEvent> = Vec::new();
        let mut pending_offsets: Vec<(String, i32, i64)> = Vec::with_capacity(self.batch_size);

        let mut batch_timer = tokio::time::interval(self.batch_timeout);
        batch_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // Skip the first tick immediately
        batch_timer.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Consumer received shutdown signal");
                    // Unsent messages were never committed and are re-read on restart.
                    // The orchestrator may have stopped reading, so never wait here.
                    let _ = sender.try_send(StreamMessage::End);
                    break;
                }

                ack_msg = ack_receiver.recv() => {
                    match ack_msg {
                        Some(StreamMessage::Acknowledgment { offsets, success, error }) => {
                            if success {
                                if let Err(e) = self.commit_offsets(&offsets) {
                                    error!(error = %e, "Failed to commit offsets after acknowledgment");
                                } else {
                                    debug!(offset_count = offsets.len(), "Committed offsets");
                                }
                            } else {
                                error!(
                                    offset_count = offsets.len(),
                                    error = error.as_deref().unwrap_or("Unknown error"),
                                    "Not committing offsets due to processing failure"
                                );
                            }
                        }
                        Some(StreamMessage::End) | None => {
                            info!("Acknowledgment channel closed");
                            break;
                        }
                        _ => {}
                    }
                }

                message = message_stream.next() => {
                    match message {
                        Some(Ok(msg)) => {
                            let position = (msg.topic().to_string(), msg.partition(), msg.offset());
                            debug!(
                                topic = %position.0,
                                partition = position.1,
                                offset = position.2,
                                "Received message from Kafka"
                            );

                            match self.parse_message(&msg) {
                                Ok(Some(decoded)) => events.extend(decoded),
                                Ok(None) => {
                                    debug!(offset = position.2, "Message carried no events");
                                }
                                Err(e) => {
                                    error!(
                                        topic = %position.0,
                                        partition = position.1,
                                        offset = position.2,
                                        error = %e,
                                        "Skipping undecodable message"
                                    );
                                }
                            }

                            // Offsets ride with the batch so a partition is never
                            // committed past an unacknowledged message.
                            pending_offsets.push(position);
                            if pending_offsets.len() >= self.batch_size {
                                self.send_batch(&mut events, &mut pending_offsets, &sender).await?;
                            }
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "Kafka error");
                            let _ = sender.send(StreamMessage::Error(e.to_string())).await;
                        }
                        None => {
                            info!("Kafka stream ended");
                            self.send_batch(&mut events, &mut pending_offsets, &sender).await?;
                            let _ = sender.send(StreamMessage::End).await;
                            break;
                        }
                    }
                }

                _ = batch_timer.tick() => {
                    if !pending_offsets.is_empty() {
                        debug!(count = pending_offsets.len(), "Sending batch due to timeout");
                        self.send_batch(&mut events, &mut pending_offsets, &sender).await?;
                    }
                }
            }
        }

        Ok(())
    }
}
