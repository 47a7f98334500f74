//! Consumer module for the vehicle sync ingest.
//!
//! Provides Kafka consumer functionality for receiving vehicle change events.

mod kafka_consumer;
mod messages;

pub use kafka_consumer::{KafkaConsumer, DEFAULT_TOPIC};
pub use messages::{StreamMessage, VehicleEvent, VehicleEventType};
