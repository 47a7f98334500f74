//! Configuration and dependency wiring for the vehicle sync.

use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::consumer::{KafkaConsumer, DEFAULT_TOPIC};
use crate::loader::{LoaderConfig, SearchLoader, DEFAULT_VEHICLE_INDEX};
use crate::orchestrator::Orchestrator;
use crate::processor::VehicleProcessor;
use crate::SyncError;
use vehicle_sync_repository::config::{
    DEFAULT_DRAIN_TIMEOUT, DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_BYTES,
    DEFAULT_MAX_CONCURRENT_FLUSHES, DEFAULT_MAX_OPS,
};
use vehicle_sync_repository::{parse_endpoints, BulkProcessor, BulkProcessorConfig, OpenSearchProvider};

/// Default search engine endpoints.
const DEFAULT_ENGINE_ENDPOINTS: &str = "localhost:9200";

/// Default Kafka broker address.
const DEFAULT_KAFKA_BROKER: &str = "localhost:9092";

/// Default Kafka consumer group ID.
const DEFAULT_KAFKA_GROUP_ID: &str = "vehicle-sync";

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Connection mode for OpenSearch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry the connection until it succeeds.
    Retry,
}

impl ConnectionMode {
    /// Parse the connection mode.
    ///
    /// Valid values: "fail-fast" or "retry" (case-insensitive).
    /// Defaults to "retry" if not set or invalid.
    fn parse(value: Option<&str>) -> Self {
        match value.unwrap_or("retry").to_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            other => {
                warn!(value = %other, "Invalid OPENSEARCH_CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }
}

/// Settings for the whole sync process.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Comma-separated search engine endpoints, as given.
    pub engine_endpoints: String,
    pub connection_mode: ConnectionMode,
    pub retry_interval: Duration,
    pub bulk: BulkProcessorConfig,
    pub kafka_broker: String,
    pub kafka_group_id: String,
    pub kafka_topic: String,
    /// Collection vehicle documents are written to.
    pub vehicle_index: String,
    /// Whether update events create missing documents.
    pub update_upsert: bool,
}

impl SyncConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `ENGINE_ENDPOINTS`: Search engine endpoints, `host:port` comma-separated (default: localhost:9200)
    /// - `OPENSEARCH_CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
    /// - `OPENSEARCH_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
    /// - `BULK_MAX_OPS`: Buffered operations that trigger a flush, 0 disables (default: 1000)
    /// - `BULK_MAX_BYTES`: Buffered bytes that trigger a flush, 0 disables (default: 10 MiB)
    /// - `BULK_FLUSH_INTERVAL_SECS`: Periodic flush interval, 0 disables (default: 5)
    /// - `BULK_MAX_CONCURRENT_FLUSHES`: Flushes allowed in flight (default: 2)
    /// - `BULK_DRAIN_TIMEOUT_SECS`: How long shutdown waits for flushes (default: 300)
    /// - `KAFKA_BROKER`: Kafka broker address (default: localhost:9092)
    /// - `KAFKA_GROUP_ID`: Consumer group ID (default: vehicle-sync)
    /// - `KAFKA_TOPIC`: Topic with vehicle events (default: SYNC_DATABASE_ES)
    /// - `VEHICLE_INDEX`: Target collection (default: vehicles)
    /// - `VEHICLE_UPDATE_UPSERT`: Create missing documents on update (default: true)
    pub fn from_env() -> Result<Self, SyncError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SyncError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string_or = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let max_ops = parse_or::<usize>(&lookup, "BULK_MAX_OPS", DEFAULT_MAX_OPS)?;
        let max_bytes = parse_or::<usize>(&lookup, "BULK_MAX_BYTES", DEFAULT_MAX_BYTES)?;
        let flush_interval_secs = parse_or::<u64>(
            &lookup,
            "BULK_FLUSH_INTERVAL_SECS",
            DEFAULT_FLUSH_INTERVAL.as_secs(),
        )?;

        let bulk = BulkProcessorConfig::default()
            .with_max_ops(Some(max_ops).filter(|n| *n > 0))
            .with_max_bytes(Some(max_bytes).filter(|n| *n > 0))
            .with_flush_interval(
                Some(flush_interval_secs)
                    .filter(|n| *n > 0)
                    .map(Duration::from_secs),
            )
            .with_max_concurrent_flushes(parse_or(
                &lookup,
                "BULK_MAX_CONCURRENT_FLUSHES",
                DEFAULT_MAX_CONCURRENT_FLUSHES,
            )?)
            .with_drain_timeout(Duration::from_secs(parse_or(
                &lookup,
                "BULK_DRAIN_TIMEOUT_SECS",
                DEFAULT_DRAIN_TIMEOUT.as_secs(),
            )?));
        bulk.validate()
            .map_err(|e| SyncError::config(e.to_string()))?;

        Ok(Self {
            engine_endpoints: string_or("ENGINE_ENDPOINTS", DEFAULT_ENGINE_ENDPOINTS),
            connection_mode: ConnectionMode::parse(lookup("OPENSEARCH_CONNECTION_MODE").as_deref()),
            retry_interval: Duration::from_secs(parse_or(
                &lookup,
                "OPENSEARCH_RETRY_INTERVAL_SECS",
                DEFAULT_RETRY_INTERVAL_SECS,
            )?),
            bulk,
            kafka_broker: string_or("KAFKA_BROKER", DEFAULT_KAFKA_BROKER),
            kafka_group_id: string_or("KAFKA_GROUP_ID", DEFAULT_KAFKA_GROUP_ID),
            kafka_topic: string_or("KAFKA_TOPIC", DEFAULT_TOPIC),
            vehicle_index: string_or("VEHICLE_INDEX", DEFAULT_VEHICLE_INDEX),
            update_upsert: parse_bool_or(&lookup, "VEHICLE_UPDATE_UPSERT", true)?,
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, SyncError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key).map(|v| v.trim().to_string()) {
        Some(value) if !value.is_empty() => value
            .parse::<T>()
            .map_err(|e| SyncError::config(format!("Invalid {} '{}': {}", key, value, e))),
        _ => Ok(default),
    }
}

fn parse_bool_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: bool,
) -> Result<bool, SyncError> {
    match lookup(key).map(|v| v.trim().to_lowercase()) {
        None => Ok(default),
        Some(value) => match value.as_str() {
            "" => Ok(default),
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(SyncError::config(format!("Invalid {} '{}'", key, value))),
        },
    }
}

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(SyncError)` - If the configuration is invalid or a connection fails in fail-fast mode
    pub async fn new() -> Result<Self, SyncError> {
        let config = SyncConfig::from_env()?;
        Self::from_config(config).await
    }

    /// Initialize all dependencies from an explicit configuration.
    pub async fn from_config(config: SyncConfig) -> Result<Self, SyncError> {
        info!(
            engine_endpoints = %config.engine_endpoints,
            kafka_broker = %config.kafka_broker,
            kafka_group_id = %config.kafka_group_id,
            kafka_topic = %config.kafka_topic,
            vehicle_index = %config.vehicle_index,
            connection_mode = ?config.connection_mode,
            retry_interval_secs = config.retry_interval.as_secs(),
            "Initializing dependencies"
        );

        let search_provider = Self::connect_to_opensearch(
            &config.engine_endpoints,
            config.connection_mode,
            config.retry_interval,
        )
        .await?;

        info!("OpenSearch connection established");

        let bulk_processor = BulkProcessor::new(Arc::new(search_provider), config.bulk.clone())
            .map_err(|e| SyncError::config(format!("Failed to start bulk processor: {}", e)))?;

        let consumer = KafkaConsumer::new(
            &config.kafka_broker,
            &config.kafka_group_id,
            &config.kafka_topic,
        )
        .map_err(|e| SyncError::config(format!("Failed to create Kafka consumer: {}", e)))?;

        info!("Kafka consumer created");

        let processor = VehicleProcessor::with_update_upsert(config.update_upsert);
        let loader = SearchLoader::with_config(
            bulk_processor,
            LoaderConfig {
                collection: config.vehicle_index.clone(),
                drain_timeout: config.bulk.drain_timeout,
            },
        );

        let orchestrator = Orchestrator::new(Arc::new(consumer), processor, loader);

        Ok(Self { orchestrator })
    }

    /// Connect to OpenSearch with retry logic based on connection mode.
    async fn connect_to_opensearch(
        endpoints: &str,
        mode: ConnectionMode,
        retry_interval: Duration,
    ) -> Result<OpenSearchProvider, SyncError> {
        let urls = parse_endpoints(endpoints).map_err(|e| SyncError::config(e.to_string()))?;

        loop {
            match Self::try_connect_opensearch(&urls).await {
                Ok(provider) => return Ok(provider),
                Err(e) => match mode {
                    ConnectionMode::FailFast => {
                        return Err(SyncError::config(format!(
                            "Failed to connect to OpenSearch: {}",
                            e
                        )));
                    }
                    ConnectionMode::Retry => {
                        warn!(
                            engine_endpoints = %endpoints,
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to connect to OpenSearch, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                },
            }
        }
    }

    /// Attempt to connect to OpenSearch.
    async fn try_connect_opensearch(
        urls: &[url::Url],
    ) -> Result<OpenSearchProvider, vehicle_sync_repository::SearchIndexError> {
        let provider = OpenSearchProvider::new(urls)?;
        provider.ping().await?;
        Ok(provider)
    }
}
