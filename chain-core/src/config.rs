//! Configuration for the chain pipeline

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// How long the simulator runs before stopping (seconds)
    pub run_duration_secs: u64,

    /// Batching configuration
    pub batching: BatchingConfig,

    /// Producer configuration
    pub producer: ProducerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "chain-core".to_string(),
            run_duration_secs: 20,
            batching: BatchingConfig::default(),
            producer: ProducerConfig::default(),
        }
    }
}

/// Batching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchingConfig {
    /// Transactions per block (size trigger)
    pub max_batch_size: usize,

    /// Idle time before a partial batch is committed (milliseconds)
    pub batch_timeout_ms: u64,

    /// Intake queue capacity (independent of batch size)
    pub queue_capacity: usize,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 10,
            batch_timeout_ms: 5_000,
            queue_capacity: 100,
        }
    }
}

impl BatchingConfig {
    /// Batch timeout as a duration
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }

    /// Reject non-positive sizes and timeouts
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_batch_size == 0 {
            return Err(crate::Error::Config(
                "max_batch_size must be positive".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(crate::Error::Config(
                "queue_capacity must be positive".to_string(),
            ));
        }
        if self.batch_timeout_ms == 0 {
            return Err(crate::Error::Config(
                "batch_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Random transaction producer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// Number of concurrent sources
    pub sources: usize,

    /// Delay between transactions of one source (milliseconds)
    pub interval_ms: u64,

    /// Account labels to draw senders and receivers from
    pub users: Vec<String>,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            sources: 1,
            interval_ms: 500,
            users: ["Alice", "Bob", "Charlie", "Diana", "Eve", "Frank", "Grace", "Henry"]
                .iter()
                .map(|u| u.to_string())
                .collect(),
        }
    }
}

impl ProducerConfig {
    /// Delay between transactions as a duration
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Sources need two distinct users and a positive interval
    pub fn validate(&self) -> crate::Result<()> {
        if self.users.len() < 2 {
            return Err(crate::Error::Config(
                "producer needs at least two users".to_string(),
            ));
        }
        if self.interval_ms == 0 {
            return Err(crate::Error::Config(
                "producer interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Some(size) = env_parse("CHAIN_BATCH_SIZE")? {
            config.batching.max_batch_size = size;
        }

        if let Some(timeout) = env_parse("CHAIN_BATCH_TIMEOUT_MS")? {
            config.batching.batch_timeout_ms = timeout;
        }

        if let Some(capacity) = env_parse("CHAIN_QUEUE_CAPACITY")? {
            config.batching.queue_capacity = capacity;
        }

        if let Some(sources) = env_parse("CHAIN_SOURCES")? {
            config.producer.sources = sources;
        }

        if let Some(interval) = env_parse("CHAIN_PRODUCER_INTERVAL_MS")? {
            config.producer.interval_ms = interval;
        }

        if let Some(secs) = env_parse("CHAIN_RUN_SECS")? {
            config.run_duration_secs = secs;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> crate::Result<()> {
        self.batching.validate()?;
        self.producer.validate()
    }

    /// Simulator run duration
    pub fn run_duration(&self) -> Duration {
        Duration::from_secs(self.run_duration_secs)
    }
}

fn env_parse<T: FromStr>(key: &str) -> crate::Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| crate::Error::Config(format!("{} has invalid value {:?}", key, raw))),
        Err(_) => Ok(None),
    }
}
