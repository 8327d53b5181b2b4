use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub kafka: KafkaConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// TTL of a seat hold; expiry is the only cancellation mechanism.
    #[serde(default = "default_hold_seconds")]
    pub seat_hold_seconds: u64,
    /// Pause between worker poll cycles.
    #[serde(default = "default_poll_ms")]
    pub worker_poll_ms: u64,
    /// Max messages drained per worker cycle.
    #[serde(default = "default_batch_size")]
    pub worker_batch_size: usize,
    /// Long-poll bound for a single queue receive.
    #[serde(default = "default_queue_wait_ms")]
    pub queue_wait_ms: u64,
}

fn default_hold_seconds() -> u64 {
    120
}

fn default_poll_ms() -> u64 {
    1000
}

fn default_batch_size() -> usize {
    5
}

fn default_queue_wait_ms() -> u64 {
    5000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    #[serde(default = "default_group_id")]
    pub group_id: String,
}

fn default_group_id() -> String {
    "venue-confirmation-worker".to_string()
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("VENUE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
