use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

/// Service configuration, resolved from `PULSE_`-prefixed environment
/// variables with documented defaults for local development.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // NATS configuration
    /// NATS server URL
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// NATS JetStream stream name for application events
    #[serde(default = "default_events_stream")]
    pub events_stream: String,

    /// NATS subject pattern for the ingest consumer filter
    #[serde(default = "default_events_subject")]
    pub events_subject: String,

    /// Durable consumer name for the ingest worker
    #[serde(default = "default_consumer_name")]
    pub consumer_name: String,

    /// Batch size for the pull consumer
    #[serde(default = "default_nats_batch_size")]
    pub nats_batch_size: usize,

    /// Max wait time for batches in seconds
    #[serde(default = "default_nats_batch_wait_secs")]
    pub nats_batch_wait_secs: u64,

    /// Startup timeout for initialization operations in seconds
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    // ClickHouse configuration (event store)
    /// ClickHouse HTTP URL
    #[serde(default = "default_clickhouse_url")]
    pub clickhouse_url: String,

    /// ClickHouse database name
    #[serde(default = "default_clickhouse_database")]
    pub clickhouse_database: String,

    /// ClickHouse username
    #[serde(default = "default_clickhouse_username")]
    pub clickhouse_username: String,

    /// ClickHouse password
    #[serde(default = "default_clickhouse_password")]
    pub clickhouse_password: String,

    /// Events table name
    #[serde(default = "default_events_table")]
    pub events_table: String,

    // PostgreSQL configuration (aggregate store)
    /// PostgreSQL host
    #[serde(default = "default_postgres_host")]
    pub postgres_host: String,

    /// PostgreSQL port
    #[serde(default = "default_postgres_port")]
    pub postgres_port: u16,

    /// PostgreSQL database name
    #[serde(default = "default_postgres_database")]
    pub postgres_database: String,

    /// PostgreSQL username
    #[serde(default = "default_postgres_username")]
    pub postgres_username: String,

    /// PostgreSQL password
    #[serde(default = "default_postgres_password")]
    pub postgres_password: String,

    /// Maximum PostgreSQL pool size
    #[serde(default = "default_postgres_max_connections")]
    pub postgres_max_connections: usize,

    // HTTP configuration
    /// Query API listen host
    #[serde(default = "default_http_host")]
    pub http_host: String,

    /// Query API listen port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    // Store call and retry configuration
    /// Bounded timeout for each store call, in seconds
    #[serde(default = "default_store_timeout_secs")]
    pub store_timeout_secs: u64,

    /// Attempts per persistence step before the message is left for redelivery
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    /// Initial retry backoff in milliseconds (doubles per attempt)
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Backoff cap in milliseconds
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

// NATS defaults
fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_events_stream() -> String {
    "app-events".to_string()
}

fn default_events_subject() -> String {
    "app-events.>".to_string()
}

fn default_consumer_name() -> String {
    "pulse-ingest".to_string()
}

fn default_nats_batch_size() -> usize {
    30
}

fn default_nats_batch_wait_secs() -> u64 {
    5
}

fn default_startup_timeout_secs() -> u64 {
    30
}

// ClickHouse defaults
fn default_clickhouse_url() -> String {
    "http://localhost:8123".to_string()
}

fn default_clickhouse_database() -> String {
    "pulse".to_string()
}

fn default_clickhouse_username() -> String {
    "pulse".to_string()
}

fn default_clickhouse_password() -> String {
    "pulse".to_string()
}

fn default_events_table() -> String {
    "events".to_string()
}

// PostgreSQL defaults
fn default_postgres_host() -> String {
    "localhost".to_string()
}

fn default_postgres_port() -> u16 {
    5432
}

fn default_postgres_database() -> String {
    "pulse".to_string()
}

fn default_postgres_username() -> String {
    "pulse".to_string()
}

fn default_postgres_password() -> String {
    "pulse".to_string()
}

fn default_postgres_max_connections() -> usize {
    5
}

// HTTP defaults
fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

// Store call and retry defaults
fn default_store_timeout_secs() -> u64 {
    10
}

fn default_retry_max_attempts() -> u32 {
    5
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_retry_max_delay_ms() -> u64 {
    10_000
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("PULSE"))
            .build()?
            .try_deserialize()
    }
}
