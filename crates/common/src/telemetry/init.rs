use anyhow::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub struct TelemetryConfig {
    /// Log level used when RUST_LOG is not set (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Initialize the tracing subscriber with structured JSON output.
///
/// RUST_LOG takes precedence over the configured level. Call once at startup,
/// before any other component logs.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_span_list(true)
        .with_current_span(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
