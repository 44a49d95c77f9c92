mod config;

use common::clickhouse::{ClickHouseClient, ClickHouseEventRepository};
use common::domain::{AggregateRepository, EventRepository};
use common::nats::NatsClient;
use common::postgres::{PostgresAggregateRepository, PostgresClient};
use common::telemetry::{TelemetryConfig, init_telemetry};
use config::ServiceConfig;
use ingest_worker::domain::RetryPolicy;
use ingest_worker::ingest_worker::{IngestWorker, IngestWorkerConfig};
use pulse_runner::Runner;
use query_api::query_api::{QueryApi, QueryApiConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    // Initialize configuration and tracing
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(&TelemetryConfig {
        log_level: config.log_level.clone(),
    }) {
        eprintln!("Failed to initialize telemetry: {}", e);
        std::process::exit(1);
    }

    info!("Starting pulse-all-in-one service");
    debug!("Configuration: {:?}", config);

    // Initialize shared dependencies
    let (event_repository, aggregate_repository, nats_client) =
        match initialize_shared_dependencies(&config).await {
            Ok(deps) => deps,
            Err(e) => {
                error!("Failed to initialize shared dependencies: {}", e);
                std::process::exit(1);
            }
        };

    // Shutdown token shared by the runner and the worker's retry loops
    let shutdown_token = tokio_util::sync::CancellationToken::new();

    let retry = RetryPolicy {
        max_attempts: config.retry_max_attempts,
        base_delay: Duration::from_millis(config.retry_base_delay_ms),
        max_delay: Duration::from_millis(config.retry_max_delay_ms),
    };

    let ingest_worker = match IngestWorker::new(
        event_repository.clone(),
        aggregate_repository.clone(),
        nats_client.clone(),
        retry,
        shutdown_token.clone(),
        IngestWorkerConfig {
            events_stream: config.events_stream.clone(),
            events_subject: config.events_subject.clone(),
            consumer_name: config.consumer_name.clone(),
            nats_batch_size: config.nats_batch_size,
            nats_batch_wait_secs: config.nats_batch_wait_secs,
        },
    )
    .await
    {
        Ok(worker) => worker,
        Err(e) => {
            error!("Failed to initialize ingest worker: {}", e);
            std::process::exit(1);
        }
    };

    let query_api = QueryApi::new(
        event_repository,
        aggregate_repository,
        QueryApiConfig {
            host: config.http_host.clone(),
            port: config.http_port,
        },
    );

    // Build runner with all processes
    let runner = Runner::new()
        .with_cancellation_token(shutdown_token.clone())
        .with_named_process("ingest_worker", ingest_worker.into_runner_process())
        .with_named_process("query_api", query_api.into_runner_process())
        .with_closer({
            let nats_for_close = Arc::clone(&nats_client);
            move || {
                Box::pin(async move {
                    info!("Running cleanup tasks...");
                    if let Ok(client) = Arc::try_unwrap(nats_for_close) {
                        client.close().await;
                    }
                    info!("Cleanup complete");
                    Ok(())
                })
            }
        })
        .with_closer_timeout(Duration::from_secs(10));

    // Run the service
    runner.run().await;
}

async fn initialize_shared_dependencies(
    config: &ServiceConfig,
) -> anyhow::Result<(
    Arc<dyn EventRepository>,
    Arc<dyn AggregateRepository>,
    Arc<NatsClient>,
)> {
    let store_timeout = Duration::from_secs(config.store_timeout_secs);

    // ClickHouse initialization (event store)
    info!("Initializing ClickHouse...");
    let clickhouse_client = ClickHouseClient::new(
        &config.clickhouse_url,
        &config.clickhouse_database,
        &config.clickhouse_username,
        &config.clickhouse_password,
    );
    clickhouse_client.ping().await?;

    let event_repository = ClickHouseEventRepository::new(
        clickhouse_client,
        config.events_table.clone(),
        store_timeout,
    );
    // Missing schema that cannot be created is fatal at startup
    event_repository.ensure_schema().await?;

    // PostgreSQL initialization (aggregate store)
    info!("Initializing PostgreSQL...");
    let postgres_client = PostgresClient::new(
        &config.postgres_host,
        config.postgres_port,
        &config.postgres_database,
        &config.postgres_username,
        &config.postgres_password,
        config.postgres_max_connections,
    )?;
    postgres_client.ping().await?;

    let aggregate_repository = PostgresAggregateRepository::new(postgres_client, store_timeout);
    aggregate_repository.ensure_schema().await?;

    // NATS initialization
    info!("Initializing NATS...");
    let nats_client = Arc::new(
        NatsClient::connect(
            &config.nats_url,
            Duration::from_secs(config.startup_timeout_secs),
        )
        .await?,
    );
    nats_client.ensure_stream(&config.events_stream).await?;

    Ok((
        Arc::new(event_repository),
        Arc::new(aggregate_repository),
        nats_client,
    ))
}
