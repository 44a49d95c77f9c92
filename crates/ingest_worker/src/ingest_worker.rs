use crate::domain::{IngestService, RetryPolicy};
use crate::nats::IngestProcessor;
use common::domain::{AggregateRepository, EventRepository};
use common::nats::{ConsumeLoggingLayer, ConsumeLoggingService, NatsClient, TowerConsumer};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tracing::info;

pub struct IngestWorkerConfig {
    pub events_stream: String,
    pub events_subject: String,
    pub consumer_name: String,
    pub nats_batch_size: usize,
    pub nats_batch_wait_secs: u64,
}

type IngestStack = ConsumeLoggingService<IngestProcessor>;

/// The ingestion pipeline assembly: a durable pull consumer draining the
/// event stream through the ingest service.
pub struct IngestWorker {
    consumer: TowerConsumer<IngestStack>,
}

impl IngestWorker {
    pub async fn new(
        event_repository: Arc<dyn EventRepository>,
        aggregate_repository: Arc<dyn AggregateRepository>,
        nats_client: Arc<NatsClient>,
        retry: RetryPolicy,
        shutdown: CancellationToken,
        config: IngestWorkerConfig,
    ) -> anyhow::Result<Self> {
        info!("Initializing ingest worker");

        let service = Arc::new(IngestService::new(
            event_repository,
            aggregate_repository,
            retry,
            shutdown,
        ));

        let stack = ServiceBuilder::new()
            .layer(ConsumeLoggingLayer::new())
            .service(IngestProcessor::new(service));

        let consumer_client = nats_client.create_consumer_client();
        let consumer = TowerConsumer::new(
            consumer_client,
            &config.events_stream,
            &config.consumer_name,
            &config.events_subject,
            config.nats_batch_size,
            config.nats_batch_wait_secs,
            stack,
        )
        .await?;

        info!("Ingest worker initialized");

        Ok(Self { consumer })
    }

    pub fn into_runner_process(
        self,
    ) -> impl FnOnce(
        CancellationToken,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>> {
        move |ctx| Box::pin(async move { self.consumer.run(ctx).await })
    }
}
