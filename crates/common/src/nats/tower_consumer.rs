use crate::nats::{ConsumeRequest, ConsumeResponse, JetStreamConsumer, PullConsumer};
use anyhow::{Context, Result};
use async_nats::jetstream::{self};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tower::Service;

/// A NATS pull consumer that feeds messages one at a time through a Tower
/// service stack and acks or naks each based on the service response.
///
/// A nak leaves the stream position where it was, so the message is
/// redelivered later; an ack advances past it.
pub struct TowerConsumer<S> {
    consumer: Box<dyn PullConsumer>,
    stream_name: String,
    consumer_name: String,
    batch_size: usize,
    max_wait: Duration,
    service: S,
}

impl<S> TowerConsumer<S>
where
    S: Service<ConsumeRequest, Response = ConsumeResponse, Error = anyhow::Error>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    /// Create a new Tower-based consumer on a durable, explicit-ack pull
    /// consumer.
    pub async fn new(
        jetstream: Arc<dyn JetStreamConsumer>,
        stream_name: &str,
        consumer_name: &str,
        subject_filter: &str,
        batch_size: usize,
        max_wait_secs: u64,
        service: S,
    ) -> Result<Self> {
        debug!(
            stream = %stream_name,
            consumer = %consumer_name,
            filter_subject = %subject_filter,
            "creating tower nats consumer"
        );

        let config = jetstream::consumer::pull::Config {
            name: Some(consumer_name.to_string()),
            durable_name: Some(consumer_name.to_string()),
            filter_subject: subject_filter.to_string(),
            ack_policy: jetstream::consumer::AckPolicy::Explicit,
            ..Default::default()
        };

        let consumer = jetstream
            .create_consumer(config, stream_name)
            .await
            .context("failed to create consumer")?;

        debug!(
            stream = %stream_name,
            consumer = %consumer_name,
            "tower nats consumer created successfully"
        );

        Ok(Self {
            consumer,
            stream_name: stream_name.to_string(),
            consumer_name: consumer_name.to_string(),
            batch_size,
            max_wait: Duration::from_secs(max_wait_secs),
            service,
        })
    }

    /// Run the consumer loop until cancellation.
    ///
    /// Cancellation is only observed while waiting for the next batch; a
    /// batch that is already being processed is drained to completion so an
    /// in-flight message is never abandoned between its persistence steps.
    pub async fn run(mut self, ctx: CancellationToken) -> Result<()> {
        debug!(
            stream = %self.stream_name,
            consumer = %self.consumer_name,
            "starting tower nats consumer"
        );

        loop {
            let fetched = tokio::select! {
                _ = ctx.cancelled() => {
                    info!(
                        stream = %self.stream_name,
                        consumer = %self.consumer_name,
                        "received shutdown signal, stopping consumer"
                    );
                    break;
                }
                result = self.consumer.fetch_messages(self.batch_size, self.max_wait) => result,
            };

            match fetched {
                Ok(messages) => {
                    if messages.is_empty() {
                        debug!("no messages in batch");
                        continue;
                    }
                    debug!(message_count = messages.len(), "received message batch");
                    self.process_batch(messages).await;
                }
                Err(e) => {
                    error!(
                        stream = %self.stream_name,
                        consumer = %self.consumer_name,
                        error = %e,
                        "error fetching batch"
                    );
                    // Continue consuming despite errors
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }

        debug!(
            stream = %self.stream_name,
            consumer = %self.consumer_name,
            "consumer stopped gracefully"
        );
        Ok(())
    }

    /// Process each message individually through the Tower service and
    /// ack/nak it based on the response.
    async fn process_batch(&mut self, messages: Vec<jetstream::Message>) {
        for msg in &messages {
            let request = ConsumeRequest::new(
                msg.subject.to_string(),
                Bytes::copy_from_slice(&msg.payload),
                msg.headers.clone(),
            );

            let response = match self.service.call(request).await {
                Ok(resp) => resp,
                Err(e) => {
                    error!(
                        subject = %msg.subject,
                        error = %e,
                        "service error processing message"
                    );
                    ConsumeResponse::nak(e.to_string())
                }
            };

            match response {
                ConsumeResponse::Ack => {
                    if let Err(e) = msg.ack().await {
                        error!(
                            subject = %msg.subject,
                            error = %e,
                            "failed to acknowledge message"
                        );
                    }
                }
                ConsumeResponse::Nak(reason) => {
                    if let Some(ref r) = reason {
                        warn!(
                            subject = %msg.subject,
                            reason = %r,
                            "rejecting message for redelivery"
                        );
                    } else {
                        warn!(
                            subject = %msg.subject,
                            "rejecting message for redelivery"
                        );
                    }

                    if let Err(e) = msg.ack_with(jetstream::AckKind::Nak(None)).await {
                        error!(
                            subject = %msg.subject,
                            error = %e,
                            "failed to reject message"
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nats::traits::{MockJetStreamConsumer, MockPullConsumer};
    use futures::future::BoxFuture;
    use std::task::{Context, Poll};

    /// Simple test service that acks everything
    #[derive(Clone)]
    struct AckAllService;

    impl Service<ConsumeRequest> for AckAllService {
        type Response = ConsumeResponse;
        type Error = anyhow::Error;
        type Future = BoxFuture<'static, Result<ConsumeResponse, anyhow::Error>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: ConsumeRequest) -> Self::Future {
            Box::pin(async move { Ok(ConsumeResponse::Ack) })
        }
    }

    #[tokio::test]
    async fn test_tower_consumer_creation_success() {
        let mut mock_jetstream = MockJetStreamConsumer::new();

        mock_jetstream
            .expect_create_consumer()
            .withf(
                |config: &jetstream::consumer::pull::Config, stream_name: &str| {
                    config.durable_name.as_ref().unwrap() == "pulse-ingest"
                        && config.filter_subject == "app-events.>"
                        && stream_name == "app-events"
                },
            )
            .times(1)
            .returning(|_, _| Ok(Box::new(MockPullConsumer::new())));

        let result = TowerConsumer::new(
            Arc::new(mock_jetstream),
            "app-events",
            "pulse-ingest",
            "app-events.>",
            10,
            5,
            AckAllService,
        )
        .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_tower_consumer_creation_failure() {
        let mut mock_jetstream = MockJetStreamConsumer::new();

        mock_jetstream
            .expect_create_consumer()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("Failed to create consumer")));

        let result = TowerConsumer::new(
            Arc::new(mock_jetstream),
            "app-events",
            "pulse-ingest",
            "app-events.>",
            10,
            5,
            AckAllService,
        )
        .await;

        assert!(result.is_err());
        let err = result.err().unwrap();
        assert!(err.to_string().contains("failed to create consumer"));
    }

    #[tokio::test]
    async fn test_run_stops_on_cancellation() {
        let mut mock_jetstream = MockJetStreamConsumer::new();

        mock_jetstream.expect_create_consumer().returning(|_, _| {
            let mut mock = MockPullConsumer::new();
            mock.expect_fetch_messages().returning(|_, _| Ok(vec![]));
            Ok(Box::new(mock))
        });

        let consumer = TowerConsumer::new(
            Arc::new(mock_jetstream),
            "app-events",
            "pulse-ingest",
            "app-events.>",
            10,
            5,
            AckAllService,
        )
        .await
        .unwrap();

        let ctx = CancellationToken::new();
        ctx.cancel();

        let result = consumer.run(ctx).await;
        assert!(result.is_ok());
    }
}
