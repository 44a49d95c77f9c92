use crate::domain::IngestService;
use common::nats::{ConsumeRequest, ConsumeResponse};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;
use tracing::warn;

/// Tower service that maps ingestion outcomes onto stream acknowledgement:
///
/// - success → ack (advance past the message)
/// - permanent input error → ack after a warning (malformed input cannot be
///   fixed by redelivery; dropping keeps the worker loop alive)
/// - anything else → nak (the stream position does not advance and the
///   message is redelivered)
#[derive(Clone)]
pub struct IngestProcessor {
    service: Arc<IngestService>,
}

impl IngestProcessor {
    pub fn new(service: Arc<IngestService>) -> Self {
        Self { service }
    }
}

impl Service<ConsumeRequest> for IngestProcessor {
    type Response = ConsumeResponse;
    type Error = anyhow::Error;
    type Future = BoxFuture<'static, Result<ConsumeResponse, anyhow::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ConsumeRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            match service.ingest(&req.payload).await {
                Ok(()) => Ok(ConsumeResponse::Ack),
                Err(e) if e.is_permanent_input() => {
                    warn!(
                        subject = %req.subject,
                        error = %e,
                        "dropping unprocessable message"
                    );
                    Ok(ConsumeResponse::Ack)
                }
                Err(e) => Ok(ConsumeResponse::nak(e.to_string())),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RetryPolicy;
    use bytes::Bytes;
    use common::domain::{
        DomainError, Event, MockAggregateRepository, MockEventRepository, NewEvent,
    };
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    const CLICK_PAYLOAD: &[u8] =
        br#"{"event_type":"click","timestamp":"2024-01-01T10:00:00Z","data":{}}"#;

    fn processor(
        events: MockEventRepository,
        aggregates: MockAggregateRepository,
    ) -> IngestProcessor {
        let service = IngestService::new(
            Arc::new(events),
            Arc::new(aggregates),
            RetryPolicy {
                max_attempts: 2,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
            },
            CancellationToken::new(),
        );
        IngestProcessor::new(Arc::new(service))
    }

    fn request(payload: &'static [u8]) -> ConsumeRequest {
        ConsumeRequest::new("app-events.web".to_string(), Bytes::from_static(payload), None)
    }

    #[tokio::test]
    async fn test_successful_ingest_acks() {
        let mut events = MockEventRepository::new();
        events.expect_put().times(1).returning(|e: &NewEvent| {
            Ok(Event {
                event_id: Uuid::now_v7(),
                event_type: e.event_type.clone(),
                timestamp: e.timestamp,
                data: e.data.clone(),
            })
        });

        let mut aggregates = MockAggregateRepository::new();
        aggregates
            .expect_increment()
            .times(1)
            .returning(|_, _| Ok(()));

        let mut processor = processor(events, aggregates);
        let response = processor.call(request(CLICK_PAYLOAD)).await.unwrap();
        assert!(response.is_ack());
    }

    #[tokio::test]
    async fn test_malformed_message_is_acked_and_dropped() {
        // No repository expectations: a store call would panic the test
        let events = MockEventRepository::new();
        let aggregates = MockAggregateRepository::new();

        let mut processor = processor(events, aggregates);
        let response = processor.call(request(b"{ not json")).await.unwrap();
        assert!(response.is_ack());
    }

    #[tokio::test]
    async fn test_store_failure_naks_for_redelivery() {
        let mut events = MockEventRepository::new();
        events
            .expect_put()
            .times(2)
            .returning(|_| Err(DomainError::StoreUnavailable(anyhow::anyhow!("down"))));

        let aggregates = MockAggregateRepository::new();

        let mut processor = processor(events, aggregates);
        let response = processor.call(request(CLICK_PAYLOAD)).await.unwrap();
        assert!(response.is_nak());
    }
}
