use crate::domain::RetryPolicy;
use common::domain::{AggregateRepository, DomainResult, EventRepository, NewEvent, StreamEvent};
use common::validation::validate_struct;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Domain service that applies one stream message to both stores.
///
/// Flow, per message:
/// 1. Decode the JSON payload and validate it
/// 2. Persist the event (step-level retry; the identifier is assigned by the
///    repository, so a redelivered message stores a fresh row)
/// 3. Truncate the event timestamp to its UTC calendar day
/// 4. Increment the (event_type, day) counter (step-level retry; the event
///    is already durable, so only the increment is repeated and the event is
///    never re-stored within one delivery)
///
/// A message whose increment never succeeds is left unacknowledged; its
/// redelivery re-runs the whole flow and over-counts by one. That is the
/// accepted at-least-once tradeoff and is deliberately not masked by any
/// deduplication.
pub struct IngestService {
    event_repository: Arc<dyn EventRepository>,
    aggregate_repository: Arc<dyn AggregateRepository>,
    retry: RetryPolicy,
    shutdown: CancellationToken,
}

impl IngestService {
    pub fn new(
        event_repository: Arc<dyn EventRepository>,
        aggregate_repository: Arc<dyn AggregateRepository>,
        retry: RetryPolicy,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            event_repository,
            aggregate_repository,
            retry,
            shutdown,
        }
    }

    #[instrument(skip(self, payload), fields(payload_bytes = payload.len()))]
    pub async fn ingest(&self, payload: &[u8]) -> DomainResult<()> {
        let stream_event = StreamEvent::decode(payload)?;
        validate_struct(&stream_event)?;

        let new_event = NewEvent::from(stream_event);

        let stored = self
            .retry
            .run(&self.shutdown, || self.event_repository.put(&new_event))
            .await?;

        let day = stored.day();

        self.retry
            .run(&self.shutdown, || {
                self.aggregate_repository.increment(&stored.event_type, day)
            })
            .await?;

        debug!(
            event_id = %stored.event_id,
            event_type = %stored.event_type,
            day = %day,
            "event ingested"
        );

        Ok(())
    }
}
