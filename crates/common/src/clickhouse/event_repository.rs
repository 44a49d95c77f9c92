use crate::clickhouse::ClickHouseClient;
use crate::domain::{DomainError, DomainResult, Event, EventRepository, NewEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clickhouse::Row;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// Database row for the `events` table. The payload is stored as a
/// JSON-encoded string; it is only interpreted at the domain boundary.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct EventRow {
    #[serde(with = "clickhouse::serde::uuid")]
    pub event_id: Uuid,
    pub event_type: String,
    #[serde(with = "clickhouse::serde::chrono::datetime64::millis")]
    pub timestamp: DateTime<Utc>,
    pub data: String,
}

impl EventRow {
    /// Build a row from a not-yet-persisted event, assigning the identifier.
    /// UUIDv7 gives uniqueness plus rough time ordering without a central
    /// sequencer; redelivered messages get fresh identifiers.
    fn from_new_event(event: &NewEvent) -> Self {
        let data_json = serde_json::to_string(&event.data).unwrap_or_else(|_| "{}".to_string());

        EventRow {
            event_id: Uuid::now_v7(),
            event_type: event.event_type.clone(),
            timestamp: event.timestamp,
            data: data_json,
        }
    }
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        // Tolerate unparseable payloads from older rows rather than failing
        // the whole scan
        let data = serde_json::from_str(&row.data).unwrap_or_default();

        Event {
            event_id: row.event_id,
            event_type: row.event_type,
            timestamp: row.timestamp,
            data,
        }
    }
}

/// ClickHouse implementation of EventRepository
#[derive(Clone)]
pub struct ClickHouseEventRepository {
    client: ClickHouseClient,
    table: String,
    timeout: Duration,
}

impl ClickHouseEventRepository {
    pub fn new(client: ClickHouseClient, table: String, timeout: Duration) -> Self {
        Self {
            client,
            table,
            timeout,
        }
    }

    /// Create the events table when absent. Called once at startup; a
    /// failure here is fatal for the process.
    pub async fn ensure_schema(&self) -> DomainResult<()> {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                event_id UUID,
                event_type String,
                timestamp DateTime64(3, 'UTC'),
                data String
            )
            ENGINE = MergeTree
            ORDER BY (event_type, timestamp, event_id)",
            self.table
        );

        let fut = self.client.get_client().query(&ddl).execute();
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(())) => {
                debug!(table = %self.table, "events table ready");
                Ok(())
            }
            Ok(Err(e)) => Err(DomainError::SchemaMissing(format!(
                "failed to create events table {}: {}",
                self.table, e
            ))),
            Err(_) => Err(DomainError::StoreTimeout(self.timeout)),
        }
    }
}

#[async_trait]
impl EventRepository for ClickHouseEventRepository {
    #[instrument(skip(self, event), fields(event_type = %event.event_type))]
    async fn put(&self, event: &NewEvent) -> DomainResult<Event> {
        let row = EventRow::from_new_event(event);

        debug!(
            event_id = %row.event_id,
            event_type = %row.event_type,
            table = %self.table,
            "storing event"
        );

        let stored = Event {
            event_id: row.event_id,
            event_type: row.event_type.clone(),
            timestamp: event.timestamp,
            data: event.data.clone(),
        };

        let insert_all = async move {
            let mut insert = self
                .client
                .get_client()
                .insert::<EventRow>(&self.table)
                .await?;
            insert.write(&row).await?;
            insert.end().await
        };

        match tokio::time::timeout(self.timeout, insert_all).await {
            Ok(Ok(())) => Ok(stored),
            Ok(Err(e)) => {
                error!(error = %e, "failed to store event");
                Err(map_clickhouse_error(e))
            }
            Err(_) => Err(DomainError::StoreTimeout(self.timeout)),
        }
    }

    #[instrument(skip(self))]
    async fn scan_by_type(&self, event_type: &str) -> DomainResult<Vec<Event>> {
        let query = format!(
            "SELECT ?fields FROM {} WHERE event_type = ?",
            self.table
        );

        let fut = self
            .client
            .get_client()
            .query(&query)
            .bind(event_type)
            .fetch_all::<EventRow>();

        let rows = match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(rows)) => rows,
            Ok(Err(e)) => {
                error!(error = %e, "failed to scan events");
                return Err(map_clickhouse_error(e));
            }
            Err(_) => return Err(DomainError::StoreTimeout(self.timeout)),
        };

        debug!(event_type = %event_type, row_count = rows.len(), "scanned events");

        Ok(rows.into_iter().map(Event::from).collect())
    }
}

/// A missing table means the schema bootstrap never ran; everything else
/// from the client is treated as a transient store failure.
fn map_clickhouse_error(e: clickhouse::error::Error) -> DomainError {
    let message = e.to_string();
    if message.contains("UNKNOWN_TABLE") || message.contains("Code: 60") {
        DomainError::SchemaMissing(message)
    } else {
        DomainError::StoreUnavailable(e.into())
    }
}
