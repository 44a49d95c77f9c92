use crate::domain::{AggregateRepository, DailyAggregate, DomainError, DomainResult};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;
use tracing::{debug, error, instrument};

/// PostgreSQL implementation of AggregateRepository.
///
/// The increment is a single upsert statement, so the add happens on the
/// server under row-level locking and stays correct when several consumer
/// instances hit the same `(event_type, day)` key at once.
#[derive(Clone)]
pub struct PostgresAggregateRepository {
    client: PostgresClient,
    timeout: Duration,
}

impl PostgresAggregateRepository {
    pub fn new(client: PostgresClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Create the daily_stats table when absent. Called once at startup; a
    /// failure here is fatal for the process.
    pub async fn ensure_schema(&self) -> DomainResult<()> {
        let ddl = "CREATE TABLE IF NOT EXISTS daily_stats (
                event_type TEXT NOT NULL,
                day DATE NOT NULL,
                count BIGINT NOT NULL DEFAULT 0,
                PRIMARY KEY (event_type, day)
            )";

        let create = async {
            let conn = self.client.get_connection().await?;
            conn.execute(ddl, &[]).await?;
            Ok::<_, anyhow::Error>(())
        };

        match tokio::time::timeout(self.timeout, create).await {
            Ok(Ok(())) => {
                debug!("daily_stats table ready");
                Ok(())
            }
            Ok(Err(e)) => Err(DomainError::SchemaMissing(format!(
                "failed to create daily_stats table: {}",
                e
            ))),
            Err(_) => Err(DomainError::StoreTimeout(self.timeout)),
        }
    }
}

#[async_trait]
impl AggregateRepository for PostgresAggregateRepository {
    #[instrument(skip(self), fields(event_type = %event_type, day = %day))]
    async fn increment(&self, event_type: &str, day: NaiveDate) -> DomainResult<()> {
        let upsert = async {
            let conn = self
                .client
                .get_connection()
                .await
                .map_err(DomainError::StoreUnavailable)?;

            conn.execute(
                "INSERT INTO daily_stats (event_type, day, count)
                 VALUES ($1, $2, 1)
                 ON CONFLICT (event_type, day)
                 DO UPDATE SET count = daily_stats.count + 1",
                &[&event_type, &day],
            )
            .await
            .map_err(map_postgres_error)?;

            Ok(())
        };

        match tokio::time::timeout(self.timeout, upsert).await {
            Ok(result) => {
                if result.is_ok() {
                    debug!(event_type = %event_type, day = %day, "incremented daily counter");
                }
                result
            }
            Err(_) => Err(DomainError::StoreTimeout(self.timeout)),
        }
    }

    #[instrument(skip(self))]
    async fn scan_all(&self) -> DomainResult<Vec<DailyAggregate>> {
        let scan = async {
            let conn = self
                .client
                .get_connection()
                .await
                .map_err(DomainError::StoreUnavailable)?;

            let rows = conn
                .query("SELECT event_type, day, count FROM daily_stats", &[])
                .await
                .map_err(map_postgres_error)?;

            let aggregates = rows
                .iter()
                .map(|row| DailyAggregate {
                    event_type: row.get("event_type"),
                    day: row.get("day"),
                    count: row.get("count"),
                })
                .collect::<Vec<_>>();

            Ok(aggregates)
        };

        match tokio::time::timeout(self.timeout, scan).await {
            Ok(Ok(aggregates)) => {
                debug!(row_count = aggregates.len(), "scanned daily counters");
                Ok(aggregates)
            }
            Ok(Err(e)) => {
                error!(error = %e, "failed to scan daily counters");
                Err(e)
            }
            Err(_) => Err(DomainError::StoreTimeout(self.timeout)),
        }
    }
}

/// PostgreSQL error code 42P01 is undefined_table; everything else from the
/// driver is treated as a transient store failure.
fn map_postgres_error(e: tokio_postgres::Error) -> DomainError {
    if let Some(db_err) = e.as_db_error() {
        if db_err.code().code() == "42P01" {
            return DomainError::SchemaMissing(db_err.message().to_string());
        }
    }
    DomainError::StoreUnavailable(e.into())
}
