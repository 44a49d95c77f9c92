use crate::domain::result::DomainResult;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Domain entity for a per-(event type, day) counter. Created implicitly on
/// first increment, mutated only by atomic increment, never decremented or
/// deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyAggregate {
    pub event_type: String,
    pub day: NaiveDate,
    pub count: i64,
}

/// Repository trait for the daily counter storage.
/// Infrastructure layer (Postgres) implements this trait.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AggregateRepository: Send + Sync {
    /// Server-side atomic add of 1 to the `(event_type, day)` counter.
    /// Never a client-side read-modify-write; must stay correct under
    /// concurrent consumers.
    async fn increment(&self, event_type: &str, day: NaiveDate) -> DomainResult<()>;

    /// Snapshot of all counters. No ordering across keys; each row is
    /// independently consistent but the set as a whole is not.
    async fn scan_all(&self) -> DomainResult<Vec<DailyAggregate>>;
}
