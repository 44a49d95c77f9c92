use super::AppState;
use super::error::ApiError;
use axum::Json;
use axum::extract::{Query, State};
use chrono::{DateTime, NaiveDate, Utc};
use common::domain::{DailyAggregate, Event};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

const SERVICE_NAME: &str = "pulse-analytics";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// One aggregate row as served by both summary and daily endpoints
#[derive(Debug, Serialize)]
pub struct AggregateBody {
    pub event_type: String,
    pub count: i64,
    pub day: NaiveDate,
}

impl From<DailyAggregate> for AggregateBody {
    fn from(aggregate: DailyAggregate) -> Self {
        AggregateBody {
            event_type: aggregate.event_type,
            count: aggregate.count,
            day: aggregate.day,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: Vec<AggregateBody>,
    pub total_records: usize,
}

#[derive(Debug, Serialize)]
pub struct DailyStatsResponse {
    pub daily_stats: Vec<AggregateBody>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct EventBody {
    pub event_id: Uuid,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl From<Event> for EventBody {
    fn from(event: Event) -> Self {
        EventBody {
            event_id: event.event_id,
            event_type: event.event_type,
            timestamp: event.timestamp,
            data: event.data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<EventBody>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct EventsParams {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        timestamp: Utc::now(),
    })
}

/// GET /analytics/summary - all daily counters plus the row count
#[instrument(skip(state))]
pub async fn get_summary(State(state): State<AppState>) -> Result<Json<SummaryResponse>, ApiError> {
    let aggregates = state.aggregates.scan_all().await?;

    let summary: Vec<AggregateBody> = aggregates.into_iter().map(AggregateBody::from).collect();
    let total_records = summary.len();

    Ok(Json(SummaryResponse {
        summary,
        total_records,
    }))
}

/// GET /analytics/events?type=<t> - full scan of stored events of one type
#[instrument(skip(state))]
pub async fn get_events_by_type(
    State(state): State<AppState>,
    Query(params): Query<EventsParams>,
) -> Result<Json<EventsResponse>, ApiError> {
    let event_type = params
        .event_type
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("event type required"))?;

    let events = state.events.scan_by_type(&event_type).await?;

    let events: Vec<EventBody> = events.into_iter().map(EventBody::from).collect();
    let count = events.len();

    Ok(Json(EventsResponse { events, count }))
}

/// GET /analytics/daily - same projection as the summary, different envelope.
/// The two endpoints are a deliberate alias; divergent filtering would be a
/// future extension.
#[instrument(skip(state))]
pub async fn get_daily_stats(
    State(state): State<AppState>,
) -> Result<Json<DailyStatsResponse>, ApiError> {
    let aggregates = state.aggregates.scan_all().await?;

    let daily_stats: Vec<AggregateBody> = aggregates.into_iter().map(AggregateBody::from).collect();
    let count = daily_stats.len();

    Ok(Json(DailyStatsResponse { daily_stats, count }))
}
