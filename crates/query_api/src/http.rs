mod error;
mod handlers;

pub use error::*;
pub use handlers::*;

use axum::{Router, routing::get};
use common::domain::{AggregateRepository, EventRepository};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared read-only handles for the query handlers. Handlers never write and
/// never retry; they surface store failures directly.
#[derive(Clone)]
pub struct AppState {
    pub events: Arc<dyn EventRepository>,
    pub aggregates: Arc<dyn AggregateRepository>,
}

impl AppState {
    pub fn new(events: Arc<dyn EventRepository>, aggregates: Arc<dyn AggregateRepository>) -> Self {
        Self { events, aggregates }
    }
}

/// Create the axum router with all query endpoints
pub fn create_router(state: AppState) -> Router {
    // Permissive CORS: the API is read-only and consumed by browser dashboards
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/analytics/summary", get(handlers::get_summary))
        .route("/analytics/events", get(handlers::get_events_by_type))
        .route("/analytics/daily", get(handlers::get_daily_stats))
        .layer(cors)
        .with_state(state)
}
