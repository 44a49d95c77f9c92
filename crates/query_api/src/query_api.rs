use crate::http::{AppState, create_router};
use common::domain::{AggregateRepository, EventRepository};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct QueryApiConfig {
    pub host: String,
    pub port: u16,
}

/// The read-only HTTP surface over the two stores.
pub struct QueryApi {
    state: AppState,
    config: QueryApiConfig,
}

impl QueryApi {
    pub fn new(
        events: Arc<dyn EventRepository>,
        aggregates: Arc<dyn AggregateRepository>,
        config: QueryApiConfig,
    ) -> Self {
        debug!("Initializing query API module");
        Self {
            state: AppState::new(events, aggregates),
            config,
        }
    }

    pub fn into_runner_process(
        self,
    ) -> impl FnOnce(
        CancellationToken,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>> {
        move |ctx| Box::pin(async move { run_query_api_server(self.config, self.state, ctx).await })
    }
}

/// Serve the query API until the cancellation token fires, then stop
/// accepting connections and let in-flight requests finish.
async fn run_query_api_server(
    config: QueryApiConfig,
    state: AppState,
    ctx: CancellationToken,
) -> anyhow::Result<()> {
    let router = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(addr = %addr, "query API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(ctx.cancelled_owned())
        .await?;

    info!("query API stopped gracefully");
    Ok(())
}
