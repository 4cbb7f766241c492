//! HTTP Server
//!
//! Axum-based server exposing the exporter endpoints.
//!
//! # Endpoints
//!
//! - `GET /` - HTML landing page with links to metrics and health
//! - `GET /metrics` - Prometheus metrics in text format
//! - `GET /health` - Liveness check of the exporter process
//!
//! # Metrics Collection
//!
//! Collection is pull-driven: every request to `/metrics` runs one batch
//! through the [`CollectionOrchestrator`], translates the snapshots and renders
//! them. Unreachable or misbehaving devices only reduce the number of series in
//! the response.

use crate::collection::CollectionOrchestrator;
use crate::config::Config;
use crate::metrics;
use crate::translate::{translate, GaugeRecord};
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Clone)]
struct AppState {
    orchestrator: Arc<CollectionOrchestrator>,
}

pub fn router(orchestrator: Arc<CollectionOrchestrator>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(AppState { orchestrator })
}

pub async fn start(config: Config, orchestrator: CollectionOrchestrator) -> anyhow::Result<()> {
    let app = router(Arc::new(orchestrator));

    // Start the server
    let addr = format!("{}:{}", config.server.addr, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Metrics server listening on {}", addr);
    info!("Metrics available at http://{}/metrics", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Run one batch and flatten every snapshot into gauge records
pub async fn scrape(orchestrator: &CollectionOrchestrator) -> Vec<GaugeRecord> {
    let batch = orchestrator.collect().await;
    let records: Vec<GaugeRecord> = batch.iter().flatten().flat_map(translate).collect();
    debug!(
        "Scrape produced {} series from {} batch entries",
        records.len(),
        batch.len()
    );
    records
}

async fn root_handler() -> impl IntoResponse {
    axum::response::Html(
        r#"<html>
<head><title>Eaton UPS Exporter</title></head>
<body>
<h1>Eaton UPS Prometheus Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
<p><a href="/health">Health</a></p>
</body>
</html>"#,
    )
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    let records = scrape(&state.orchestrator).await;

    match metrics::render(&records) {
        Ok(metrics) => metrics.into_response(),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error rendering metrics: {}", e),
            )
                .into_response()
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    (axum::http::StatusCode::OK, "OK")
}
