//! Pitlane F1 HTTP API.
//!
//! Serves a read-only JSON API over a PostgREST data service (or a JSON
//! dataset held in memory).
//!
//! # Endpoints
//!
//! - `GET /api/...` - F1 query patterns (circuits, constructors, races,
//!   drivers, results, qualifying, standings)
//! - `GET /` - Banner message
//! - `GET /metrics` - Prometheus metrics endpoint
//! - `GET /health/live` - Kubernetes liveness probe
//! - `GET /health/ready` - Kubernetes readiness probe
//!
//! # Configuration
//!
//! - `PITLANE_STORE_URL` - Base URL of the data service, e.g. `https://x.supabase.co/rest/v1`
//! - `PITLANE_STORE_KEY` - API key for the data service
//! - `PITLANE_STORE_TIMEOUT_SECS` - HTTP client timeout (default: 10)
//! - `PITLANE_DATASET_PATH` - JSON dataset served from memory when no store URL is set
//! - `PITLANE_BASE_PATH` - Mount prefix of the API (default: /api)
//! - `RUST_LOG` - Log level (default: info)
//! - `LOG_FORMAT` - Log format: json (default) or text
//! - `SERVICE_PORT` - HTTP port (default: 8080)

use std::net::SocketAddr;

use tracing::{error, info};

use pitlane_service_shared::{
    AppState, LoggingConfig, MetricsConfig, ServiceConfig, build_router_with, init_logging,
    init_metrics,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_config = LoggingConfig::from_env().with_service("pitlane-api");
    init_logging(&logging_config);

    let metrics_config = MetricsConfig::from_env();
    if let Err(e) = init_metrics(&metrics_config) {
        tracing::warn!(error = %e, "failed to initialize metrics, continuing without metrics");
    }

    let config = ServiceConfig::from_env();
    info!(
        base_path = %config.base_path,
        port = config.port,
        "starting pitlane api"
    );

    let state = AppState::from_config(&config).map_err(|e| {
        error!(error = %e, "failed to build application state");
        e
    })?;

    info!(
        backend = state.backend(),
        routes = state.routes().routes().len(),
        "application state ready"
    );

    let app = build_router_with(state, &metrics_config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(addr = %addr, "listening on");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
