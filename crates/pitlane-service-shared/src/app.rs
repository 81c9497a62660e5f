//! Router assembly.
//!
//! Service endpoints are registered as plain axum routes; everything else
//! falls through to [`dispatch`], which serves the route table under the
//! configured mount prefix.

use axum::{http::Method, routing::get, Json, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::dispatch::dispatch;
use crate::health::{health_live, health_ready};
use crate::metrics::{metrics_handler, MetricsConfig};
use crate::middleware::MetricsLayer;
use crate::problem::MessageBody;
use crate::state::AppState;

/// Body served at `/`.
pub const ROOT_MESSAGE: &str = "F1 API is running!";

/// Build the complete HTTP application with the default metrics path.
pub fn build_router(state: AppState) -> Router {
    build_router_with(state, &MetricsConfig::default())
}

/// Build the complete HTTP application.
pub fn build_router_with(state: AppState, metrics: &MetricsConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_origin(Any);

    Router::new()
        .route("/", get(root))
        .route(&metrics.path, get(metrics_handler))
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready))
        .fallback(dispatch)
        .layer(cors)
        .layer(MetricsLayer)
        .with_state(state)
}

async fn root() -> Json<MessageBody> {
    Json(MessageBody::new(ROOT_MESSAGE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{body::Body, http::Request, http::StatusCode};
    use pitlane_lib::MemoryStore;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_root_message() {
        let app = build_router(AppState::new(Arc::new(MemoryStore::new())));
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_path_falls_through_to_dispatch() {
        let app = build_router(AppState::new(Arc::new(MemoryStore::new())));
        let response = app
            .oneshot(Request::get("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key("x-request-id"));
    }
}
