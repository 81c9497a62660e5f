//! Health check handlers for Kubernetes probes.
//!
//! Provides `/health/live` and `/health/ready` endpoints that return JSON
//! status responses for Kubernetes liveness and readiness probes.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use pitlane_lib::{execute, Query};

use crate::AppState;

/// Health status response for liveness and readiness probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Status indicator: "ok" or "not_ready: <reason>".
    pub status: String,

    /// Service name for identification.
    pub service: String,

    /// Service version from build-time.
    pub version: String,

    /// RFC 3339 time the status was produced.
    pub checked_at: String,

    /// Kind of data client behind the service (for readiness check).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,

    /// Whether the connectivity probe reached the data store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_reachable: Option<bool>,
}

impl HealthStatus {
    /// Create a healthy liveness status.
    pub fn alive(service: &str, version: &str) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.to_string(),
            version: version.to_string(),
            checked_at: now(),
            backend: None,
            store_reachable: None,
        }
    }

    /// Create a ready status for the given backend.
    pub fn ready(service: &str, version: &str, backend: &str) -> Self {
        Self {
            backend: Some(backend.to_string()),
            store_reachable: Some(true),
            ..Self::alive(service, version)
        }
    }

    /// Create a not-ready status.
    pub fn not_ready(service: &str, version: &str, backend: &str, reason: &str) -> Self {
        Self {
            status: format!("not_ready: {}", reason),
            backend: Some(backend.to_string()),
            store_reachable: Some(false),
            ..Self::alive(service, version)
        }
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Liveness probe handler.
///
/// Returns 200 OK if the service is running. Does not touch the data store.
///
/// ```text
/// GET /health/live
/// {"status":"ok","service":"pitlane-service-shared","version":"0.1.0","checked_at":".."}
/// ```
pub async fn health_live() -> impl IntoResponse {
    let status = HealthStatus::alive(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    (StatusCode::OK, Json(status))
}

/// Readiness probe handler.
///
/// Runs the connectivity probe (first three races by id) against the data
/// client. Any store error makes the service not ready (503).
pub async fn health_ready(State(state): State<AppState>) -> Response {
    let service = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");
    let backend = state.backend();

    match execute(state.client(), &Query::ConnectivityProbe.descriptor()).await {
        Ok(rows) => {
            tracing::debug!(rows = rows.len(), backend, "connectivity probe succeeded");
            let status = HealthStatus::ready(service, version, backend);
            (StatusCode::OK, Json(status)).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, backend, "connectivity probe failed");
            let status = HealthStatus::not_ready(service, version, backend, &e.to_string());
            (StatusCode::SERVICE_UNAVAILABLE, Json(status)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_alive() {
        let status = HealthStatus::alive("test-service", "1.0.0");
        assert_eq!(status.status, "ok");
        assert_eq!(status.service, "test-service");
        assert_eq!(status.version, "1.0.0");
        assert!(status.backend.is_none());
        assert!(status.store_reachable.is_none());
        assert!(chrono::DateTime::parse_from_rfc3339(&status.checked_at).is_ok());
    }

    #[test]
    fn test_health_status_ready() {
        let status = HealthStatus::ready("test-service", "1.0.0", "rest");
        assert_eq!(status.status, "ok");
        assert_eq!(status.backend.as_deref(), Some("rest"));
        assert_eq!(status.store_reachable, Some(true));
    }

    #[test]
    fn test_health_status_not_ready() {
        let status = HealthStatus::not_ready("test-service", "1.0.0", "rest", "timed out");
        assert!(status.status.starts_with("not_ready:"));
        assert!(status.status.contains("timed out"));
        assert_eq!(status.store_reachable, Some(false));
    }

    #[test]
    fn test_health_status_serialization() {
        let status = HealthStatus::alive("pitlane", "0.1.0");
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"service\":\"pitlane\""));
        assert!(!json.contains("store_reachable"));
    }

    #[tokio::test]
    async fn test_readiness_reads_races_only() {
        use std::sync::Arc;

        use pitlane_lib::{Entity, MemoryStore};
        use serde_json::json;

        let store = Arc::new(MemoryStore::new().with_table(
            Entity::Races,
            vec![json!({"raceId": 1, "name": "Australian Grand Prix"})],
        ));
        let state = AppState::new(Arc::clone(&store) as Arc<dyn pitlane_lib::DataClient>);

        let response = health_ready(State(state)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(store.calls(), 1);
    }
}
