//! HTTP layer of the Pitlane F1 API.
//!
//! This crate turns `pitlane-lib` query patterns into a read-only JSON API:
//!
//! - [`RouteTable`]: ordered path templates, first match wins
//! - [`dispatch`]: the axum fallback that runs the matched [`Plan`]
//! - [`normalize`]: one response policy applied to every query outcome
//! - [`AppState`]: the data client built once at start-up
//! - [`health`]: liveness/readiness probes
//! - [`metrics`], [`logging`], [`middleware`]: observability
//!
//! # Architecture
//!
//! Handlers hold no query logic. Each route maps path parameters to a
//! [`pitlane_lib::Query`]; the library builds the descriptor and the
//! injected [`pitlane_lib::DataClient`] executes it:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  dispatch                                                   │
//! │  - Match path against the route table                       │
//! │  - Resolve natural-key reference (when the route needs it)  │
//! │  - Execute query descriptor through the data client         │
//! │  - Normalize to list / single / 404 / 500                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Testing Support
//!
//! The [`test_utils`] module provides the fixture dataset and state helpers.
//! Enable the `test-utils` feature to access it from dependent crates.

mod app;
pub mod config;
pub mod dispatch;
mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;
mod problem;
mod response;
pub mod routes;
mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use app::{build_router, build_router_with, ROOT_MESSAGE};
pub use config::{DataSource, ServiceConfig, DEFAULT_BASE_PATH, DEFAULT_PORT};
pub use dispatch::{dispatch, run_plan};
pub use health::{health_live, health_ready, HealthStatus};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{
    init_metrics, metrics_handler, record_query, record_reference_lookup, record_rows_returned,
    MetricsConfig, MetricsError,
};
pub use middleware::{extract_or_generate_request_id, MetricsLayer, RequestId, RouteLabel};
pub use problem::{ErrorBody, MessageBody, Problem, ROUTE_NOT_FOUND};
pub use response::{normalize, ApiResponse, Policy};
pub use routes::{PathParams, PathTemplate, Plan, Route, RouteTable, Shadowed, Step};
pub use state::{AppState, AppStateError};
