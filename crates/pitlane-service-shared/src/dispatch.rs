//! Request dispatch.
//!
//! [`dispatch`] is mounted as the router fallback. Per request it strips the
//! mount prefix, matches the decoded segments against the route table and
//! runs the matched [`Plan`]:
//!
//! ```text
//! Received -> (Resolving-Reference) -> Building-Query -> Executing -> Normalizing-Response
//! ```
//!
//! Any step may end the request early with a 404 or 500.

use axum::{
    extract::State,
    http::{Method, Uri},
    response::{IntoResponse, Response},
};
use percent_encoding::percent_decode_str;
use tracing::{info, warn};

use pitlane_lib::{execute, resolve_reference, DataClient};

use crate::metrics::{record_query, record_reference_lookup, record_rows_returned};
use crate::middleware::RouteLabel;
use crate::problem::Problem;
use crate::response::{normalize, ApiResponse};
use crate::routes::{Plan, Step};
use crate::state::AppState;

/// Route label used for requests that match no template.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Axum fallback handler serving the route table.
pub async fn dispatch(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    let Some(segments) = route_segments(state.base_path(), uri.path()) else {
        return route_not_found();
    };

    let Some((route, params)) = state.routes().find(&method, &segments) else {
        return route_not_found();
    };

    let label = route.template.as_str();
    let plan = (route.handler)(&params);
    let response = run_plan(state.client(), plan).await;

    let mut response = response.into_response();
    response.extensions_mut().insert(RouteLabel(label));
    response
}

fn route_not_found() -> Response {
    let mut response = Problem::RouteNotFound.into_response();
    response
        .extensions_mut()
        .insert(RouteLabel(UNMATCHED_ROUTE));
    response
}

/// Split `path` below `base_path` into percent-decoded segments.
///
/// Returns `None` when the path is outside the mount prefix. A trailing
/// slash is ignored.
pub fn route_segments(base_path: &str, path: &str) -> Option<Vec<String>> {
    let rest = if base_path.is_empty() {
        path
    } else {
        let rest = path.strip_prefix(base_path)?;
        if !rest.is_empty() && !rest.starts_with('/') {
            return None;
        }
        rest
    };

    let rest = rest.strip_prefix('/').unwrap_or(rest);
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    if rest.is_empty() {
        return Some(Vec::new());
    }

    Some(
        rest.split('/')
            .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
            .collect(),
    )
}

/// Run a plan to completion and normalize its outcome.
pub async fn run_plan(client: &dyn DataClient, plan: Plan) -> ApiResponse {
    match plan {
        Plan::Run(step) => run_step(client, step).await,
        Plan::ResolveThenRun {
            entity,
            reference,
            not_found,
            next,
        } => match resolve_reference(client, entity, &reference).await {
            Ok(Some(id)) => {
                record_reference_lookup(entity.table(), "resolved");
                run_step(client, next(id)).await
            }
            Ok(None) => {
                record_reference_lookup(entity.table(), "not_found");
                info!(table = %entity, reference = %reference, "reference not found");
                ApiResponse::Problem(Problem::not_found(not_found))
            }
            Err(err) => {
                record_reference_lookup(entity.table(), "error");
                warn!(table = %entity, reference = %reference, error = %err, "reference lookup failed");
                ApiResponse::Problem(Problem::from_lib_error(&err))
            }
        },
    }
}

async fn run_step(client: &dyn DataClient, step: Step) -> ApiResponse {
    let pattern = step.query.name();
    let descriptor = step.query.descriptor();
    let outcome = execute(client, &descriptor).await;

    match &outcome {
        Ok(rows) => {
            record_rows_returned(pattern, rows.len());
            info!(pattern, rows = rows.len(), "query executed");
        }
        Err(err) => warn!(pattern, error = %err, "query failed"),
    }

    let response = normalize(outcome, step.policy, &step.not_found);
    record_query(pattern, response.outcome());
    response
}
