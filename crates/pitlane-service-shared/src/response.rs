//! Response normalization.
//!
//! Every route names a [`Policy`]; [`normalize`] is the single place where a
//! query outcome becomes an HTTP response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use pitlane_lib::Result as LibResult;

use crate::problem::Problem;

/// How a query outcome maps to a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// 200 with the full array, empty included.
    List,
    /// 200 with the first row, 404 when there is none.
    Single,
    /// 200 with the full array, 404 when it is empty.
    ListRequireNonEmpty,
}

/// Normalized outcome of one request.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    List(Vec<Value>),
    Single(Value),
    Problem(Problem),
}

impl ApiResponse {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiResponse::List(_) | ApiResponse::Single(_) => StatusCode::OK,
            ApiResponse::Problem(problem) => problem.status(),
        }
    }

    /// Short label used for metrics and logs.
    pub fn outcome(&self) -> &'static str {
        match self {
            ApiResponse::List(rows) if rows.is_empty() => "empty",
            ApiResponse::List(_) | ApiResponse::Single(_) => "ok",
            ApiResponse::Problem(Problem::StoreFailure(_)) => "error",
            ApiResponse::Problem(_) => "not_found",
        }
    }
}

/// Map `outcome` to a response under `policy`.
///
/// `not_found` is the route-specific message for the 404 outcomes; it is
/// ignored under [`Policy::List`]. Extra rows under [`Policy::Single`] are
/// dropped.
pub fn normalize(outcome: LibResult<Vec<Value>>, policy: Policy, not_found: &str) -> ApiResponse {
    let rows = match outcome {
        Ok(rows) => rows,
        Err(err) => return ApiResponse::Problem(Problem::from_lib_error(&err)),
    };

    match policy {
        Policy::List => ApiResponse::List(rows),
        Policy::Single => match rows.into_iter().next() {
            Some(row) => ApiResponse::Single(row),
            None => ApiResponse::Problem(Problem::not_found(not_found)),
        },
        Policy::ListRequireNonEmpty if rows.is_empty() => {
            ApiResponse::Problem(Problem::not_found(not_found))
        }
        Policy::ListRequireNonEmpty => ApiResponse::List(rows),
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        match self {
            ApiResponse::List(rows) => (StatusCode::OK, Json(rows)).into_response(),
            ApiResponse::Single(row) => (StatusCode::OK, Json(row)).into_response(),
            ApiResponse::Problem(problem) => problem.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitlane_lib::Error as LibError;
    use serde_json::json;

    fn rows() -> Vec<Value> {
        vec![json!({"raceId": 1}), json!({"raceId": 2})]
    }

    #[test]
    fn test_store_error_is_500_under_every_policy() {
        for policy in [Policy::List, Policy::Single, Policy::ListRequireNonEmpty] {
            let response = normalize(Err(LibError::store("timeout")), policy, "x");
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(
                response,
                ApiResponse::Problem(Problem::StoreFailure("timeout".to_string()))
            );
        }
    }

    #[test]
    fn test_list_allows_empty() {
        let response = normalize(Ok(Vec::new()), Policy::List, "ignored");
        assert_eq!(response, ApiResponse::List(Vec::new()));
        assert_eq!(response.outcome(), "empty");
    }

    #[test]
    fn test_single_takes_first_row() {
        let response = normalize(Ok(rows()), Policy::Single, "Race not found");
        assert_eq!(response, ApiResponse::Single(json!({"raceId": 1})));
    }

    #[test]
    fn test_single_without_rows_is_404() {
        let response = normalize(Ok(Vec::new()), Policy::Single, "Race not found");
        assert_eq!(
            response,
            ApiResponse::Problem(Problem::NotFound("Race not found".to_string()))
        );
        assert_eq!(response.outcome(), "not_found");
    }

    #[test]
    fn test_require_non_empty() {
        let response = normalize(Ok(Vec::new()), Policy::ListRequireNonEmpty, "none");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = normalize(Ok(rows()), Policy::ListRequireNonEmpty, "none");
        assert_eq!(response, ApiResponse::List(rows()));
    }
}
