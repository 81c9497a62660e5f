//! Error response bodies.
//!
//! Two body shapes are used on the wire:
//!
//! ```text
//! 500 {"error": "<store message>"}
//! 404 {"message": "Race not found"}
//! 404 {"error": "Route not found"}
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use pitlane_lib::Error as LibError;

/// Body message for requests that match no route.
pub const ROUTE_NOT_FOUND: &str = "Route not found";

/// `{"error": ..}` body used for store failures and unmatched routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// `{"message": ..}` body used for not-found outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Terminal error outcome of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    /// The data service call failed; carries the message only.
    StoreFailure(String),
    /// A route-specific not-found outcome.
    NotFound(String),
    /// No route template matched the request.
    RouteNotFound,
}

impl Problem {
    /// Map a library error to a 500 outcome, exposing only its message.
    pub fn from_lib_error(err: &LibError) -> Self {
        Problem::StoreFailure(err.to_string())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Problem::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Problem::StoreFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Problem::NotFound(_) | Problem::RouteNotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Problem::StoreFailure(error) => (status, Json(ErrorBody { error })).into_response(),
            Problem::NotFound(message) => (status, Json(MessageBody { message })).into_response(),
            Problem::RouteNotFound => (
                status,
                Json(ErrorBody {
                    error: ROUTE_NOT_FOUND.to_string(),
                }),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_failure_keeps_message_only() {
        let err = LibError::store("JWT expired");
        let problem = Problem::from_lib_error(&err);
        assert_eq!(problem, Problem::StoreFailure("JWT expired".to_string()));
        assert_eq!(problem.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_not_found_statuses() {
        assert_eq!(Problem::not_found("Race not found").status(), StatusCode::NOT_FOUND);
        assert_eq!(Problem::RouteNotFound.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_body_shapes() {
        let error = serde_json::to_string(&ErrorBody {
            error: ROUTE_NOT_FOUND.to_string(),
        })
        .unwrap();
        assert_eq!(error, r#"{"error":"Route not found"}"#);

        let message = serde_json::to_string(&MessageBody::new("Driver not found")).unwrap();
        assert_eq!(message, r#"{"message":"Driver not found"}"#);
    }
}
