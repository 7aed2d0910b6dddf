//! Turf Advisor Server
//!
//! HTTP surface for the advisor: ask, feedback, cache administration,
//! health, readiness and Prometheus metrics.

pub mod http;
pub mod metrics;
pub mod rate_limit;
pub mod state;

pub use http::create_router;
pub use metrics::{init_metrics, record_rate_limited, record_request};
pub use rate_limit::{RateLimitError, RateLimiter};
pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use turf_advisor_pipeline::PipelineError;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PipelineError> for ServerError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Query(_) | PipelineError::InvalidFeedback(_) => {
                ServerError::InvalidRequest(err.to_string())
            }
            PipelineError::Golden(msg) => ServerError::Internal(msg),
        }
    }
}

impl From<ServerError> for StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::RateLimit => StatusCode::TOO_MANY_REQUESTS,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let status = StatusCode::from(self);
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
