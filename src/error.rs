use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::time::Duration;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

// Errors rendered to clients as `{"error": "..."}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("rate limit exceeded")]
    RateLimitExceeded { retry_after: Duration },

    #[error("the requested resource could not be found")]
    NotFound,

    // detail is logged, never sent to the client
    #[error("the server encountered a problem and could not process your request")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });

        match self {
            ApiError::RateLimitExceeded { retry_after } => {
                // Retry-After is whole seconds, at least one
                let secs = retry_after.as_secs_f64().ceil().max(1.0) as u64;
                (status, [(header::RETRY_AFTER, secs.to_string())], body).into_response()
            }
            ApiError::Internal(detail) => {
                error!(error = %detail, "internal server error");
                (status, body).into_response()
            }
            ApiError::NotFound => (status, body).into_response(),
        }
    }
}
