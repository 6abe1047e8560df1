//! HTTP error responses.
//!
//! Every non-200 path answers with `{"detail": "..."}` and an appropriate
//! status code; [`BloopError`] variants map onto statuses in one place.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::BloopError;

/// An HTTP-visible error: a status code plus a human-readable detail line.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

/// The error body shape.
#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            detail: self.detail,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<BloopError> for ApiError {
    fn from(err: BloopError) -> Self {
        match &err {
            BloopError::AiQueueTimeout => Self::new(
                StatusCode::TOO_MANY_REQUESTS,
                "Server is busy processing AI requests, please try again later.",
            ),
            BloopError::Io(_) => Self::internal(format!("Analysis setup failed: {err}")),
            _ => Self::internal(format!("Analysis failed: {err}")),
        }
    }
}
