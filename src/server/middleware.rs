//! HTTP middleware: API-key check and upload-size cap.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use super::error::ApiError;
use super::state::AppState;

/// Header carrying the client's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Rejects requests whose `X-API-Key` does not match the configured key.
///
/// A missing configured key means protection is disabled and every request
/// passes through.
pub async fn check_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(required) = state.config.api_key.as_deref() else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match provided {
        None | Some("") => {
            ApiError::new(StatusCode::UNAUTHORIZED, "API key is missing").into_response()
        }
        Some(key) if key != required => {
            ApiError::new(StatusCode::FORBIDDEN, "Invalid API key").into_response()
        }
        Some(_) => next.run(request).await,
    }
}

/// Early 413 on a declared `Content-Length` above the configured cap.
///
/// The body limit layer still guards chunked uploads that never declare a
/// length; this check just refuses oversized uploads before reading a byte.
pub async fn limit_upload_size(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    if let Some(length) = declared {
        let limit = state.config.max_upload_size_bytes;
        if length > limit {
            warn!(length, limit, "rejected upload: content-length exceeds limit");
            return ApiError::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!(
                    "Maximum request body size limit exceeded ({:.1} MB)",
                    limit as f64 / (1024.0 * 1024.0)
                ),
            )
            .into_response();
        }
    }

    next.run(request).await
}
