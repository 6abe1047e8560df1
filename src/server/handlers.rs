//! Request handlers for the two public endpoints.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::analysis::AnalysisResult;
use crate::error::BloopError;

use super::error::ApiError;
use super::state::AppState;

/// Health payload: liveness plus AI-pool pressure.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ai_tasks_queued: usize,
    pub ai_tasks_processing: i64,
    pub ai_tasks_worker_capacity: usize,
}

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let metrics = state.pool.metrics();
    Json(HealthResponse {
        status: "ok",
        ai_tasks_queued: metrics.queued,
        ai_tasks_processing: metrics.processing,
        ai_tasks_worker_capacity: metrics.capacity,
    })
}

/// `POST /analyze/` — multipart upload with a required `file` field.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<AnalysisResult>, ApiError> {
    let (filename, data) = read_upload(multipart).await?;
    info!(file = %filename, bytes = data.len(), "received analysis request");

    let deadline = Instant::now() + state.config.analysis_timeout;
    let analysis = tokio::time::timeout_at(
        deadline,
        state.analyzer.analyze(data, &filename, deadline),
    )
    .await;

    match analysis {
        Err(_) => {
            warn!(file = %filename, "analysis timed out");
            Err(ApiError::new(
                StatusCode::GATEWAY_TIMEOUT,
                format!(
                    "Analysis processing timed out after {}s.",
                    state.config.analysis_timeout.as_secs()
                ),
            ))
        }
        Ok(Err(e)) => {
            warn!(file = %filename, "analysis failed: {e}");
            Err(e.into())
        }
        Ok(Ok(result)) => {
            if let Some(error) = &result.error {
                info!(file = %filename, "analysis completed with internal errors: {error}");
            }
            Ok(Json(result))
        }
    }
}

/// Pulls the `file` field out of the multipart body and validates it.
///
/// Validation failures (missing field, wrong extension, empty body) are the
/// client's fault and answer 400; a byte stream that dies mid-read is the
/// one fatal parser-side error and answers 500.
async fn read_upload(mut multipart: Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Could not get file from request: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(ApiError::bad_request("Filename cannot be empty."));
        }
        if !filename.to_lowercase().ends_with(".txt") {
            return Err(ApiError::bad_request(
                "Invalid file extension. Please upload a .txt file.",
            ));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::from(BloopError::Io(std::io::Error::other(e))))?;
        if data.is_empty() {
            return Err(ApiError::bad_request("Uploaded file is empty."));
        }

        return Ok((filename, data.to_vec()));
    }

    Err(ApiError::bad_request("Could not get file from request"))
}
