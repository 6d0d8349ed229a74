//! Prediction endpoint

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};

use leafcam::inference::Diagnosis;

use crate::routes::{error_response, no_file_response, read_file_field, task_failure_response, ErrorResponse};
use crate::state::SharedState;

/// POST /predict - Classify an uploaded leaf image
///
/// Expects a multipart body with the image under the `file` field and
/// answers with the diagnosis JSON.
pub async fn predict(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<Diagnosis>, (StatusCode, Json<ErrorResponse>)> {
    let bytes = match read_file_field(&mut multipart).await {
        Some(bytes) => bytes,
        None => return Err(no_file_response()),
    };

    let threshold = state.config.confidence_threshold;
    let report = tokio::task::spawn_blocking(move || state.context.predict(&bytes, threshold))
        .await
        .map_err(|_| task_failure_response())?
        .map_err(error_response)?;

    Ok(Json(report.diagnosis))
}
