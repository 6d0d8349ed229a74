//! Visualization endpoints
//!
//! Both endpoints run the class-activation pipeline and answer with an
//! encoded overlay image; they differ only in blend weights and format.

use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use leafcam::overlay::{BlendWeights, OverlayFormat, GRADCAM_BLEND, HEATMAP_BLEND};

use crate::routes::{error_response, no_file_response, read_file_field, task_failure_response, ErrorResponse};
use crate::state::SharedState;

/// POST /heatmap - JPEG overlay with the equal-weight blend
pub async fn heatmap(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    overlay_response(state, multipart, HEATMAP_BLEND, OverlayFormat::Jpeg).await
}

/// POST /gradcam - PNG overlay with the image-dominant blend
pub async fn gradcam(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    overlay_response(state, multipart, GRADCAM_BLEND, OverlayFormat::Png).await
}

async fn overlay_response(
    state: SharedState,
    mut multipart: Multipart,
    weights: BlendWeights,
    format: OverlayFormat,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let bytes = match read_file_field(&mut multipart).await {
        Some(bytes) => bytes,
        None => return Err(no_file_response()),
    };

    let encoded = tokio::task::spawn_blocking(move || state.context.overlay(&bytes, weights, format))
        .await
        .map_err(|_| task_failure_response())?
        .map_err(error_response)?;

    Ok(([(header::CONTENT_TYPE, format.content_type())], encoded).into_response())
}
