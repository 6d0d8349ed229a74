//! Route handlers for the leafcam server

pub mod health;
pub mod predict;
pub mod visualize;

use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use leafcam::LeafcamError;

/// Error payload returned by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Pull the bytes of the `file` field out of a multipart upload.
///
/// Returns `None` when the field is absent or unreadable, which handlers
/// turn into the canonical missing-upload rejection.
pub async fn read_file_field(multipart: &mut Multipart) -> Option<Vec<u8>> {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            match field.bytes().await {
                Ok(bytes) => return Some(bytes.to_vec()),
                Err(e) => {
                    warn!("Failed to read uploaded bytes: {}", e);
                    return None;
                }
            }
        }
    }
    None
}

/// 400 response for requests that arrived without a `file` field
pub fn no_file_response() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "No file uploaded".to_string(),
        }),
    )
}

/// Map a pipeline error to its wire status and payload.
///
/// Undecodable uploads are the caller's fault and come back as 400; anything
/// else is a server-side failure.
pub fn error_response(err: LeafcamError) -> (StatusCode, Json<ErrorResponse>) {
    let status = if err.is_client_error() {
        warn!("Rejected request: {}", err);
        StatusCode::BAD_REQUEST
    } else {
        error!("Request failed: {}", err);
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

/// 500 response for a worker task that died before reporting a result
pub fn task_failure_response() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Inference task failed".to_string(),
        }),
    )
}
