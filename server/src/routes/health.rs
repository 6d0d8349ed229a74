//! Health check endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use leafcam::backend::backend_name;

use crate::state::SharedState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_seconds: u64,
    pub version: &'static str,
    pub num_classes: usize,
    pub backend: &'static str,
}

/// GET /health - Liveness probe reporting uptime and model facts
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION"),
        num_classes: state.context.num_classes(),
        backend: backend_name(),
    })
}
