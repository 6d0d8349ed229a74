//! Leafcam Inference Server
//!
//! HTTP API server for plant disease diagnosis. Accepts leaf photos as
//! multipart uploads and answers with a diagnosis or a class-activation
//! overlay highlighting the image regions behind the prediction.

mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use leafcam::backend::{backend_name, default_device, ServingBackend};
use leafcam::context::ModelContext;
use leafcam::model::LeafClassifierConfig;
use leafcam::taxonomy::Taxonomy;
use leafcam::utils::logging::LogConfig;

use crate::state::{AppState, ServerConfig, SharedState};

/// Leafcam Inference Server
#[derive(Parser, Debug)]
#[command(name = "leafcam-server")]
#[command(version)]
#[command(about = "HTTP API server for plant disease diagnosis with visual explanations")]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value = "5000", env = "LEAFCAM_PORT")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0", env = "LEAFCAM_HOST")]
    host: String,

    /// Path to the trained model weights
    #[arg(short, long, env = "LEAFCAM_MODEL")]
    model: Option<PathBuf>,

    /// Path to the class list JSON
    #[arg(short, long, env = "LEAFCAM_TAXONOMY")]
    taxonomy: Option<PathBuf>,

    /// Probability the winning class must reach for a confident message
    #[arg(long, env = "LEAFCAM_CONFIDENCE_THRESHOLD")]
    confidence_threshold: Option<f32>,

    /// Maximum accepted upload size in megabytes
    #[arg(long, env = "LEAFCAM_MAX_UPLOAD_MB")]
    max_upload_mb: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    log_config.install();

    // Build configuration
    let mut config = ServerConfig::default();

    if let Some(model) = cli.model {
        config.model_path = model;
    }

    if let Some(taxonomy) = cli.taxonomy {
        config.taxonomy_path = Some(taxonomy);
    }

    if let Some(threshold) = cli.confidence_threshold {
        config.confidence_threshold = threshold;
    }

    if let Some(max_upload_mb) = cli.max_upload_mb {
        config.max_upload_bytes = max_upload_mb * 1024 * 1024;
    }

    info!("Leafcam Inference Server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Backend:      {}", backend_name());
    info!("  Model path:   {:?}", config.model_path);
    info!("  Class list:   {:?}", config.taxonomy_path);
    info!("  Threshold:    {}", config.confidence_threshold);
    info!("  Upload limit: {} bytes", config.max_upload_bytes);

    // Resolve the class list
    let taxonomy = match &config.taxonomy_path {
        Some(path) if path.exists() => Taxonomy::from_json_file(path)
            .with_context(|| format!("loading class list from {:?}", path))?,
        Some(path) => {
            warn!(
                "Class list {:?} not found, using the built-in PlantVillage classes",
                path
            );
            Taxonomy::default_classes()
        }
        None => Taxonomy::default_classes(),
    };
    info!("  Classes:      {}", taxonomy.len());

    // Load the model; refusing to start beats serving garbage
    if !config.model_path.exists() {
        anyhow::bail!(
            "Model weights not found at {:?}. Create an artifact first with: leafcam init-model",
            config.model_path
        );
    }

    let device = default_device();
    let model_config = LeafClassifierConfig::new().with_num_classes(taxonomy.len());
    let context =
        ModelContext::<ServingBackend>::load(&model_config, &config.model_path, taxonomy, device)
            .context("initializing the model context")?;

    // Create shared state
    let state = Arc::new(AppState::new(config, context));

    // Build router
    let app = build_app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_app(state: SharedState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        // Health check
        .route("/health", get(routes::health::health_check))
        // Diagnosis
        .route("/predict", post(routes::predict::predict))
        // Visual explanations
        .route("/heatmap", post(routes::visualize::heatmap))
        .route("/gradcam", post(routes::visualize::gradcam))
        // Add state
        .with_state(state)
        // Add middleware
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use leafcam::model::LeafClassifier;

    const BOUNDARY: &str = "leafcam-test-boundary";

    fn test_state() -> SharedState {
        let device = default_device();
        let config = LeafClassifierConfig::new()
            .with_num_classes(5)
            .with_base_filters(4);
        let model = LeafClassifier::<ServingBackend>::new(&config, &device);
        let taxonomy = Taxonomy::new(vec![
            "Apple___healthy".to_string(),
            "Apple___Apple_scab".to_string(),
            "Tomato___healthy".to_string(),
            "Tomato___Early_blight".to_string(),
            "Potato___Late_blight".to_string(),
        ]);
        let context = ModelContext::new(model, taxonomy, device).unwrap();

        Arc::new(AppState::new(ServerConfig::default(), context))
    }

    fn leaf_jpeg() -> Vec<u8> {
        let mut image = image::RgbImage::new(64, 64);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            *pixel = image::Rgb([30, (60 + x * 2) as u8, (20 + y) as u8]);
        }
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
            .unwrap();
        buf
    }

    fn multipart_request(uri: &str, field_name: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field_name}\"; filename=\"leaf.jpg\"\r\n\
                 Content-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = build_app(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["num_classes"], 5);
    }

    #[tokio::test]
    async fn predict_returns_diagnosis_fields() {
        let app = build_app(test_state());
        let response = app
            .oneshot(multipart_request("/predict", "file", &leaf_jpeg()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert!(json["plant_name"].is_string());
        assert!(json["health_status"].is_string());
        let confidence = json["confidence"].as_f64().unwrap();
        assert!(confidence > 0.0 && confidence <= 1.0);
        let message = json["message"].as_str().unwrap();
        assert!(
            message == "The model is confident about the result."
                || message == "The model is not confident about the result."
        );
    }

    #[tokio::test]
    async fn predict_without_file_field_is_rejected() {
        let app = build_app(test_state());
        let response = app
            .oneshot(multipart_request("/predict", "image", &leaf_jpeg()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "No file uploaded");
    }

    #[tokio::test]
    async fn predict_rejects_undecodable_upload() {
        let app = build_app(test_state());
        let response = app
            .oneshot(multipart_request("/predict", "file", b"not an image"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].as_str().unwrap().contains("decode"));
    }

    #[tokio::test]
    async fn heatmap_answers_with_jpeg() {
        let app = build_app(test_state());
        let response = app
            .oneshot(multipart_request("/heatmap", "file", &leaf_jpeg()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/jpeg"
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(
            image::guess_format(&body).unwrap(),
            image::ImageFormat::Jpeg
        );
        let overlay = image::load_from_memory(&body).unwrap();
        assert_eq!(overlay.width(), 224);
        assert_eq!(overlay.height(), 224);
    }

    #[tokio::test]
    async fn gradcam_answers_with_png() {
        let app = build_app(test_state());
        let response = app
            .oneshot(multipart_request("/gradcam", "file", &leaf_jpeg()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/png"
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(image::guess_format(&body).unwrap(), image::ImageFormat::Png);
    }

    #[tokio::test]
    async fn gradcam_without_file_field_is_rejected() {
        let app = build_app(test_state());
        let response = app
            .oneshot(multipart_request("/gradcam", "upload", &leaf_jpeg()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "No file uploaded");
    }
}
