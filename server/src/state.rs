//! Application state for the leafcam server
//!
//! Holds the loaded model context and the settings every handler reads.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use leafcam::backend::ServingBackend;
use leafcam::context::ModelContext;
use leafcam::inference::CONFIDENCE_THRESHOLD;

/// Server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the trained model weights
    pub model_path: PathBuf,
    /// Path to the class list JSON, if one should be loaded from disk
    pub taxonomy_path: Option<PathBuf>,
    /// Probability the winning class must reach for a confident message
    pub confidence_threshold: f32,
    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/leafcam.mpk"),
            taxonomy_path: Some(PathBuf::from("taxonomy/class_names.json")),
            confidence_threshold: CONFIDENCE_THRESHOLD,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Everything the handlers share: settings, the model context, start time.
///
/// The context is immutable after startup, so the whole state is plain
/// read-only data behind an `Arc` with no interior locking.
pub struct AppState {
    pub config: ServerConfig,
    pub context: ModelContext<ServingBackend>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: ServerConfig, context: ModelContext<ServingBackend>) -> Self {
        Self {
            config,
            context,
            started_at: Instant::now(),
        }
    }

    /// Seconds since the server finished loading the model
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

pub type SharedState = Arc<AppState>;
