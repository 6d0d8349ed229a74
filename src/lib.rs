//! # Leafcam
//!
//! A Rust library for plant disease diagnosis with visual explanations,
//! built on the Burn framework. A pretrained CNN classifies leaf images into
//! PlantVillage-style `"Plant___Condition"` classes, and gradient-weighted
//! class-activation mapping shows which image regions drove each diagnosis.
//!
//! ## Modules
//!
//! - `backend`: Compile-time backend selection (NdArray CPU, optional CUDA)
//! - `preprocess`: Image decoding and normalization into model input tensors
//! - `model`: CNN architecture split into feature-extractor and head sub-graphs
//! - `taxonomy`: Class name list and the `"Plant___Condition"` label parser
//! - `inference`: Argmax classification and confidence messaging
//! - `gradcam`: Class-activation heatmaps via autodiff through the head
//! - `overlay`: Colormap, upscale and blend of heatmaps over source images
//! - `context`: The immutable serving context bundling model and taxonomy
//! - `utils`: Error types and logging setup
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use leafcam::backend::{default_device, ServingBackend};
//! use leafcam::context::ModelContext;
//! use leafcam::model::LeafClassifierConfig;
//! use leafcam::taxonomy::Taxonomy;
//!
//! let device = default_device();
//! let config = LeafClassifierConfig::new();
//! let context = ModelContext::<ServingBackend>::load(
//!     &config,
//!     "models/leafcam.mpk",
//!     Taxonomy::default_classes(),
//!     device,
//! )?;
//!
//! let report = context.predict(&image_bytes, leafcam::CONFIDENCE_THRESHOLD)?;
//! println!("{}", report.display());
//! ```

pub mod backend;
pub mod context;
pub mod gradcam;
pub mod inference;
pub mod model;
pub mod overlay;
pub mod preprocess;
pub mod taxonomy;
pub mod utils;

// Re-export commonly used items for convenience
pub use context::ModelContext;
pub use gradcam::{GradCamResult, Heatmap};
pub use inference::{classify, Diagnosis, PredictionReport};
pub use model::{LeafClassifier, LeafClassifierConfig};
pub use overlay::{BlendWeights, OverlayFormat, GRADCAM_BLEND, HEATMAP_BLEND};
pub use preprocess::IMAGE_SIZE;
pub use taxonomy::{ClassLabel, Taxonomy};
pub use utils::error::{LeafcamError, Result};

/// Confidence threshold separating confident from uncertain diagnoses
pub const CONFIDENCE_THRESHOLD: f32 = inference::CONFIDENCE_THRESHOLD;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
