//! Gradient-weighted Class Activation Mapping
//!
//! Explains a single classification by locating the image regions that drove
//! the winning class. The convolutional feature map is computed once on the
//! plain inference backend, re-entered into the autodiff graph as a tracked
//! leaf, and the top class score is differentiated with respect to it through
//! the classifier head alone. The spatial mean of each channel's gradient
//! weights that channel's activations; the weighted sum is clipped to
//! non-negative values and scaled so its peak is 1.0.

use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Tensor};
use tracing::warn;

use crate::model::LeafClassifier;
use crate::utils::error::{LeafcamError, Result};

/// A normalized class-activation heatmap over the feature map's spatial grid.
///
/// Values are stored row-major and lie in `[0, 1]`. When the clipped
/// activation map has no positive peak, normalizing would divide by zero, so
/// the heatmap comes back all zeros with the `degenerate` flag set instead of
/// carrying NaNs.
#[derive(Debug, Clone, PartialEq)]
pub struct Heatmap {
    /// Row-major activation values, `height * width` entries in [0, 1]
    pub values: Vec<f32>,
    pub height: usize,
    pub width: usize,
    /// True when normalization was skipped because the map had no positive peak
    pub degenerate: bool,
}

impl Heatmap {
    /// An all-zero heatmap, used when the activation map carries no signal
    pub fn neutral(height: usize, width: usize) -> Self {
        Self {
            values: vec![0.0; height * width],
            height,
            width,
            degenerate: true,
        }
    }

    /// Activation value at the given spatial cell
    pub fn at(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width + x]
    }
}

/// A heatmap together with the class it explains
#[derive(Debug, Clone)]
pub struct GradCamResult {
    pub heatmap: Heatmap,
    /// Index of the winning class the gradient was taken against
    pub class_index: usize,
}

/// Compute the class-activation heatmap from a feature map and the gradient
/// of the class score with respect to it.
///
/// # Arguments
/// * `activations` - Final conv activations of shape [1, channels, height, width]
/// * `gradients` - Gradients w.r.t. those activations, same shape
pub fn attribute<B: Backend>(
    activations: Tensor<B, 4>,
    gradients: Tensor<B, 4>,
) -> Result<Heatmap> {
    if activations.dims() != gradients.dims() {
        return Err(LeafcamError::Inference(format!(
            "activation shape {:?} does not match gradient shape {:?}",
            activations.dims(),
            gradients.dims()
        )));
    }

    let [_, _, height, width] = activations.dims();

    // Per-channel weights: spatial mean of the gradients, [B, C, 1, 1]
    let alpha = gradients.mean_dim(3).mean_dim(2);

    // Weighted channel sum with negative contributions clipped: [B, 1, H, W]
    let cam = (activations * alpha).sum_dim(1).clamp_min(0.0);

    let peak = cam.clone().max().into_scalar().elem::<f32>();
    if !peak.is_finite() || peak <= 0.0 {
        warn!("class activation map has no positive peak, returning neutral heatmap");
        return Ok(Heatmap::neutral(height, width));
    }

    let values = (cam / peak)
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| LeafcamError::Inference(format!("failed to read heatmap data: {:?}", e)))?;

    Ok(Heatmap {
        values,
        height,
        width,
        degenerate: false,
    })
}

/// Run the full explanation pipeline for a single preprocessed image.
///
/// The feature extractor runs on the inference backend so BatchNorm stays in
/// inference mode; only the classifier head runs under autodiff, with the
/// feature map as the tracked leaf the gradient is taken against.
pub fn explain<B: AutodiffBackend>(
    model: &LeafClassifier<B>,
    inner_model: &LeafClassifier<B::InnerBackend>,
    input: Tensor<B::InnerBackend, 4>,
) -> Result<GradCamResult> {
    let [batch, _, _, _] = input.dims();
    if batch != 1 {
        return Err(LeafcamError::Inference(format!(
            "expected a single-image batch, got {}",
            batch
        )));
    }

    // Feature map on the inference backend, re-entered as a tracked leaf
    let features = inner_model.forward_features(input);
    let features_ad = Tensor::<B, 4>::from_inner(features.clone()).require_grad();

    let scores = model.forward_head(features_ad.clone());
    let class_index = scores.clone().argmax(1).into_scalar().elem::<i64>() as usize;

    // Gradient of the winning class score w.r.t. the feature map
    let score = scores.slice([0..1, class_index..class_index + 1]);
    let grads = score.backward();
    let gradient = features_ad
        .grad(&grads)
        .ok_or_else(|| LeafcamError::Inference("no gradient reached the feature map".to_string()))?;

    let heatmap = attribute(features, gradient)?;

    Ok(GradCamResult {
        heatmap,
        class_index,
    })
}
