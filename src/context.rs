//! Model Context
//!
//! A single immutable bundle of everything a request needs: the classifier on
//! the autodiff backend, its validation copy on the plain inference backend,
//! the class taxonomy and the device. Built once at startup and shared by
//! reference; handlers never reach for global model state.
//!
//! The taxonomy's cardinality and label format are checked against the model
//! during construction, so an index produced at request time can never fall
//! outside the class list or land on an unparseable name.

use std::path::Path;
use std::time::Instant;

use burn::module::{AutodiffModule, Module};
use burn::record::CompactRecorder;
use burn::tensor::backend::AutodiffBackend;
use image::RgbImage;
use tracing::{debug, info};

use crate::gradcam::{self, GradCamResult};
use crate::inference::{self, PredictionReport};
use crate::model::{LeafClassifier, LeafClassifierConfig};
use crate::overlay::{self, BlendWeights, OverlayFormat};
use crate::preprocess;
use crate::taxonomy::Taxonomy;
use crate::utils::error::{LeafcamError, Result};

/// Immutable serving context holding the model and taxonomy
pub struct ModelContext<B: AutodiffBackend> {
    /// Classifier on the autodiff backend, used by the explanation path
    model: LeafClassifier<B>,
    /// Validation copy on the inner backend, used for plain inference
    inner_model: LeafClassifier<B::InnerBackend>,
    /// Ordered class names matching the model's output layout
    taxonomy: Taxonomy,
    device: B::Device,
}

impl<B: AutodiffBackend> ModelContext<B> {
    /// Build a context from an already constructed model.
    ///
    /// Fails with [`LeafcamError::CardinalityMismatch`] when the taxonomy
    /// size does not match the model's class count, and with
    /// [`LeafcamError::MalformedLabel`] when any class name lacks the
    /// `"___"` delimiter; callers treat both as fatal at startup.
    pub fn new(model: LeafClassifier<B>, taxonomy: Taxonomy, device: B::Device) -> Result<Self> {
        taxonomy.check_cardinality(model.num_classes())?;
        taxonomy.validate_labels()?;

        let inner_model = model.clone().valid();

        Ok(Self {
            model,
            inner_model,
            taxonomy,
            device,
        })
    }

    /// Build a context by loading model weights from a `.mpk` artifact
    pub fn load(
        config: &LeafClassifierConfig,
        model_path: impl AsRef<Path>,
        taxonomy: Taxonomy,
        device: B::Device,
    ) -> Result<Self> {
        let path = model_path.as_ref();
        let recorder = CompactRecorder::new();

        let model = LeafClassifier::<B>::new(config, &device)
            .load_file(path, &recorder, &device)
            .map_err(|e| {
                LeafcamError::Model(format!(
                    "failed to load weights from {}: {:?}",
                    path.display(),
                    e
                ))
            })?;

        info!("Loaded model weights from {}", path.display());
        Self::new(model, taxonomy, device)
    }

    /// Number of classes the model predicts
    pub fn num_classes(&self) -> usize {
        self.model.num_classes()
    }

    /// The class taxonomy this context serves
    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Classify raw image bytes into a diagnosis.
    ///
    /// Runs on the inference copy of the model; `threshold` decides which
    /// confidence message the diagnosis carries.
    pub fn predict(&self, bytes: &[u8], threshold: f32) -> Result<PredictionReport> {
        let start = Instant::now();

        let rgb = preprocess::decode_image(bytes)?;
        let input = preprocess::to_input_tensor::<B::InnerBackend>(&rgb, &self.device);

        let probabilities = self
            .inner_model
            .forward_softmax(input)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| {
                LeafcamError::Inference(format!("failed to read probabilities: {:?}", e))
            })?;

        let diagnosis = inference::classify(&probabilities, &self.taxonomy, threshold)?;
        let (class_index, _) = inference::argmax(&probabilities)
            .ok_or_else(|| LeafcamError::Inference("empty probability vector".to_string()))?;
        let top_k = inference::top_k(&probabilities, &self.taxonomy, 5);

        let inference_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        debug!(
            "Predicted class {} with confidence {:.4} in {:.2} ms",
            class_index, diagnosis.confidence, inference_time_ms
        );

        Ok(PredictionReport {
            diagnosis,
            class_index,
            top_k,
            inference_time_ms,
        })
    }

    /// Compute the class-activation heatmap for raw image bytes.
    ///
    /// Returns the heatmap result together with the decoded source image so
    /// callers can composite without decoding a second time.
    pub fn explain(&self, bytes: &[u8]) -> Result<(GradCamResult, RgbImage)> {
        let rgb = preprocess::decode_image(bytes)?;
        let input = preprocess::to_input_tensor::<B::InnerBackend>(&rgb, &self.device);

        let result = gradcam::explain(&self.model, &self.inner_model, input)?;
        Ok((result, rgb))
    }

    /// Produce an encoded heatmap overlay for raw image bytes
    pub fn overlay(
        &self,
        bytes: &[u8],
        weights: BlendWeights,
        format: OverlayFormat,
    ) -> Result<Vec<u8>> {
        let start = Instant::now();
        let (result, source) = self.explain(bytes)?;

        let encoded = overlay::compose(&result.heatmap, &source, weights, format)?;
        debug!(
            "Composited overlay for class {} (degenerate: {}) in {:.2} ms",
            result.class_index,
            result.heatmap.degenerate,
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{CONFIDENCE_THRESHOLD, CONFIDENT_MESSAGE, NOT_CONFIDENT_MESSAGE};
    use burn::backend::Autodiff;
    use burn_ndarray::NdArray;
    use image::{DynamicImage, Rgb};
    use std::io::Cursor;

    type TestAutodiffBackend = Autodiff<NdArray>;

    fn test_taxonomy() -> Taxonomy {
        Taxonomy::new(
            vec![
                "Apple___Apple_scab",
                "Apple___healthy",
                "Grape___Black_rot",
                "Tomato___healthy",
                "Tomato___Early_blight",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        )
    }

    fn test_context() -> ModelContext<TestAutodiffBackend> {
        let device = Default::default();
        let config = LeafClassifierConfig::new()
            .with_num_classes(5)
            .with_base_filters(4);
        let model = LeafClassifier::<TestAutodiffBackend>::new(&config, &device);
        ModelContext::new(model, test_taxonomy(), device).unwrap()
    }

    fn leaf_png() -> Vec<u8> {
        let mut rgb = RgbImage::from_pixel(60, 60, Rgb([30, 150, 40]));
        for x in 20..40 {
            for y in 20..40 {
                rgb.put_pixel(x, y, Rgb([120, 90, 20]));
            }
        }

        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(rgb)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_cardinality_mismatch_is_fatal() {
        let device = Default::default();
        let config = LeafClassifierConfig::new()
            .with_num_classes(5)
            .with_base_filters(4);
        let model = LeafClassifier::<TestAutodiffBackend>::new(&config, &device);

        let err = ModelContext::new(model, Taxonomy::default_classes(), device).unwrap_err();
        assert!(matches!(
            err,
            LeafcamError::CardinalityMismatch {
                taxonomy: 38,
                model: 5
            }
        ));
    }

    #[test]
    fn test_malformed_class_list_is_fatal() {
        let device = Default::default();
        let config = LeafClassifierConfig::new()
            .with_num_classes(2)
            .with_base_filters(4);
        let model = LeafClassifier::<TestAutodiffBackend>::new(&config, &device);

        let taxonomy = Taxonomy::new(vec![
            "Apple___healthy".to_string(),
            "Background_without_leaves".to_string(),
        ]);
        let err = ModelContext::new(model, taxonomy, device).unwrap_err();
        assert!(matches!(err, LeafcamError::MalformedLabel(_)));
    }

    #[test]
    fn test_predict_produces_wellformed_report() {
        let context = test_context();
        let report = context.predict(&leaf_png(), CONFIDENCE_THRESHOLD).unwrap();

        assert!(report.class_index < 5);
        assert!(!report.diagnosis.plant_name.is_empty());
        assert!(!report.diagnosis.health_status.is_empty());
        assert!((0.0..=1.0).contains(&report.diagnosis.confidence));
        assert!(
            report.diagnosis.message == CONFIDENT_MESSAGE
                || report.diagnosis.message == NOT_CONFIDENT_MESSAGE
        );
        assert_eq!(report.top_k.len(), 5);
        assert!(report.inference_time_ms >= 0.0);
    }

    #[test]
    fn test_predict_is_deterministic() {
        let context = test_context();
        let bytes = leaf_png();

        let first = context.predict(&bytes, CONFIDENCE_THRESHOLD).unwrap();
        let second = context.predict(&bytes, CONFIDENCE_THRESHOLD).unwrap();

        assert_eq!(first.class_index, second.class_index);
        assert_eq!(first.diagnosis.confidence, second.diagnosis.confidence);
    }

    #[test]
    fn test_predict_rejects_undecodable_bytes() {
        let context = test_context();
        let err = context
            .predict(b"not an image", CONFIDENCE_THRESHOLD)
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_overlay_roundtrip() {
        let context = test_context();
        let bytes = context
            .overlay(
                &leaf_png(),
                crate::overlay::HEATMAP_BLEND,
                OverlayFormat::Jpeg,
            )
            .unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), preprocess::IMAGE_SIZE as u32);
        assert_eq!(decoded.height(), preprocess::IMAGE_SIZE as u32);
    }

    #[test]
    fn test_explain_heatmap_grid() {
        let context = test_context();
        let (result, source) = context.explain(&leaf_png()).unwrap();

        // 224 input through four 2x pools
        assert_eq!(result.heatmap.height, 14);
        assert_eq!(result.heatmap.width, 14);
        assert_eq!(source.dimensions(), (224, 224));
    }
}
