//! Diagnosis Module
//!
//! Maps a class probability distribution to the wire-format diagnosis: the
//! winning class is split into its plant and condition fields, and the
//! confidence message is derived from a single threshold comparison so there
//! is exactly one computation path regardless of how confident the model is.

use serde::{Deserialize, Serialize};

use crate::taxonomy::Taxonomy;
use crate::utils::error::{LeafcamError, Result};

/// Confidence at or above this value counts as a confident diagnosis
pub const CONFIDENCE_THRESHOLD: f32 = 0.7;

/// Message returned when the confidence threshold is met
pub const CONFIDENT_MESSAGE: &str = "The model is confident about the result.";

/// Message returned when the confidence threshold is not met
pub const NOT_CONFIDENT_MESSAGE: &str = "The model is not confident about the result.";

/// Select the user-facing message for a confidence outcome
pub fn diagnosis_message(confident: bool) -> &'static str {
    if confident {
        CONFIDENT_MESSAGE
    } else {
        NOT_CONFIDENT_MESSAGE
    }
}

/// A single diagnosis in the shape the prediction endpoint serves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    /// Plant species from the winning class label
    pub plant_name: String,
    /// Health condition from the winning class label
    pub health_status: String,
    /// Probability of the winning class
    pub confidence: f32,
    /// Confidence statement derived from the threshold comparison
    pub message: String,
    /// Whether the confidence met the threshold (not part of the wire format)
    #[serde(skip)]
    pub confident: bool,
}

/// Index and probability of the winning class, or `None` for an empty slice
pub fn argmax(probabilities: &[f32]) -> Option<(usize, f32)> {
    probabilities
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
        .map(|(i, &p)| (i, p))
}

/// Classify a probability distribution against a taxonomy.
///
/// The winning class is the argmax of `probabilities`; the comparison
/// `confidence >= threshold` is inclusive, so a confidence exactly at the
/// threshold counts as confident.
pub fn classify(probabilities: &[f32], taxonomy: &Taxonomy, threshold: f32) -> Result<Diagnosis> {
    let (class_index, confidence) = argmax(probabilities)
        .ok_or_else(|| LeafcamError::Inference("empty probability vector".to_string()))?;

    let label = taxonomy.label(class_index)?;
    let confident = confidence >= threshold;

    Ok(Diagnosis {
        plant_name: label.plant,
        health_status: label.condition,
        confidence,
        message: diagnosis_message(confident).to_string(),
        confident,
    })
}

/// Get the top-k predictions with their class names and probabilities
pub fn top_k(probabilities: &[f32], taxonomy: &Taxonomy, k: usize) -> Vec<(usize, String, f32)> {
    let mut indexed: Vec<(usize, f32)> = probabilities.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

    indexed
        .iter()
        .take(k)
        .map(|&(idx, prob)| {
            let name = taxonomy.name(idx).unwrap_or("Unknown").to_string();
            (idx, name, prob)
        })
        .collect()
}

/// Full result of a prediction, including what the CLI prints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionReport {
    /// The wire-format diagnosis
    pub diagnosis: Diagnosis,

    /// Index of the winning class
    pub class_index: usize,

    /// Top-k predictions with their probabilities
    pub top_k: Vec<(usize, String, f32)>,

    /// Inference time in milliseconds
    pub inference_time_ms: f64,
}

impl PredictionReport {
    /// Pretty print the prediction for terminal output
    pub fn display(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "Prediction: {} - {} (class {})\n",
            self.diagnosis.plant_name, self.diagnosis.health_status, self.class_index
        ));
        output.push_str(&format!(
            "Confidence: {:.2}%\n",
            self.diagnosis.confidence * 100.0
        ));
        output.push_str(&format!(
            "Inference time: {:.2} ms\n",
            self.inference_time_ms
        ));
        output.push_str(&format!("{}\n", self.diagnosis.message));

        output.push_str("\nTop predictions:\n");
        for (i, (idx, name, prob)) in self.top_k.iter().enumerate() {
            output.push_str(&format!(
                "  {}. {} (class {}) - {:.2}%\n",
                i + 1,
                name,
                idx,
                prob * 100.0
            ));
        }

        output
    }
}
