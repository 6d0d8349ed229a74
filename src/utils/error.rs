//! Error Handling Module
//!
//! Defines custom error types for the leafcam library.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Main error type for leafcam operations
#[derive(Error, Debug)]
pub enum LeafcamError {
    /// Uploaded bytes are not a decodable image
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// Taxonomy entry is missing the plant/condition delimiter
    #[error("Malformed class label '{0}': missing '___' delimiter")]
    MalformedLabel(String),

    /// Taxonomy length does not match the model output size
    #[error("Taxonomy lists {taxonomy} classes but the model outputs {model}")]
    CardinalityMismatch { taxonomy: usize, model: usize },

    /// Error loading model weights
    #[error("Model error: {0}")]
    Model(String),

    /// Error loading or parsing the taxonomy file
    #[error("Taxonomy error: {0}")]
    Taxonomy(String),

    /// Error during inference or gradient computation
    #[error("Inference error: {0}")]
    Inference(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LeafcamError {
    /// Whether the failure was caused by the client's input rather than
    /// the deployment (model/taxonomy) itself.
    pub fn is_client_error(&self) -> bool {
        matches!(self, LeafcamError::Decode(_))
    }
}

/// Convenience Result type for leafcam operations
pub type Result<T> = std::result::Result<T, LeafcamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LeafcamError::MalformedLabel("Tomato".to_string());
        assert_eq!(
            format!("{}", err),
            "Malformed class label 'Tomato': missing '___' delimiter"
        );
    }

    #[test]
    fn test_cardinality_display() {
        let err = LeafcamError::CardinalityMismatch {
            taxonomy: 38,
            model: 39,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("38"));
        assert!(msg.contains("39"));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(!LeafcamError::Model("broken".to_string()).is_client_error());
        assert!(!LeafcamError::Inference("no gradient".to_string()).is_client_error());

        let decode = image::load_from_memory(b"definitely not an image")
            .map(|_| ())
            .map_err(LeafcamError::from)
            .unwrap_err();
        assert!(decode.is_client_error());
    }
}
