//! Class Taxonomy
//!
//! The classifier's output classes follow the PlantVillage `"Plant___Condition"`
//! naming scheme, e.g. `"Tomato___Early_blight"` or `"Apple___healthy"`. This
//! module owns the ordered list of class names (whose order defines the model's
//! output layout) and the parser that splits a raw name into its two fields.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::error::{LeafcamError, Result};

/// Delimiter between the plant and condition segments of a class name
pub const LABEL_DELIMITER: &str = "___";

/// Class names for the PlantVillage dataset (38 classes)
/// Format: "Plant___Disease" or "Plant___healthy"
pub const DEFAULT_CLASS_NAMES: [&str; 38] = [
    "Apple___Apple_scab",
    "Apple___Black_rot",
    "Apple___Cedar_apple_rust",
    "Apple___healthy",
    "Blueberry___healthy",
    "Cherry_(including_sour)___Powdery_mildew",
    "Cherry_(including_sour)___healthy",
    "Corn_(maize)___Cercospora_leaf_spot Gray_leaf_spot",
    "Corn_(maize)___Common_rust_",
    "Corn_(maize)___Northern_Leaf_Blight",
    "Corn_(maize)___healthy",
    "Grape___Black_rot",
    "Grape___Esca_(Black_Measles)",
    "Grape___Leaf_blight_(Isariopsis_Leaf_Spot)",
    "Grape___healthy",
    "Orange___Haunglongbing_(Citrus_greening)",
    "Peach___Bacterial_spot",
    "Peach___healthy",
    "Pepper,_bell___Bacterial_spot",
    "Pepper,_bell___healthy",
    "Potato___Early_blight",
    "Potato___Late_blight",
    "Potato___healthy",
    "Raspberry___healthy",
    "Soybean___healthy",
    "Squash___Powdery_mildew",
    "Strawberry___Leaf_scorch",
    "Strawberry___healthy",
    "Tomato___Bacterial_spot",
    "Tomato___Early_blight",
    "Tomato___Late_blight",
    "Tomato___Leaf_Mold",
    "Tomato___Septoria_leaf_spot",
    "Tomato___Spider_mites Two-spotted_spider_mite",
    "Tomato___Target_Spot",
    "Tomato___Tomato_Yellow_Leaf_Curl_Virus",
    "Tomato___Tomato_mosaic_virus",
    "Tomato___healthy",
];

/// A class name split into its two taxonomy fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLabel {
    /// Plant species, e.g. "Tomato"
    pub plant: String,
    /// Health condition, e.g. "Early_blight" or "healthy"
    pub condition: String,
}

impl ClassLabel {
    /// Parse a raw class name of the form `"Plant___Condition"`.
    ///
    /// Splits at the first occurrence of `"___"`; everything after the
    /// delimiter belongs to the condition, so names like
    /// `"Corn_(maize)___Cercospora_leaf_spot Gray_leaf_spot"` parse cleanly.
    pub fn parse(raw: &str) -> Result<Self> {
        let (plant, condition) = raw
            .split_once(LABEL_DELIMITER)
            .ok_or_else(|| LeafcamError::MalformedLabel(raw.to_string()))?;

        Ok(Self {
            plant: plant.to_string(),
            condition: condition.to_string(),
        })
    }

    /// Whether this label represents a healthy plant rather than a disease
    pub fn is_healthy(&self) -> bool {
        self.condition == "healthy"
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.plant, LABEL_DELIMITER, self.condition)
    }
}

/// Ordered list of class names defining the model's output layout.
///
/// Index `i` of the taxonomy corresponds to output neuron `i` of the
/// classifier head, so the list length must match the model's class count
/// (checked once at startup via [`Taxonomy::check_cardinality`]).
#[derive(Debug, Clone)]
pub struct Taxonomy {
    names: Vec<String>,
}

impl Taxonomy {
    /// Build a taxonomy from an ordered list of class names
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// The built-in PlantVillage class list
    pub fn default_classes() -> Self {
        Self::new(DEFAULT_CLASS_NAMES.iter().map(|s| s.to_string()).collect())
    }

    /// Load a taxonomy from a JSON file containing an array of class names,
    /// e.g. `["Apple___Apple_scab", "Apple___Black_rot", ...]`
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let names: Vec<String> = serde_json::from_str(&content).map_err(|e| {
            LeafcamError::Taxonomy(format!("invalid class list in {}: {}", path.display(), e))
        })?;

        if names.is_empty() {
            return Err(LeafcamError::Taxonomy(format!(
                "class list in {} is empty",
                path.display()
            )));
        }

        Ok(Self::new(names))
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the taxonomy has no classes
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Raw class name at the given index
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(|s| s.as_str())
    }

    /// Parsed label at the given index.
    ///
    /// Fails if the index is out of range or the stored name lacks the
    /// `"___"` delimiter.
    pub fn label(&self, index: usize) -> Result<ClassLabel> {
        let name = self.name(index).ok_or_else(|| {
            LeafcamError::Taxonomy(format!(
                "class index {} out of range for {} classes",
                index,
                self.len()
            ))
        })?;
        ClassLabel::parse(name)
    }

    /// Iterate over the raw class names in index order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|s| s.as_str())
    }

    /// Parse every stored name, failing on the first malformed entry.
    ///
    /// Run once at startup so a bad class list can never reach request
    /// handling; the per-request parse in [`Taxonomy::label`] stays as a
    /// residual guard.
    pub fn validate_labels(&self) -> Result<()> {
        for name in self.iter() {
            ClassLabel::parse(name)?;
        }
        Ok(())
    }

    /// Verify the taxonomy size matches the model's output class count.
    ///
    /// A mismatch means predicted indices would be looked up in the wrong
    /// table, so the caller is expected to treat this as fatal at startup.
    pub fn check_cardinality(&self, model_classes: usize) -> Result<()> {
        if self.len() != model_classes {
            return Err(LeafcamError::CardinalityMismatch {
                taxonomy: self.len(),
                model: model_classes,
            });
        }
        Ok(())
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::default_classes()
    }
}
