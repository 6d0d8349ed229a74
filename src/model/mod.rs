//! Model module for the CNN architecture using the Burn framework
//!
//! This module provides:
//! - The classifier architecture, split into feature-extractor and head sub-graphs
//! - Model configuration and hyperparameters
//! - Weight loading via Burn's `CompactRecorder` (`.mpk` artifacts)

pub mod cnn;

// Re-export main types for convenience
pub use cnn::{ConvBlock, LeafClassifier, LeafClassifierConfig};

/// Default number of classes for PlantVillage
pub const DEFAULT_NUM_CLASSES: usize = 38;
