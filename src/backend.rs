//! Unified Backend Selection
//!
//! This module provides automatic backend selection based on compile-time features.
//! It automatically chooses:
//! - CUDA backend when compiled with the `cuda` feature
//! - NdArray backend on CPU-only systems
//!
//! The backend is always wrapped in `Autodiff` because class-activation mapping
//! needs gradients of the class score with respect to the convolutional features,
//! even though the model itself is only ever used for inference.

use burn::backend::Autodiff;
use burn::tensor::backend::Backend;

#[cfg(feature = "cuda")]
use burn_cuda::Cuda;

#[cfg(not(feature = "cuda"))]
use burn_ndarray::NdArray;

// Type alias for the serving backend based on compile-time features
#[cfg(feature = "cuda")]
pub type ServingBackend = Autodiff<Cuda>;

#[cfg(not(feature = "cuda"))]
pub type ServingBackend = Autodiff<NdArray>;

/// Get a human-readable name for the current backend
pub fn backend_name() -> &'static str {
    #[cfg(feature = "cuda")]
    {
        "CUDA"
    }

    #[cfg(not(feature = "cuda"))]
    {
        "NdArray (CPU)"
    }
}

/// Get the default device for the current backend
pub fn default_device() -> <ServingBackend as Backend>::Device {
    <ServingBackend as Backend>::Device::default()
}

/// Check if GPU acceleration is available
pub fn has_gpu() -> bool {
    #[cfg(feature = "cuda")]
    {
        true
    }

    #[cfg(not(feature = "cuda"))]
    {
        false
    }
}
