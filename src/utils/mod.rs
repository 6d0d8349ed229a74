//! Utility Modules
//!
//! Shared error types and logging setup used across the crate.

pub mod error;
pub mod logging;

pub use error::{LeafcamError, Result};
pub use logging::LogConfig;
