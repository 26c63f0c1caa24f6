//! LangSift Core
//!
//! Core types and error handling shared across LangSift components.
//!
//! This crate provides:
//! - The error taxonomy for registry, artifact, rebuild, and inference failures
//! - The wire-visible prediction result types
//! - The model-kind enumeration shared by training and serving

pub mod error;
pub mod types;

pub use error::{Error, RebuildReason, Result};
pub use types::{ModelKind, PredictionResult, TopPrediction};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, RebuildReason, Result};
    pub use crate::types::{ModelKind, PredictionResult, TopPrediction};
}
