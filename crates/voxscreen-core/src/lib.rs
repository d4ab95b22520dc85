//! voxscreen Core
//!
//! Core types and utilities shared across voxscreen components.
//!
//! This crate provides:
//! - The [`Waveform`] handed to feature extraction
//! - The fixed-width [`FeatureVector`] produced by it
//! - The [`PredictionResult`] record returned to callers
//! - Error types and result handling

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{FeatureVector, PredictionResult, Waveform, N_FEATURES, SAMPLE_RATE};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{FeatureVector, PredictionResult, Waveform, N_FEATURES, SAMPLE_RATE};
}
