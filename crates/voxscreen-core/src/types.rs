//! Core types for voxscreen

use serde::{Deserialize, Serialize};

/// Sample rate every waveform is converted to before feature extraction
pub const SAMPLE_RATE: u32 = 16_000;

/// Number of coefficients in a feature vector
pub const N_FEATURES: usize = 13;

/// Decoded mono audio at a known sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    /// Amplitude samples, nominally in [-1, 1]
    pub samples: Vec<f32>,

    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl Waveform {
    /// Create a waveform from samples at the given rate
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the waveform holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Time-averaged MFCC bands of one recording.
///
/// Always exactly [`N_FEATURES`] values long.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector([f32; N_FEATURES]);

impl FeatureVector {
    /// The all-zero vector used when extraction fails
    pub const fn zeros() -> Self {
        Self([0.0; N_FEATURES])
    }

    /// Wrap raw coefficient means
    pub const fn new(values: [f32; N_FEATURES]) -> Self {
        Self(values)
    }

    /// Borrow the values as a slice
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Copy the values into a `Vec`
    pub fn to_vec(&self) -> Vec<f32> {
        self.0.to_vec()
    }

    /// Whether every value is exactly zero
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&v| v == 0.0)
    }

    /// Vector length, always [`N_FEATURES`]
    pub const fn len(&self) -> usize {
        N_FEATURES
    }

    /// Always false; present for API symmetry with `len`
    pub const fn is_empty(&self) -> bool {
        false
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::zeros()
    }
}

impl AsRef<[f32]> for FeatureVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

impl From<[f32; N_FEATURES]> for FeatureVector {
    fn from(values: [f32; N_FEATURES]) -> Self {
        Self(values)
    }
}

/// Outcome of one prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Discrete label, 0 (healthy) or 1 (parkinson)
    pub prediction: u8,

    /// Class-1 confidence in [0, 1], rounded to two decimals
    pub score: f32,

    /// Human readable outcome
    pub note: String,
}

impl PredictionResult {
    pub const NOTE_MODEL_NOT_LOADED: &'static str = "Model not loaded";
    pub const NOTE_SUCCESS: &'static str = "Prediction successful";
    pub const NOTE_FAILED: &'static str = "Prediction failed";

    /// Successful prediction; the score is clamped and rounded
    pub fn success(prediction: u8, score: f32) -> Self {
        Self {
            prediction,
            score: round_score(score),
            note: Self::NOTE_SUCCESS.to_string(),
        }
    }

    /// Result returned while no classifier artifact is available
    pub fn model_not_loaded() -> Self {
        Self::neutral(Self::NOTE_MODEL_NOT_LOADED)
    }

    /// Result returned when inference raised an error
    pub fn prediction_failed() -> Self {
        Self::neutral(Self::NOTE_FAILED)
    }

    /// Result returned when the audio could not be processed upstream
    pub fn processing_error(message: impl std::fmt::Display) -> Self {
        Self::neutral(format!("Error during processing: {message}"))
    }

    fn neutral(note: impl Into<String>) -> Self {
        Self {
            prediction: 0,
            score: 0.0,
            note: note.into(),
        }
    }

    /// Whether this result came from a real model prediction
    pub fn is_success(&self) -> bool {
        self.note == Self::NOTE_SUCCESS
    }
}

/// Clamp a score to [0, 1] and round it to two decimals.
///
/// NaN maps to 0.
pub fn round_score(score: f32) -> f32 {
    if score.is_nan() {
        return 0.0;
    }
    let clamped = score.clamp(0.0, 1.0) as f64;
    ((clamped * 100.0).round() / 100.0) as f32
}
