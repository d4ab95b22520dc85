//! Feature vector to prediction result.
//!
//! The adapter owns the process-wide model state. It never returns an error:
//! a missing model and every inference failure are reported through the
//! result's note.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};
use voxscreen_core::{Error, PredictionResult, Result};

use crate::artifact::ForestArtifact;
use crate::classifier::ClassifierArtifact;

/// Score reported when the artifact cannot produce probabilities
pub const NEUTRAL_SCORE: f32 = 0.5;

/// Classifier availability, decided once at start-up
#[derive(Clone)]
pub enum ModelState {
    Loaded(Arc<dyn ClassifierArtifact>),
    Unloaded { reason: String },
}

impl ModelState {
    /// Load the artifact at `path`; any failure leaves the model unloaded.
    pub fn load(path: &Path) -> Self {
        match ForestArtifact::load(path) {
            Ok(artifact) => {
                info!(path = %path.display(), "✓ Loaded model");
                Self::Loaded(Arc::new(artifact))
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "model could not be loaded, predictions are disabled");
                Self::Unloaded {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

impl std::fmt::Debug for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loaded(artifact) => f
                .debug_struct("Loaded")
                .field("name", &artifact.name())
                .field("width", &artifact.expected_input_width())
                .finish(),
            Self::Unloaded { reason } => {
                f.debug_struct("Unloaded").field("reason", reason).finish()
            }
        }
    }
}

/// Raw inference output before conversion to a result record
#[derive(Debug, Clone, PartialEq)]
pub struct Inference {
    /// Predicted label, 0 or 1
    pub label: u8,

    /// Unrounded class-1 confidence
    pub score: f32,

    /// Latency in microseconds
    pub latency_us: u64,
}

/// Runs feature vectors through the loaded classifier
#[derive(Debug, Clone)]
pub struct InferenceAdapter {
    state: ModelState,
}

impl InferenceAdapter {
    pub fn new(state: ModelState) -> Self {
        Self { state }
    }

    pub fn from_artifact(artifact: Arc<dyn ClassifierArtifact>) -> Self {
        Self::new(ModelState::Loaded(artifact))
    }

    pub fn unloaded(reason: impl Into<String>) -> Self {
        Self::new(ModelState::Unloaded {
            reason: reason.into(),
        })
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_loaded()
    }

    /// Predict a label and class-1 score for one feature vector.
    pub fn predict(&self, features: &[f32]) -> PredictionResult {
        let artifact = match &self.state {
            ModelState::Loaded(artifact) => artifact,
            ModelState::Unloaded { reason } => {
                debug!(reason = %reason, "prediction requested without a model");
                return PredictionResult::model_not_loaded();
            }
        };

        match infer(artifact.as_ref(), features) {
            Ok(inference) => {
                info!(
                    model = artifact.name(),
                    prediction = inference.label,
                    score = inference.score,
                    latency_us = inference.latency_us,
                    "prediction complete"
                );
                PredictionResult::success(inference.label, inference.score)
            }
            Err(e) => {
                error!(model = artifact.name(), error = %e, "prediction failed");
                PredictionResult::prediction_failed()
            }
        }
    }
}

/// Reconcile `features` to the artifact width and run the classifier.
pub fn infer(artifact: &dyn ClassifierArtifact, features: &[f32]) -> Result<Inference> {
    let start = Instant::now();

    let width = artifact.expected_input_width();
    if width == 0 {
        return Err(Error::inference("artifact reports an input width of zero"));
    }
    if features.len() != width {
        debug!(
            got = features.len(),
            expected = width,
            "reconciling feature width"
        );
    }
    let row = reconcile_width(features, width);

    let (raw_label, probabilities) = artifact.classify(&row)?;
    let label = u8::try_from(raw_label)
        .ok()
        .filter(|l| *l <= 1)
        .ok_or_else(|| Error::inference(format!("label {raw_label} is not binary")))?;
    let score = score_from_probabilities(probabilities.as_deref())?;

    Ok(Inference {
        label,
        score,
        latency_us: start.elapsed().as_micros() as u64,
    })
}

/// Right-pad with zeros or truncate so the result has exactly `target` values.
///
/// The overlapping prefix is copied unchanged.
pub fn reconcile_width(features: &[f32], target: usize) -> Vec<f32> {
    let mut row: Vec<f32> = features.iter().take(target).copied().collect();
    row.resize(target, 0.0);
    row
}

/// Class-1 confidence from a probability vector.
///
/// Two or more classes give the probability at index 1, a single class gives
/// its own probability and no probabilities give [`NEUTRAL_SCORE`].
pub fn score_from_probabilities(probabilities: Option<&[f32]>) -> Result<f32> {
    match probabilities {
        None => Ok(NEUTRAL_SCORE),
        Some([]) => Err(Error::inference("classifier returned no probabilities")),
        Some([only]) => Ok(*only),
        Some([_, second, ..]) => Ok(*second),
    }
}
