//! Mock classifier artifacts for testing
//!
//! Provides configurable implementations of the ClassifierArtifact trait
//! for exercising width reconciliation, score selection, and the adapter's
//! failure handling.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use voxscreen_classifiers::{ClassifierArtifact, InferenceAdapter};
use voxscreen_core::{Error, Result};

/// A configurable mock artifact that records the rows it receives
pub struct MockArtifact {
    name: String,
    width: usize,
    label: i64,
    probabilities: Option<Vec<f32>>,
    seen: Mutex<Vec<Vec<f32>>>,
    call_count: AtomicU32,
}

impl MockArtifact {
    /// Create a mock expecting `width` features
    pub fn new(name: &str, width: usize) -> Self {
        Self {
            name: name.to_string(),
            width,
            label: 0,
            probabilities: Some(vec![0.5, 0.5]),
            seen: Mutex::new(Vec::new()),
            call_count: AtomicU32::new(0),
        }
    }

    /// Set the label `predict` returns
    pub fn with_label(mut self, label: i64) -> Self {
        self.label = label;
        self
    }

    /// Set the probabilities `predict_proba` returns
    pub fn with_probabilities(mut self, probabilities: &[f32]) -> Self {
        self.probabilities = Some(probabilities.to_vec());
        self
    }

    /// Remove the probability capability
    pub fn without_probabilities(mut self) -> Self {
        self.probabilities = None;
        self
    }

    /// Rows passed to `predict`, in call order
    pub fn seen_rows(&self) -> Vec<Vec<f32>> {
        self.seen.lock().unwrap().clone()
    }

    /// Get the number of times predict was called
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl ClassifierArtifact for MockArtifact {
    fn name(&self) -> &str {
        &self.name
    }

    fn expected_input_width(&self) -> usize {
        self.width
    }

    fn predict(&self, row: &[f32]) -> Result<i64> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.seen.lock().unwrap().push(row.to_vec());
        Ok(self.label)
    }

    fn predict_proba(&self, _row: &[f32]) -> Result<Option<Vec<f32>>> {
        Ok(self.probabilities.clone())
    }
}

/// An artifact that always fails - for testing error paths
pub struct FailingArtifact {
    error_message: String,
}

impl FailingArtifact {
    pub fn new() -> Self {
        Self {
            error_message: "Simulated classifier failure".to_string(),
        }
    }

    /// Set a custom error message
    pub fn with_error(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }
}

impl ClassifierArtifact for FailingArtifact {
    fn name(&self) -> &str {
        "failing"
    }

    fn expected_input_width(&self) -> usize {
        13
    }

    fn predict(&self, _row: &[f32]) -> Result<i64> {
        Err(Error::inference(&self.error_message))
    }
}

/// Answers only through `classify`; the separate calls fail
pub struct ClassifyOnlyArtifact {
    classify_count: AtomicU32,
}

impl ClassifyOnlyArtifact {
    pub fn new() -> Self {
        Self {
            classify_count: AtomicU32::new(0),
        }
    }

    pub fn classify_count(&self) -> u32 {
        self.classify_count.load(Ordering::Relaxed)
    }
}

impl ClassifierArtifact for ClassifyOnlyArtifact {
    fn name(&self) -> &str {
        "classify-only"
    }

    fn expected_input_width(&self) -> usize {
        13
    }

    fn predict(&self, _row: &[f32]) -> Result<i64> {
        Err(Error::inference("predict should not be called"))
    }

    fn predict_proba(&self, _row: &[f32]) -> Result<Option<Vec<f32>>> {
        Err(Error::inference("predict_proba should not be called"))
    }

    fn classify(&self, _row: &[f32]) -> Result<(i64, Option<Vec<f32>>)> {
        self.classify_count.fetch_add(1, Ordering::Relaxed);
        Ok((1, Some(vec![0.1, 0.9])))
    }
}

fn adapter_for(artifact: Arc<MockArtifact>) -> InferenceAdapter {
    InferenceAdapter::from_artifact(artifact)
}

fn ramp(len: usize) -> Vec<f32> {
    (1..=len).map(|i| i as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxscreen_core::PredictionResult;

    #[test]
    fn test_two_class_probabilities_use_class_one() {
        let mock = Arc::new(
            MockArtifact::new("two-class", 13)
                .with_label(1)
                .with_probabilities(&[0.127, 0.873]),
        );
        let result = adapter_for(mock.clone()).predict(&ramp(13));

        assert_eq!(result.prediction, 1);
        assert_eq!(result.score, 0.87);
        assert_eq!(result.note, "Prediction successful");
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn test_pads_narrow_vector_for_wide_artifact() {
        let mock = Arc::new(
            MockArtifact::new("wide", 26)
                .with_label(0)
                .with_probabilities(&[0.6, 0.4]),
        );
        let features = ramp(13);
        let result = adapter_for(mock.clone()).predict(&features);

        let seen = mock.seen_rows();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].len(), 26);
        assert_eq!(&seen[0][..13], features.as_slice());
        assert_eq!(&seen[0][13..], &[0.0; 13]);

        assert_eq!(result.prediction, 0);
        assert_eq!(result.score, 0.4);
        assert_eq!(result.note, "Prediction successful");
    }

    #[test]
    fn test_truncates_wide_vector_for_narrow_artifact() {
        let mock = Arc::new(MockArtifact::new("narrow", 10));
        let features = ramp(13);
        adapter_for(mock.clone()).predict(&features);

        assert_eq!(mock.seen_rows()[0], features[..10].to_vec());
    }

    #[test]
    fn test_exact_width_is_passed_through() {
        let mock = Arc::new(MockArtifact::new("exact", 13));
        let features = ramp(13);
        adapter_for(mock.clone()).predict(&features);

        assert_eq!(mock.seen_rows()[0], features);
    }

    #[test]
    fn test_missing_probabilities_give_neutral_score() {
        let mock = Arc::new(MockArtifact::new("hard", 13).with_label(1).without_probabilities());
        let result = adapter_for(mock).predict(&ramp(13));

        assert_eq!(result.prediction, 1);
        assert_eq!(result.score, 0.5);
        assert!(result.is_success());
    }

    #[test]
    fn test_single_class_probability_is_the_score() {
        let mock = Arc::new(MockArtifact::new("single", 13).with_probabilities(&[0.333]));
        let result = adapter_for(mock).predict(&ramp(13));

        assert_eq!(result.score, 0.33);
    }

    #[test]
    fn test_non_binary_label_fails() {
        let mock = Arc::new(MockArtifact::new("multi", 13).with_label(2));
        let result = adapter_for(mock).predict(&ramp(13));

        assert_eq!(result, PredictionResult::prediction_failed());
    }

    #[test]
    fn test_failing_artifact_becomes_prediction_failed() {
        let adapter =
            InferenceAdapter::from_artifact(Arc::new(FailingArtifact::new().with_error("boom")));
        let result = adapter.predict(&ramp(13));

        assert_eq!(result.prediction, 0);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.note, "Prediction failed");
    }

    #[test]
    fn test_adapter_evaluates_each_row_once() {
        let artifact = Arc::new(ClassifyOnlyArtifact::new());
        let adapter = InferenceAdapter::from_artifact(artifact.clone());
        let result = adapter.predict(&ramp(13));

        assert_eq!(result.prediction, 1);
        assert_eq!(result.score, 0.9);
        assert_eq!(result.note, "Prediction successful");
        assert_eq!(artifact.classify_count(), 1);
    }

    #[test]
    fn test_unloaded_adapter_never_calls_artifact() {
        let adapter = InferenceAdapter::unloaded("no artifact");
        for _ in 0..3 {
            let result = adapter.predict(&ramp(13));
            assert_eq!(result.note, "Model not loaded");
            assert_eq!(result.score, 0.0);
        }
    }

    #[test]
    fn test_out_of_range_probability_is_clamped() {
        let mock = Arc::new(MockArtifact::new("odd", 13).with_probabilities(&[0.0, 1.7]));
        let result = adapter_for(mock).predict(&ramp(13));

        assert_eq!(result.score, 1.0);
    }
}
