//! Loading artifact files into the adapter

use std::fs;

use voxscreen_classifiers::{ClassifierArtifact, ForestArtifact, InferenceAdapter, ModelState};

/// One stump on the first coefficient: c0 <= -200 is healthy
const STUMP_ARTIFACT: &str = r#"{
    "format_version": 1,
    "n_features_in": 13,
    "classes": [0, 1],
    "forest": {
        "trees": [
            {
                "nodes": [
                    { "type": "split", "feature": 0, "threshold": -200.0, "left": 1, "right": 2 },
                    { "type": "leaf", "counts": [9.0, 1.0] },
                    { "type": "leaf", "counts": [1.0, 3.0] }
                ]
            }
        ]
    },
    "metadata": { "name": "stump", "source": "hand-written" }
}"#;

fn features(c0: f32) -> Vec<f32> {
    let mut row = vec![0.0; 13];
    row[0] = c0;
    row
}

#[test]
fn test_loaded_artifact_predicts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    fs::write(&path, STUMP_ARTIFACT).unwrap();

    let state = ModelState::load(&path);
    assert!(state.is_loaded());
    let adapter = InferenceAdapter::new(state);

    let healthy = adapter.predict(&features(-350.0));
    assert_eq!(healthy.prediction, 0);
    assert_eq!(healthy.score, 0.1);
    assert_eq!(healthy.note, "Prediction successful");

    let parkinson = adapter.predict(&features(-120.0));
    assert_eq!(parkinson.prediction, 1);
    assert_eq!(parkinson.score, 0.75);
}

#[test]
fn test_short_vector_is_padded_for_loaded_artifact() {
    let artifact = ForestArtifact::from_json(STUMP_ARTIFACT).unwrap();
    assert_eq!(artifact.expected_input_width(), 13);

    let adapter = InferenceAdapter::from_artifact(std::sync::Arc::new(artifact));
    let result = adapter.predict(&[-120.0, 1.0]);
    assert_eq!(result.prediction, 1);
}

#[test]
fn test_corrupt_artifact_leaves_model_unloaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    fs::write(&path, "not json").unwrap();

    let adapter = InferenceAdapter::new(ModelState::load(&path));
    assert!(!adapter.is_loaded());

    let result = adapter.predict(&features(0.0));
    assert_eq!(result.prediction, 0);
    assert_eq!(result.score, 0.0);
    assert_eq!(result.note, "Model not loaded");
}

#[test]
fn test_non_finite_features_fail_prediction() {
    let artifact = ForestArtifact::from_json(STUMP_ARTIFACT).unwrap();
    let adapter = InferenceAdapter::from_artifact(std::sync::Arc::new(artifact));

    let result = adapter.predict(&features(f32::NAN));
    assert_eq!(result.note, "Prediction failed");
}
