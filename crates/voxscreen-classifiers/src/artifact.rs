//! Classifier artifact files.
//!
//! An artifact is a single JSON document holding the forest, the optional
//! scaler fitted on the training rows, the class labels, and provenance
//! metadata. The trainer writes it and the server loads it once at start-up.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use voxscreen_core::{Error, Result};

use crate::classifier::{validate_row, ClassifierArtifact};
use crate::forest::{argmax, RandomForest};
use crate::scaler::StandardScaler;

/// Artifact format version written by this crate
pub const FORMAT_VERSION: u32 = 1;

const DEFAULT_NAME: &str = "random_forest";

/// Where an artifact came from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Model name/identifier
    #[serde(default)]
    pub name: String,

    /// When training finished
    #[serde(default)]
    pub trained_at: Option<DateTime<Utc>>,

    /// Training data location
    #[serde(default)]
    pub source: Option<String>,

    /// Number of training rows
    #[serde(default)]
    pub n_samples: usize,

    /// Input column names, in feature order
    #[serde(default)]
    pub feature_names: Vec<String>,
}

/// Random forest classifier with optional input standardisation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestArtifact {
    pub format_version: u32,
    pub n_features_in: usize,
    pub classes: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler: Option<StandardScaler>,
    pub forest: RandomForest,
    #[serde(default)]
    pub metadata: ArtifactMetadata,
}

impl ForestArtifact {
    /// Assemble and validate an artifact
    pub fn new(
        n_features_in: usize,
        classes: Vec<i64>,
        scaler: Option<StandardScaler>,
        forest: RandomForest,
        metadata: ArtifactMetadata,
    ) -> Result<Self> {
        let artifact = Self {
            format_version: FORMAT_VERSION,
            n_features_in,
            classes,
            scaler,
            forest,
            metadata,
        };
        artifact.validate()?;
        Ok(artifact)
    }

    /// Load an artifact from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            Error::model(format!("cannot read artifact {}: {e}", path.display()))
        })?;
        let artifact = Self::from_json(&json)
            .map_err(|e| Error::model(format!("{}: {e}", path.display())))?;

        info!(
            path = %path.display(),
            trees = artifact.forest.n_estimators(),
            features = artifact.n_features_in,
            scaled = artifact.scaler.is_some(),
            "loaded classifier artifact"
        );
        Ok(artifact)
    }

    /// Parse and validate an artifact document
    pub fn from_json(json: &str) -> Result<Self> {
        let artifact: Self = serde_json::from_str(json)
            .map_err(|e| Error::model(format!("invalid artifact document: {e}")))?;
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Write the artifact, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        debug!(path = %path.display(), "saved classifier artifact");
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.format_version != FORMAT_VERSION {
            return Err(Error::model(format!(
                "unsupported artifact format version {} (expected {FORMAT_VERSION})",
                self.format_version
            )));
        }
        if self.n_features_in == 0 {
            return Err(Error::model("artifact expects zero input features"));
        }
        if self.classes.is_empty() {
            return Err(Error::model("artifact has no classes"));
        }
        for (i, class) in self.classes.iter().enumerate() {
            if self.classes[..i].contains(class) {
                return Err(Error::model(format!("duplicate class label {class}")));
            }
        }
        if let Some(scaler) = &self.scaler {
            scaler.validate(self.n_features_in)?;
        }
        self.forest.validate(self.n_features_in, self.classes.len())
    }

    fn prepare(&self, row: &[f32]) -> Result<Vec<f32>> {
        validate_row(row, self.n_features_in)?;
        match &self.scaler {
            Some(scaler) => scaler.transform(row),
            None => Ok(row.to_vec()),
        }
    }

    fn probabilities(&self, row: &[f32]) -> Result<Vec<f32>> {
        let row = self.prepare(row)?;
        self.forest.predict_proba(&row, self.classes.len())
    }

    fn label_of(&self, proba: &[f32]) -> Result<i64> {
        argmax(proba)
            .and_then(|idx| self.classes.get(idx).copied())
            .ok_or_else(|| Error::inference("forest produced no class probabilities"))
    }
}

impl ClassifierArtifact for ForestArtifact {
    fn name(&self) -> &str {
        if self.metadata.name.is_empty() {
            DEFAULT_NAME
        } else {
            &self.metadata.name
        }
    }

    fn expected_input_width(&self) -> usize {
        self.n_features_in
    }

    fn predict(&self, row: &[f32]) -> Result<i64> {
        self.label_of(&self.probabilities(row)?)
    }

    fn predict_proba(&self, row: &[f32]) -> Result<Option<Vec<f32>>> {
        self.probabilities(row).map(Some)
    }

    fn classify(&self, row: &[f32]) -> Result<(i64, Option<Vec<f32>>)> {
        let proba = self.probabilities(row)?;
        Ok((self.label_of(&proba)?, Some(proba)))
    }
}
