//! End-to-end training: split, scale, fit, evaluate, cross-validate.

use chrono::Utc;
use tracing::info;
use voxscreen_classifiers::{ArtifactMetadata, ClassifierArtifact, ForestArtifact, StandardScaler};
use voxscreen_core::Result;

use crate::dataset::Dataset;
use crate::evaluate::{classification_report, evaluate, EvaluationReport};
use crate::forest::{fit_forest, label_distribution, ForestParams};
use crate::split::{shuffle_split, stratified_kfold, stratified_split};

/// Training run settings
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub forest: ForestParams,
    /// Standardise features before the forest
    pub scale: bool,
    /// Held-out share of the rows
    pub test_size: f64,
    /// Keep class shares equal in train and test; needs two rows per class
    pub stratify: bool,
    /// Number of cross-validation folds, if any
    pub cv_folds: Option<usize>,
    /// Name recorded in the artifact
    pub name: String,
    /// Training data location recorded in the artifact
    pub source: Option<String>,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            forest: ForestParams::default(),
            scale: true,
            test_size: 0.2,
            stratify: true,
            cv_folds: Some(5),
            name: "random_forest".to_string(),
            source: None,
        }
    }
}

/// Everything a training run produces
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: ForestArtifact,
    pub report: EvaluationReport,
    pub cv_scores: Option<Vec<f64>>,
    pub n_train: usize,
    pub n_test: usize,
}

impl TrainingOutcome {
    pub fn cv_mean(&self) -> Option<f64> {
        self.cv_scores
            .as_ref()
            .filter(|s| !s.is_empty())
            .map(|s| s.iter().sum::<f64>() / s.len() as f64)
    }
}

/// Fit on a training split and evaluate on the rest.
pub fn train(dataset: &Dataset, options: &TrainOptions) -> Result<TrainingOutcome> {
    info!(
        rows = dataset.len(),
        features = dataset.n_features(),
        labels = ?label_distribution(&dataset.labels),
        "training dataset"
    );

    let (train_idx, test_idx) = if options.stratify {
        stratified_split(&dataset.labels, options.test_size, options.forest.seed)?
    } else {
        shuffle_split(dataset.len(), options.test_size, options.forest.seed)?
    };
    let (train_rows, train_labels) = dataset.subset(&train_idx);
    let (test_rows, test_labels) = dataset.subset(&test_idx);
    info!(train = train_idx.len(), test = test_idx.len(), "split dataset");

    let artifact = fit_artifact(&train_rows, &train_labels, &dataset.feature_names, options)?;
    let report = evaluate(&artifact, &test_rows, &test_labels, &artifact.classes)?;
    info!(accuracy = report.accuracy, roc_auc = ?report.roc_auc, "evaluated on test split");

    let cv_scores = match options.cv_folds {
        Some(folds) => Some(cross_validate(dataset, options, folds)?),
        None => None,
    };

    Ok(TrainingOutcome {
        artifact,
        report,
        cv_scores,
        n_train: train_idx.len(),
        n_test: test_idx.len(),
    })
}

/// Fit the optional scaler and the forest into an artifact.
pub fn fit_artifact(
    rows: &[Vec<f32>],
    labels: &[i64],
    feature_names: &[String],
    options: &TrainOptions,
) -> Result<ForestArtifact> {
    let scaler = if options.scale {
        Some(StandardScaler::fit(rows)?)
    } else {
        None
    };
    let scaled: Vec<Vec<f32>> = match &scaler {
        Some(scaler) => rows
            .iter()
            .map(|row| scaler.transform(row))
            .collect::<Result<_>>()?,
        None => rows.to_vec(),
    };

    let fitted = fit_forest(&scaled, labels, &options.forest)?;
    let metadata = ArtifactMetadata {
        name: options.name.clone(),
        trained_at: Some(Utc::now()),
        source: options.source.clone(),
        n_samples: rows.len(),
        feature_names: feature_names.to_vec(),
    };

    ForestArtifact::new(feature_names.len(), fitted.classes, scaler, fitted.forest, metadata)
}

/// Accuracy of a freshly fitted artifact on each stratified fold.
pub fn cross_validate(dataset: &Dataset, options: &TrainOptions, folds: usize) -> Result<Vec<f64>> {
    let mut scores = Vec::with_capacity(folds);
    for (fold, (train_idx, test_idx)) in stratified_kfold(&dataset.labels, folds, options.forest.seed)?
        .into_iter()
        .enumerate()
    {
        let (train_rows, train_labels) = dataset.subset(&train_idx);
        let (test_rows, test_labels) = dataset.subset(&test_idx);

        let artifact = fit_artifact(&train_rows, &train_labels, &dataset.feature_names, options)?;
        let predicted = test_rows
            .iter()
            .map(|row| artifact.predict(row))
            .collect::<Result<Vec<_>>>()?;
        let accuracy = classification_report(&test_labels, &predicted, &artifact.classes).accuracy;

        info!(fold, accuracy, "cross-validation fold");
        scores.push(accuracy);
    }
    Ok(scores)
}
