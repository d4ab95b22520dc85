//! Labelled audio folders as a training dataset.
//!
//! The root holds one sub-folder per class: `healthy/` (label 0) and
//! `parkinson/` (label 1), each containing `.wav` files.

use std::path::Path;

use tracing::{info, warn};
use voxscreen_core::{FeatureVector, Result};
use voxscreen_features::{AudioLoader, FeatureExtractor};

use crate::builder::{list_files, mfcc_feature_names};
use crate::dataset::Dataset;

/// Sub-folder name and label of each class
pub const CLASS_FOLDERS: [(&str, i64); 2] = [("healthy", 0), ("parkinson", 1)];

/// Features of one file; unreadable files become the zero vector.
pub fn file_features(path: &Path, loader: &AudioLoader, extractor: &FeatureExtractor) -> FeatureVector {
    match loader.load(path) {
        Ok(waveform) => extractor.extract(&waveform).into_vector(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "error processing file, using zero features");
            FeatureVector::zeros()
        }
    }
}

/// Load every `.wav` under the class folders of `root`.
pub fn load_labelled_folders(
    root: &Path,
    loader: &AudioLoader,
    extractor: &FeatureExtractor,
) -> Result<Dataset> {
    let mut rows = Vec::new();
    let mut labels = Vec::new();

    for (folder, label) in CLASS_FOLDERS {
        let files = list_files(&root.join(folder), "wav")?;
        info!(folder, files = files.len(), "loading samples");
        for path in files {
            rows.push(file_features(&path, loader, extractor).to_vec());
            labels.push(label);
        }
    }

    let dataset = Dataset::new(mfcc_feature_names(), rows, labels)?;
    let (healthy, parkinson) = dataset.class_counts();
    info!(samples = dataset.len(), healthy, parkinson, "loaded audio dataset");
    Ok(dataset)
}
