//! Recordings folder to MFCC dataset CSV.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use voxscreen_core::{Error, Result, N_FEATURES};
use voxscreen_features::{AudioLoader, FeatureExtractor};

use crate::table::write_csv;

/// Outcome of a dataset build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    /// Rows written
    pub written: usize,
    /// Recordings that were empty after trimming
    pub skipped_empty: usize,
    /// Recordings that could not be decoded
    pub failed: usize,
}

/// `mfcc_1 .. mfcc_13`
pub fn mfcc_feature_names() -> Vec<String> {
    (1..=N_FEATURES).map(|i| format!("mfcc_{i}")).collect()
}

/// Files in `dir` with the given extension (case-insensitive), sorted by name
pub fn list_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .map_err(|e| Error::dataset(format!("cannot read {}: {e}", dir.display())))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Extract MFCC means from every `.webm` recording in `uploads` and write
/// them with a fixed `label` to `output`.
///
/// Recordings that decode to no samples are skipped; recordings that fail
/// to decode are logged and skipped.
pub fn build_dataset(
    uploads: &Path,
    output: &Path,
    label: i64,
    loader: &AudioLoader,
    extractor: &FeatureExtractor,
) -> Result<BuildSummary> {
    let mut summary = BuildSummary::default();
    let mut rows = Vec::new();

    for path in list_files(uploads, "webm")? {
        let waveform = match loader.load(&path) {
            Ok(w) => w,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable recording");
                summary.failed += 1;
                continue;
            }
        };
        if waveform.is_empty() {
            debug!(path = %path.display(), "skipping empty recording");
            summary.skipped_empty += 1;
            continue;
        }

        let features = extractor.extract(&waveform).into_vector();
        let mut row: Vec<f64> = features.as_slice().iter().map(|&v| v as f64).collect();
        row.push(label as f64);
        rows.push(row);
    }

    let mut headers = mfcc_feature_names();
    headers.push("label".to_string());
    write_csv(output, &headers, &rows)?;

    summary.written = rows.len();
    info!(
        written = summary.written,
        skipped_empty = summary.skipped_empty,
        failed = summary.failed,
        output = %output.display(),
        "saved MFCC dataset"
    );
    Ok(summary)
}
