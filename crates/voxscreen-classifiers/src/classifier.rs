//! Classifier trait and common helpers

use voxscreen_core::{Error, Result};

/// A pre-trained binary classifier over fixed-width feature rows.
///
/// Implementations are immutable once loaded and shared between requests.
pub trait ClassifierArtifact: Send + Sync {
    /// Get the classifier name
    fn name(&self) -> &str;

    /// Number of features every input row must have
    fn expected_input_width(&self) -> usize;

    /// Predict the class label of one row
    fn predict(&self, row: &[f32]) -> Result<i64>;

    /// Class probabilities of one row, ordered like the artifact's classes.
    ///
    /// `Ok(None)` means the artifact has no probability capability.
    fn predict_proba(&self, row: &[f32]) -> Result<Option<Vec<f32>>> {
        let _ = row;
        Ok(None)
    }

    /// Label and class probabilities of one row.
    ///
    /// The default runs [`predict`](Self::predict) and then
    /// [`predict_proba`](Self::predict_proba). Artifacts whose label is
    /// derived from their probabilities override this to evaluate the row
    /// once.
    fn classify(&self, row: &[f32]) -> Result<(i64, Option<Vec<f32>>)> {
        Ok((self.predict(row)?, self.predict_proba(row)?))
    }
}

/// Check that a row has the expected width and only finite values.
pub fn validate_row(row: &[f32], expected: usize) -> Result<()> {
    if row.len() != expected {
        return Err(Error::inference(format!(
            "expected {expected} features, got {}",
            row.len()
        )));
    }
    if let Some(idx) = row.iter().position(|v| !v.is_finite()) {
        return Err(Error::inference(format!(
            "feature {idx} is not a finite number"
        )));
    }
    Ok(())
}
