//! Stored recording to prediction result.
//!
//! Decoding, trimming, extraction and inference are CPU-bound; handlers run
//! [`PredictionPipeline::process_file`] on a blocking thread.

use std::path::Path;

use tracing::warn;
use voxscreen_classifiers::InferenceAdapter;
use voxscreen_core::{PredictionResult, Waveform};
use voxscreen_features::{AudioLoader, FeatureExtractor};

/// Message reported when nothing is left after silence trimming
pub const EMPTY_AUDIO: &str = "Empty or silent audio";

/// Loader, extractor and adapter wired together
#[derive(Debug, Clone)]
pub struct PredictionPipeline {
    loader: AudioLoader,
    extractor: FeatureExtractor,
    adapter: InferenceAdapter,
}

impl PredictionPipeline {
    pub fn new(loader: AudioLoader, extractor: FeatureExtractor, adapter: InferenceAdapter) -> Self {
        Self {
            loader,
            extractor,
            adapter,
        }
    }

    pub fn adapter(&self) -> &InferenceAdapter {
        &self.adapter
    }

    /// Decode, trim and classify a stored recording.
    ///
    /// Decoding problems and empty audio become processing-error results.
    pub fn process_file(&self, path: &Path) -> PredictionResult {
        match self.loader.load(path) {
            Ok(waveform) => self.process_waveform(&waveform),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "processing error");
                PredictionResult::processing_error(e)
            }
        }
    }

    /// Classify an already trimmed waveform.
    pub fn process_waveform(&self, waveform: &Waveform) -> PredictionResult {
        if waveform.is_empty() {
            warn!("processing error: {EMPTY_AUDIO}");
            return PredictionResult::processing_error(EMPTY_AUDIO);
        }

        let features = self.extractor.extract(waveform).into_vector();
        self.adapter.predict(features.as_slice())
    }
}
