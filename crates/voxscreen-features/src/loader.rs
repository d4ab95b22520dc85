//! Recording to waveform conversion.

use std::path::{Path, PathBuf};

use tracing::debug;
use voxscreen_core::{Result, Waveform, SAMPLE_RATE};

use crate::decode::decode_file;
use crate::resample::resample;
use crate::trim::{trim_silence, TrimConfig};

/// Decodes, resamples and silence-trims recordings.
///
/// The returned waveform may be empty; rejecting empty audio is the
/// caller's decision.
#[derive(Debug, Clone)]
pub struct AudioLoader {
    ffmpeg: Option<PathBuf>,
    sample_rate: u32,
    trim: TrimConfig,
}

impl AudioLoader {
    pub fn new() -> Self {
        Self {
            ffmpeg: None,
            sample_rate: SAMPLE_RATE,
            trim: TrimConfig::default(),
        }
    }

    /// Use an ffmpeg binary for formats symphonia cannot decode
    pub fn with_ffmpeg(mut self, ffmpeg: Option<PathBuf>) -> Self {
        self.ffmpeg = ffmpeg;
        self
    }

    /// Load a recording as a trimmed mono waveform at the target rate.
    pub fn load(&self, path: &Path) -> Result<Waveform> {
        let decoded = decode_file(path, self.ffmpeg.as_deref(), self.sample_rate)?;
        self.prepare(&decoded.samples, decoded.sample_rate)
    }

    /// Resample and trim already decoded mono samples.
    pub fn prepare(&self, samples: &[f32], sample_rate: u32) -> Result<Waveform> {
        let resampled = resample(samples, sample_rate, self.sample_rate)?;
        let (trimmed, range) = trim_silence(&resampled, &self.trim);

        debug!(
            decoded = samples.len(),
            resampled = resampled.len(),
            kept_start = range.start,
            kept_end = range.end,
            "prepared waveform"
        );

        Ok(Waveform::new(trimmed, self.sample_rate))
    }
}

impl Default for AudioLoader {
    fn default() -> Self {
        Self::new()
    }
}
