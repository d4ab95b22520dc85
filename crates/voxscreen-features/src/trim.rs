//! Leading and trailing silence removal.
//!
//! Frame energy is measured on centred, zero-padded frames. A frame is
//! silent when its mean power is more than `top_db` below the loudest
//! frame. Everything before the first and after the last non-silent frame
//! is dropped.

use std::ops::Range;

/// Power floor used before taking logarithms
const AMIN: f64 = 1e-10;

/// Silence trimming parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimConfig {
    /// Threshold below the peak frame, in dB
    pub top_db: f64,
    /// Samples per analysis frame
    pub frame_length: usize,
    /// Samples between frame starts
    pub hop_length: usize,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            top_db: 60.0,
            frame_length: 2048,
            hop_length: 512,
        }
    }
}

/// Trim leading and trailing silence.
///
/// Returns the trimmed samples and the kept range of the input. Powers are
/// floored before comparison, so digital silence is its own peak and is
/// kept whole; only an empty buffer trims to empty.
pub fn trim_silence(samples: &[f32], config: &TrimConfig) -> (Vec<f32>, Range<usize>) {
    let range = nonsilent_range(samples, config);
    (samples[range.clone()].to_vec(), range)
}

/// Range of samples between the first and last non-silent frame.
pub fn nonsilent_range(samples: &[f32], config: &TrimConfig) -> Range<usize> {
    let hop = config.hop_length.max(1);
    let power = frame_power(samples, config.frame_length.max(1), hop);

    let peak = power.iter().copied().fold(AMIN, f64::max);
    let peak_db = 10.0 * peak.log10();
    let is_loud = |p: &f64| 10.0 * p.max(AMIN).log10() - peak_db > -config.top_db;

    let Some(first) = power.iter().position(is_loud) else {
        return 0..0;
    };
    let last = power.iter().rposition(is_loud).unwrap_or(first);

    let start = (first * hop).min(samples.len());
    let end = ((last + 1) * hop).min(samples.len());
    start..end.max(start)
}

/// Mean power of each centred frame.
///
/// The signal is padded with `frame_length / 2` zeros on both sides, giving
/// `1 + len / hop` frames.
fn frame_power(samples: &[f32], frame_length: usize, hop: usize) -> Vec<f64> {
    if samples.is_empty() {
        return Vec::new();
    }

    let pad = frame_length / 2;
    let n_frames = 1 + samples.len() / hop;
    let len = samples.len() as isize;

    (0..n_frames)
        .map(|frame| {
            let start = (frame * hop) as isize - pad as isize;
            let end = start + frame_length as isize;
            let lo = start.clamp(0, len) as usize;
            let hi = end.clamp(0, len) as usize;
            let energy: f64 = samples[lo..hi].iter().map(|&s| (s as f64) * (s as f64)).sum();
            energy / frame_length as f64
        })
        .collect()
}
