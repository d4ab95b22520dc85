//! MFCC feature extraction.
//!
//! The extractor computes a centred power STFT, projects it onto a
//! Slaney-scale mel filterbank, converts to decibels, applies an
//! orthonormal DCT-II and averages every coefficient over time. The result
//! is always a 13-value [`FeatureVector`]: when anything goes wrong the
//! extractor reports [`Extraction::Fallback`], which converts to zeros.

use std::f64::consts::PI;
use std::sync::Arc;

use ndarray::{Array1, Array2, Axis};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use tracing::warn;
use voxscreen_core::{Error, FeatureVector, Result, Waveform, N_FEATURES, SAMPLE_RATE};

/// Power floor used before taking logarithms
const AMIN: f64 = 1e-10;

/// MFCC analysis parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MfccConfig {
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    pub fmin: f64,
    /// Upper filterbank edge; Nyquist when `None`
    pub fmax: Option<f64>,
    /// Dynamic range kept below the loudest bin, in dB
    pub top_db: Option<f64>,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            fmin: 0.0,
            fmax: None,
            top_db: Some(80.0),
        }
    }
}

/// Outcome of one extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// Coefficient means computed from the waveform
    Computed(FeatureVector),
    /// Extraction failed; stands in for the zero vector
    Fallback { reason: String },
}

impl Extraction {
    /// The feature vector, zeros for a fallback
    pub fn into_vector(self) -> FeatureVector {
        match self {
            Self::Computed(vector) => vector,
            Self::Fallback { .. } => FeatureVector::zeros(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Turns waveforms into 13 MFCC means.
///
/// Holds the FFT plan, window and a filterbank for its configured sample
/// rate, so one extractor can be shared across requests.
#[derive(Clone)]
pub struct FeatureExtractor {
    config: MfccConfig,
    sample_rate: u32,
    window: Vec<f64>,
    fft: Arc<dyn Fft<f64>>,
    mel_basis: Array2<f64>,
    dct_basis: Array2<f64>,
}

impl FeatureExtractor {
    /// Extractor for 16 kHz audio with the default parameters
    pub fn new() -> Self {
        Self::with_config(MfccConfig::default(), SAMPLE_RATE)
    }

    pub fn with_config(config: MfccConfig, sample_rate: u32) -> Self {
        let n_fft = config.n_fft.max(1);
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(n_fft);

        Self {
            window: hann_window(n_fft),
            mel_basis: mel_filterbank(&config, sample_rate),
            dct_basis: dct_basis(N_FEATURES, config.n_mels),
            fft,
            sample_rate,
            config,
        }
    }

    pub fn config(&self) -> &MfccConfig {
        &self.config
    }

    /// Extract the feature vector of a waveform.
    ///
    /// Never fails: errors are reported as [`Extraction::Fallback`].
    pub fn extract(&self, waveform: &Waveform) -> Extraction {
        match self.try_extract(waveform) {
            Ok(vector) => Extraction::Computed(vector),
            Err(e) => {
                warn!("feature extraction failed: {}", e);
                Extraction::Fallback {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn try_extract(&self, waveform: &Waveform) -> Result<FeatureVector> {
        if waveform.sample_rate == 0 {
            return Err(Error::features("sample rate must be positive"));
        }
        if waveform.is_empty() {
            return Err(Error::features("audio buffer is empty"));
        }
        if waveform.samples.iter().any(|s| !s.is_finite()) {
            return Err(Error::features("audio buffer is not finite everywhere"));
        }
        if self.config.n_fft == 0 || self.config.hop_length == 0 || self.config.n_mels == 0 {
            return Err(Error::features("invalid MFCC configuration"));
        }

        let power = self.power_spectrogram(&waveform.samples);

        let mel = if waveform.sample_rate == self.sample_rate {
            self.mel_basis.dot(&power)
        } else {
            mel_filterbank(&self.config, waveform.sample_rate).dot(&power)
        };

        let log_mel = power_to_db(mel, self.config.top_db);
        let mfcc = self.dct_basis.dot(&log_mel);

        let means: Array1<f64> = mfcc
            .mean_axis(Axis(1))
            .ok_or_else(|| Error::features("spectrogram has no frames"))?;

        let mut values = [0.0f32; N_FEATURES];
        for (slot, &mean) in values.iter_mut().zip(means.iter()) {
            if !mean.is_finite() {
                return Err(Error::features("coefficient mean is not finite"));
            }
            *slot = mean as f32;
        }

        Ok(FeatureVector::new(values))
    }

    /// Centred power STFT, shape `(n_fft / 2 + 1, frames)`.
    ///
    /// Frames are zero padded by `n_fft / 2` on both sides, giving
    /// `1 + len / hop` frames.
    fn power_spectrogram(&self, samples: &[f32]) -> Array2<f64> {
        let n_fft = self.config.n_fft;
        let hop = self.config.hop_length;
        let pad = (n_fft / 2) as isize;
        let n_frames = 1 + samples.len() / hop;
        let freq_bins = n_fft / 2 + 1;
        let len = samples.len() as isize;

        let mut spectrogram = Array2::<f64>::zeros((freq_bins, n_frames));
        let mut frame = vec![Complex::new(0.0, 0.0); n_fft];

        for frame_idx in 0..n_frames {
            let start = (frame_idx * hop) as isize - pad;
            for (i, slot) in frame.iter_mut().enumerate() {
                let pos = start + i as isize;
                let sample = if (0..len).contains(&pos) {
                    samples[pos as usize] as f64
                } else {
                    0.0
                };
                *slot = Complex::new(sample * self.window[i], 0.0);
            }

            self.fft.process(&mut frame);

            for (k, bin) in frame.iter().take(freq_bins).enumerate() {
                spectrogram[[k, frame_idx]] = bin.norm_sqr();
            }
        }

        spectrogram
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FeatureExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureExtractor")
            .field("config", &self.config)
            .field("sample_rate", &self.sample_rate)
            .finish_non_exhaustive()
    }
}

/// Periodic Hann window.
fn hann_window(length: usize) -> Vec<f64> {
    (0..length)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / length as f64).cos())
        .collect()
}

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Slaney mel scale: linear below 1 kHz, logarithmic above.
fn hz_to_mel(freq: f64) -> f64 {
    if freq >= MIN_LOG_HZ {
        MIN_LOG_MEL + (freq / MIN_LOG_HZ).ln() / log_step()
    } else {
        freq / F_SP
    }
}

fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Triangular mel filterbank with Slaney area normalisation,
/// shape `(n_mels, n_fft / 2 + 1)`.
fn mel_filterbank(config: &MfccConfig, sample_rate: u32) -> Array2<f64> {
    let n_fft = config.n_fft.max(1);
    let n_mels = config.n_mels;
    let freq_bins = n_fft / 2 + 1;
    let nyquist = sample_rate as f64 / 2.0;
    let fmax = config.fmax.unwrap_or(nyquist);

    let min_mel = hz_to_mel(config.fmin);
    let max_mel = hz_to_mel(fmax);
    let mel_points: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(min_mel + (max_mel - min_mel) * i as f64 / (n_mels + 1) as f64))
        .collect();

    let fft_freqs: Vec<f64> = (0..freq_bins)
        .map(|k| k as f64 * sample_rate as f64 / n_fft as f64)
        .collect();

    let mut filterbank = Array2::<f64>::zeros((n_mels, freq_bins));
    for m in 0..n_mels {
        let (left, center, right) = (mel_points[m], mel_points[m + 1], mel_points[m + 2]);
        let enorm = 2.0 / (right - left);

        for (k, &freq) in fft_freqs.iter().enumerate() {
            let lower = (freq - left) / (center - left);
            let upper = (right - freq) / (right - center);
            let weight = lower.min(upper).max(0.0);
            filterbank[[m, k]] = weight * enorm;
        }
    }

    filterbank
}

/// Convert power to decibels relative to 1.0, clipping `top_db` below the peak.
fn power_to_db(power: Array2<f64>, top_db: Option<f64>) -> Array2<f64> {
    let mut log_spec = power.mapv_into(|p| 10.0 * p.max(AMIN).log10());
    if let Some(top_db) = top_db {
        let peak = log_spec.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let floor = peak - top_db;
        log_spec.mapv_inplace(|v| v.max(floor));
    }
    log_spec
}

/// Orthonormal DCT-II rows for the first `n_coeffs` coefficients.
fn dct_basis(n_coeffs: usize, n_inputs: usize) -> Array2<f64> {
    let n = n_inputs.max(1) as f64;
    Array2::from_shape_fn((n_coeffs, n_inputs), |(k, m)| {
        let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
        scale * (PI * k as f64 * (2.0 * m as f64 + 1.0) / (2.0 * n)).cos()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, secs: f32) -> Waveform {
        let len = (SAMPLE_RATE as f32 * secs) as usize;
        let samples = (0..len)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / SAMPLE_RATE as f32).sin())
            .collect();
        Waveform::new(samples, SAMPLE_RATE)
    }

    #[test]
    fn test_extracts_thirteen_finite_values() {
        let extractor = FeatureExtractor::new();
        let extraction = extractor.extract(&sine(220.0, 1.0));

        assert!(!extraction.is_fallback());
        let vector = extraction.into_vector();
        assert_eq!(vector.as_slice().len(), N_FEATURES);
        assert!(vector.as_slice().iter().all(|v| v.is_finite()));
        assert!(!vector.is_zero());
    }

    #[test]
    fn test_single_sample_still_computes() {
        let extractor = FeatureExtractor::new();
        let extraction = extractor.extract(&Waveform::new(vec![0.25], SAMPLE_RATE));
        assert!(matches!(extraction, Extraction::Computed(_)));
    }

    #[test]
    fn test_non_finite_input_falls_back_to_zeros() {
        let extractor = FeatureExtractor::new();
        let mut waveform = sine(220.0, 0.5);
        waveform.samples[100] = f32::NAN;

        let extraction = extractor.extract(&waveform);
        assert!(extraction.is_fallback());
        assert_eq!(extraction.into_vector(), FeatureVector::zeros());
    }

    #[test]
    fn test_empty_and_zero_rate_fall_back() {
        let extractor = FeatureExtractor::new();
        assert!(extractor.extract(&Waveform::new(vec![], SAMPLE_RATE)).is_fallback());
        assert!(extractor.extract(&Waveform::new(vec![0.1; 100], 0)).is_fallback());
    }

    #[test]
    fn test_digital_silence_has_known_coefficients() {
        // Every mel bin sits at the -100 dB floor, so only c0 survives the DCT
        let extractor = FeatureExtractor::new();
        let vector = extractor
            .extract(&Waveform::new(vec![0.0; 4000], SAMPLE_RATE))
            .into_vector();

        let expected_c0 = -100.0 * (128.0f32).sqrt();
        assert!((vector.as_slice()[0] - expected_c0).abs() < 1e-2);
        for &c in &vector.as_slice()[1..] {
            assert!(c.abs() < 1e-3);
        }
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = FeatureExtractor::new();
        let waveform = sine(440.0, 0.3);
        assert_eq!(extractor.extract(&waveform), extractor.extract(&waveform));
    }

    #[test]
    fn test_other_sample_rates_use_matching_filterbank() {
        let extractor = FeatureExtractor::new();
        let waveform = Waveform::new(vec![0.1; 22050], 22050);
        assert!(!extractor.extract(&waveform).is_fallback());
    }

    #[test]
    fn test_mel_scale_round_trip() {
        for hz in [0.0, 500.0, 1000.0, 4000.0, 8000.0] {
            assert!((mel_to_hz(hz_to_mel(hz)) - hz).abs() < 1e-6);
        }
    }

    #[test]
    fn test_dct_basis_is_orthonormal() {
        let basis = dct_basis(13, 128);
        for i in 0..13 {
            for j in 0..13 {
                let dot: f64 = basis.row(i).dot(&basis.row(j));
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-9);
            }
        }
    }
}
