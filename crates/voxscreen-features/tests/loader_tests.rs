//! End-to-end tests for recording -> waveform -> features

use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;
use voxscreen_core::{N_FEATURES, SAMPLE_RATE};
use voxscreen_features::{AudioLoader, FeatureExtractor};

fn write_wav(path: &Path, sample_rate: u32, samples: &[f32]) {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for &sample in samples {
        writer.write_sample((sample * 32767.0) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

fn padded_tone(sample_rate: u32, silence_secs: f32, tone_secs: f32) -> Vec<f32> {
    let silence = vec![0.0; (sample_rate as f32 * silence_secs) as usize];
    let tone_len = (sample_rate as f32 * tone_secs) as usize;
    let tone = (0..tone_len).map(|i| {
        0.4 * (2.0 * std::f32::consts::PI * 180.0 * i as f32 / sample_rate as f32).sin()
    });

    silence
        .iter()
        .copied()
        .chain(tone)
        .chain(silence.iter().copied())
        .collect()
}

#[test]
fn test_load_resamples_and_trims() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("voice.wav");
    write_wav(&path, 48000, &padded_tone(48000, 0.5, 1.0));

    let waveform = AudioLoader::new().load(&path).unwrap();

    assert_eq!(waveform.sample_rate, SAMPLE_RATE);
    // 2 s of input at 16 kHz would be 32000 samples; trimming removes most of the silence
    assert!(waveform.len() < 24000, "got {} samples", waveform.len());
    assert!(waveform.len() >= 15000, "got {} samples", waveform.len());
}

#[test]
fn test_digital_silence_is_not_trimmed_away() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("silence.wav");
    write_wav(&path, 16000, &vec![0.0; 16000]);

    let waveform = AudioLoader::new().load(&path).unwrap();
    assert_eq!(waveform.len(), 16000);

    let extraction = FeatureExtractor::new().extract(&waveform);
    assert!(!extraction.is_fallback());
}

#[test]
fn test_zero_length_recording_loads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.wav");
    write_wav(&path, 16000, &[]);

    let waveform = AudioLoader::new().load(&path).unwrap();
    assert!(waveform.is_empty());
}

#[test]
fn test_loaded_recording_yields_feature_vector() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("voice.wav");
    write_wav(&path, 16000, &padded_tone(16000, 0.2, 0.8));

    let waveform = AudioLoader::new().load(&path).unwrap();
    let extraction = FeatureExtractor::new().extract(&waveform);

    assert!(!extraction.is_fallback());
    assert_eq!(extraction.into_vector().as_slice().len(), N_FEATURES);
}

#[test]
fn test_missing_file_is_an_error() {
    let result = AudioLoader::new().load(Path::new("/definitely/not/here.wav"));
    assert!(result.is_err());
}
