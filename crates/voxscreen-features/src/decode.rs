//! Audio decoding to mono f32 samples.
//!
//! Symphonia handles the common containers directly. Browser recordings
//! (Opus in WebM) are outside what symphonia decodes, so an external
//! `ffmpeg` binary can be configured as a fallback; it is asked to emit
//! raw little-endian f32 mono samples on stdout.

use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};
use voxscreen_core::{Error, Result};

/// Mono samples at their native sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Decode an audio file into mono f32 samples.
///
/// Tries symphonia first. When that fails and `ffmpeg` is given, the file is
/// converted by ffmpeg to mono at `ffmpeg_rate` instead.
///
/// # Errors
/// Returns [`Error::Audio`] when neither decoder can read the file.
pub fn decode_file(path: &Path, ffmpeg: Option<&Path>, ffmpeg_rate: u32) -> Result<DecodedAudio> {
    match decode_with_symphonia(path) {
        Ok(audio) => Ok(audio),
        Err(err) => match ffmpeg {
            Some(ffmpeg) => {
                debug!(
                    path = %path.display(),
                    error = %err,
                    "symphonia could not decode file, falling back to ffmpeg"
                );
                decode_with_ffmpeg(path, ffmpeg, ffmpeg_rate)
            }
            None => Err(err),
        },
    }
}

/// Decode with symphonia, downmixing every frame to mono.
pub fn decode_with_symphonia(path: &Path) -> Result<DecodedAudio> {
    let file = File::open(path)
        .map_err(|e| Error::audio(format!("cannot open audio file {}: {e}", path.display())))?;
    let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::audio(format!("failed to probe audio format: {e}")))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| Error::audio("no default audio track found"))?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| Error::audio("audio track has no sample rate"))?;
    let channels = track
        .codec_params
        .channels
        .map_or(1, symphonia::core::audio::Channels::count)
        .max(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::audio(format!("failed to create audio decoder: {e}")))?;

    let track_id = track.id;
    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                warn!("audio decode packet error: {e}");
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("audio decode frame error: {e}");
                continue;
            }
            Err(e) => return Err(Error::audio(format!("audio decode failed: {e}"))),
        };

        let spec = *decoded.spec();
        let frame_channels = spec.channels.count().max(1);
        let frames = decoded.capacity();
        // Reuse the buffer unless this packet is larger than any seen so far
        let needs_alloc = sample_buf
            .as_ref()
            .map_or(true, |buf| buf.capacity() < frames * frame_channels);
        if needs_alloc {
            sample_buf = Some(SampleBuffer::<f32>::new(frames as u64, spec));
        }
        let Some(buf) = sample_buf.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);

        samples.extend(
            buf.samples()
                .chunks(frame_channels)
                .map(|frame| frame.iter().sum::<f32>() / frame_channels as f32),
        );
    }

    debug!(
        samples = samples.len(),
        sample_rate,
        channels,
        path = %path.display(),
        "decoded audio with symphonia"
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}

/// Convert a file through ffmpeg into mono f32 samples at `sample_rate`.
pub fn decode_with_ffmpeg(path: &Path, ffmpeg: &Path, sample_rate: u32) -> Result<DecodedAudio> {
    let rate = sample_rate.to_string();
    let output = Command::new(ffmpeg)
        .arg("-i")
        .arg(path)
        .args([
            "-f",
            "f32le",
            "-ac",
            "1",
            "-ar",
            &rate,
            "-hide_banner",
            "-loglevel",
            "error",
            "pipe:1",
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| Error::audio(format!("failed to run {}: {e}", ffmpeg.display())))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::audio(format!(
            "ffmpeg exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let samples = f32_le_samples(&output.stdout);
    debug!(
        samples = samples.len(),
        sample_rate,
        path = %path.display(),
        "decoded audio with ffmpeg"
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}

/// Reinterpret raw little-endian bytes as f32 samples; a trailing partial
/// sample is dropped.
fn f32_le_samples(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}
