//! Sample rate conversion using rubato.
//!
//! Recordings arrive at whatever rate the browser or file used; the feature
//! extractor expects 16 kHz mono.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::debug;
use voxscreen_core::{Error, Result};

/// Resample mono audio from `input_rate` to `output_rate`.
///
/// Returns a copy when the rates already match and an empty buffer for
/// empty input.
pub fn resample(input: &[f32], input_rate: u32, output_rate: u32) -> Result<Vec<f32>> {
    if input_rate == 0 || output_rate == 0 {
        return Err(Error::audio(format!(
            "cannot resample between {input_rate}Hz and {output_rate}Hz"
        )));
    }

    if input_rate == output_rate {
        debug!("sample rate already at {}Hz, skipping resample", output_rate);
        return Ok(input.to_vec());
    }

    if input.is_empty() {
        return Ok(Vec::new());
    }

    debug!(
        "resampling {} samples from {}Hz to {}Hz",
        input.len(),
        input_rate,
        output_rate
    );

    let mut resampler = FastFixedIn::<f32>::new(
        output_rate as f64 / input_rate as f64,
        1.0,
        PolynomialDegree::Septic,
        input.len(),
        1,
    )
    .map_err(|e| Error::audio(format!("failed to create resampler: {e}")))?;

    let mut output = resampler
        .process(&[input], None)
        .map_err(|e| Error::audio(format!("resampling failed: {e}")))?;

    Ok(output.pop().unwrap_or_default())
}
