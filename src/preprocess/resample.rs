//! Polyphase antialiased resampling, fixed at the 250 Hz → 100 Hz (5:2) ratio the
//! deployed digitizer always produces (§9 Open Questions: not currently
//! configurable).

use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};

use crate::error::InferenceError;

const SOURCE_HZ: f64 = 250.0;
const TARGET_HZ: f64 = 100.0;

/// Resample one channel's worth of samples from 250 Hz to 100 Hz.
///
/// `chunk_len` must be the full length of `samples` — preprocessing runs once per
/// extracted window (tens of seconds), so a single fixed-size chunk covering the
/// whole window is simplest and avoids cross-chunk state.
pub fn resample_250_to_100(samples: &[f32]) -> Result<Vec<f32>, InferenceError> {
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(
        TARGET_HZ / SOURCE_HZ,
        1.0,
        params,
        samples.len(),
        1,
    )
    .map_err(|e| InferenceError::Preprocess(format!("resampler init failed: {e}")))?;

    let waves_in = vec![samples.to_vec()];
    let waves_out = resampler
        .process(&waves_in, None)
        .map_err(|e| InferenceError::Preprocess(format!("resample failed: {e}")))?;

    Ok(waves_out.into_iter().next().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resamples_to_expected_length_ratio() {
        let samples = vec![0.0f32; 250 * 10]; // 10 s at 250 Hz
        let out = resample_250_to_100(&samples).unwrap();
        // SincFixedIn output length is approximately input_len * ratio; allow for the
        // filter's fixed group delay rather than asserting an exact count.
        let expected = 100 * 10;
        assert!((out.len() as i64 - expected as i64).abs() < 50);
    }
}
