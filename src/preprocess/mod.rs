//! Signal preprocessing: detrend → bandpass → resample (§4.D).

mod bandpass;
mod detrend;
mod resample;

use chrono::{DateTime, Utc};

use crate::buffer::Window;
use crate::error::InferenceError;
use crate::frame::NUM_CHANNELS;

use bandpass::Bandpass;
use detrend::detrend_linear;
use resample::resample_250_to_100;

/// Three channels of float32 samples at 100 Hz, aligned to the source window's
/// `start_time` (§4.D: "the time of the first output sample equals the original
/// `start_time`").
pub struct PreprocessedWindow {
    pub start_time: DateTime<Utc>,
    pub channels: [Vec<f32>; NUM_CHANNELS],
}

impl PreprocessedWindow {
    /// Samples per channel, `duration_s * 100`.
    pub fn len_samples(&self) -> usize {
        self.channels[0].len()
    }
}

/// Run detrend, bandpass (3–20 Hz by default) and 250→100 Hz resampling on one
/// extracted [`Window`], independently per channel.
pub fn preprocess(window: &Window, freq_min: f64, freq_max: f64) -> Result<PreprocessedWindow, InferenceError> {
    let mut out_channels: [Vec<f32>; NUM_CHANNELS] = Default::default();

    for ch in 0..NUM_CHANNELS {
        let mut floats: Vec<f32> = window.channels[ch].iter().map(|&s| s as f32).collect();
        detrend_linear(&mut floats);

        let mut filter = Bandpass::new(250.0, freq_min, freq_max)?;
        filter.apply(&mut floats);

        out_channels[ch] = resample_250_to_100(&floats)?;
    }

    // Polyphase resamplers may emit slightly different lengths per call due to
    // group delay rounding; trim every channel to the shortest so they stay aligned.
    let min_len = out_channels.iter().map(|c| c.len()).min().unwrap_or(0);
    for c in out_channels.iter_mut() {
        c.truncate(min_len);
    }

    Ok(PreprocessedWindow { start_time: window.start_time, channels: out_channels })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn produces_three_aligned_channels() {
        let start = Utc.with_ymd_and_hms(2025, 12, 10, 15, 0, 0).unwrap();
        let window = Window {
            start_time: start,
            duration_s: 10,
            channels: std::array::from_fn(|_| vec![0i32; 2500]),
        };
        let out = preprocess(&window, 3.0, 20.0).unwrap();
        assert_eq!(out.start_time, start);
        let len0 = out.channels[0].len();
        for ch in &out.channels {
            assert_eq!(ch.len(), len0);
        }
    }
}
