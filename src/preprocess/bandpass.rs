//! 4th-order Butterworth bandpass, realized as two cascaded second-order sections
//! (biquads), applied forward-only per §4.D. Each section is built with the `biquad`
//! crate's RBJ cookbook coefficients; cascading two identically-tuned bandpass
//! biquads approximates the 4th-order Butterworth response the spec calls for.

use biquad::{Biquad, Coefficients, DirectForm1, ToHertz, Type};

use crate::error::InferenceError;

pub struct Bandpass {
    sections: [DirectForm1<f32>; 2],
}

impl Bandpass {
    pub fn new(sample_rate_hz: f64, freq_min: f64, freq_max: f64) -> Result<Self, InferenceError> {
        let center = (freq_min * freq_max).sqrt();
        let bandwidth = freq_max - freq_min;
        let q = if bandwidth > 0.0 { center / bandwidth } else { 1.0 };

        let coeffs = Coefficients::<f32>::from_params(
            Type::BandPass,
            sample_rate_hz.hz(),
            center.hz(),
            q as f32,
        )
        .map_err(|e| InferenceError::Preprocess(format!("bandpass design failed: {e:?}")))?;

        Ok(Self {
            sections: [DirectForm1::<f32>::new(coeffs), DirectForm1::<f32>::new(coeffs)],
        })
    }

    /// Apply the cascade forward-only, sample by sample, in place.
    pub fn apply(&mut self, samples: &mut [f32]) {
        for s in samples.iter_mut() {
            let mut v = *s;
            for section in self.sections.iter_mut() {
                v = section.run(v);
            }
            *s = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_midband_attenuates_dc() {
        let mut filter = Bandpass::new(250.0, 3.0, 20.0).unwrap();
        // A pure DC offset should be heavily attenuated by a bandpass filter.
        let mut samples = vec![1.0f32; 500];
        filter.apply(&mut samples);
        let tail_energy: f32 = samples[400..].iter().map(|v| v.abs()).sum();
        assert!(tail_energy < 50.0, "DC not attenuated, tail energy {tail_energy}");
    }
}
