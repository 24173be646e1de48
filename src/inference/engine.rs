//! Sliding-window batched inference: §4.E.
//!
//! Windowing, per-channel normalization and batching are independent of the model
//! backend — only [`PhaseModel::set_input`]/`invoke`/`get_output` ever touch the
//! interpreter, so this module is testable against a fake model.

use std::time::Instant;

use crate::error::InferenceError;
use crate::pick::{Phase, Pick};
use crate::preprocess::PreprocessedWindow;
use crate::stats::Stats;

use super::model::{PhaseModel, N_CHANNELS, N_FEAT, N_OUT};
use super::trigger::HysteresisTrigger;

const N_SHIFT: usize = 10;
const OFF_THRESHOLD: f32 = 0.10;

/// Station identity attached to every pick produced from one window.
pub struct WindowMeta {
    pub network: String,
    pub station: String,
    pub channel: String,
}

/// Number of sliding windows of length `N_FEAT` with stride `N_SHIFT` that fit in a
/// sequence of `num_samples` samples.
pub fn window_count(num_samples: usize) -> usize {
    if num_samples < N_FEAT {
        0
    } else {
        (num_samples - N_FEAT) / N_SHIFT + 1
    }
}

/// Normalize one 400-sample, 3-channel window in place: each channel is divided
/// independently by `max(|sample|) + 1e-9` computed over that channel's 400 samples.
fn normalize_window(staging: &mut [f32]) {
    for ch in 0..N_CHANNELS {
        let mut max_abs = 0.0f32;
        for i in 0..N_FEAT {
            max_abs = max_abs.max(staging[i * N_CHANNELS + ch].abs());
        }
        let scale = max_abs + 1e-9;
        for i in 0..N_FEAT {
            staging[i * N_CHANNELS + ch] /= scale;
        }
    }
}

/// Run the full sliding-window → batch → trigger pipeline over one preprocessed
/// window, emitting picks in time order.
pub fn run_inference(
    preprocessed: &PreprocessedWindow,
    model: &mut dyn PhaseModel,
    min_probability: f32,
    meta: &WindowMeta,
    stats: &Stats,
) -> Result<Vec<Pick>, InferenceError> {
    let num_samples = preprocessed.len_samples();
    let w = window_count(num_samples);
    if w == 0 {
        return Ok(Vec::new());
    }

    let batch_size = model.batch_size();
    let mut prob_p = Vec::with_capacity(w);
    let mut prob_s = Vec::with_capacity(w);

    let mut staging = vec![0.0f32; batch_size * N_FEAT * N_CHANNELS];
    let mut i = 0usize;
    while i < w {
        let k = (w - i).min(batch_size);

        staging.iter_mut().for_each(|v| *v = 0.0);
        for local in 0..k {
            let global = i + local;
            let base = global * N_SHIFT;
            let window_base = local * N_FEAT * N_CHANNELS;
            for ch in 0..N_CHANNELS {
                for sample in 0..N_FEAT {
                    staging[window_base + sample * N_CHANNELS + ch] =
                        preprocessed.channels[ch][base + sample];
                }
            }
            normalize_window(&mut staging[window_base..window_base + N_FEAT * N_CHANNELS]);
        }

        let t0 = Instant::now();
        model.set_input(&staging)?;
        model.invoke()?;
        let wall = t0.elapsed();
        stats.record_inference_batch(wall.as_nanos() as u64);

        let output = model.get_output();
        for local in 0..k {
            prob_p.push(output[local * N_OUT]);
            prob_s.push(output[local * N_OUT + 1]);
        }

        i += k;
    }

    let trigger = HysteresisTrigger::new(min_probability, OFF_THRESHOLD);
    let mut picks = Vec::new();
    for (phase, probs) in [(Phase::P, &prob_p), (Phase::S, &prob_s)] {
        for window in trigger.scan(probs) {
            let (rel, &prob) = probs[window.onset..window.offset]
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                .expect("non-empty trigger window");
            let pick_index = window.onset + rel;
            let offset_s = (pick_index * N_SHIFT + N_FEAT / 2) as f64 / 100.0;
            let time = preprocessed.start_time + chrono::Duration::microseconds((offset_s * 1_000_000.0).round() as i64);
            picks.push(Pick {
                network: meta.network.clone(),
                station: meta.station.clone(),
                phase,
                time,
                probability: prob,
                channel: meta.channel.clone(),
            });
        }
    }

    picks.sort_by_key(|p| p.time);
    Ok(picks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct FakeModel {
        batch_size: usize,
        output: Vec<f32>,
        /// When `Some(global_window_index)`, that window's P-probability is spiked.
        spike_at: Option<usize>,
        calls: usize,
    }

    impl FakeModel {
        fn new(batch_size: usize, spike_at: Option<usize>) -> Self {
            Self { batch_size, output: vec![0.0; batch_size * N_OUT], spike_at, calls: 0 }
        }
    }

    impl PhaseModel for FakeModel {
        fn set_input(&mut self, _tensor: &[f32]) -> Result<(), InferenceError> {
            Ok(())
        }

        fn invoke(&mut self) -> Result<(), InferenceError> {
            for local in 0..self.batch_size {
                let global = self.calls * self.batch_size + local;
                let is_spike = self.spike_at == Some(global);
                self.output[local * N_OUT] = if is_spike { 0.99 } else { 0.05 };
                self.output[local * N_OUT + 1] = 0.01;
                self.output[local * N_OUT + 2] = 0.9;
            }
            self.calls += 1;
            Ok(())
        }

        fn get_output(&self) -> &[f32] {
            &self.output
        }

        fn batch_size(&self) -> usize {
            self.batch_size
        }
    }

    fn meta() -> WindowMeta {
        WindowMeta { network: "XX".into(), station: "STA1".into(), channel: "ELZ".into() }
    }

    #[test]
    fn single_pick_at_expected_time_s5() {
        let start = Utc.with_ymd_and_hms(2025, 12, 10, 15, 0, 0).unwrap();
        let num_samples = 60 * 100; // 60 s at 100 Hz
        let preprocessed = PreprocessedWindow {
            start_time: start,
            channels: std::array::from_fn(|_| vec![0.0f32; num_samples]),
        };
        let mut model = FakeModel::new(100, Some(137));
        let stats = Stats::new();
        let picks = run_inference(&preprocessed, &mut model, 0.95, &meta(), &stats).unwrap();
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].phase, Phase::P);
        let expected = start + chrono::Duration::milliseconds(15_700);
        assert_eq!(picks[0].time, expected);
    }

    #[test]
    fn idempotent_across_runs_s6() {
        let start = Utc.with_ymd_and_hms(2025, 12, 10, 15, 0, 0).unwrap();
        let num_samples = 60 * 100;
        let preprocessed = PreprocessedWindow {
            start_time: start,
            channels: std::array::from_fn(|_| vec![0.0f32; num_samples]),
        };
        let mut model_a = FakeModel::new(100, Some(50));
        let mut model_b = FakeModel::new(100, Some(50));
        let stats = Stats::new();
        let a = run_inference(&preprocessed, &mut model_a, 0.95, &meta(), &stats).unwrap();
        let b = run_inference(&preprocessed, &mut model_b, 0.95, &meta(), &stats).unwrap();
        assert_eq!(a.len(), b.len());
        for (pa, pb) in a.iter().zip(b.iter()) {
            assert_eq!(pa.time, pb.time);
            assert_eq!(pa.probability, pb.probability);
        }
    }

    #[test]
    fn empty_window_under_min_length_yields_no_picks() {
        assert_eq!(window_count(399), 0);
        assert_eq!(window_count(400), 1);
        assert_eq!(window_count(410), 2);
    }
}
