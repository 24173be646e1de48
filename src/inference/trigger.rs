//! Hysteresis trigger: onset at `prob >= on`, offset at `prob <= off`.
//!
//! Pure over one probability trace — the engine calls it once per window per phase,
//! so there is no cross-window state to carry (cross-window dedup lives in the
//! postprocessor's `RecentPicks` LRU instead).

/// One onset/offset pair, `[i0, i1)`, `i1 > i0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerWindow {
    pub onset: usize,
    pub offset: usize,
}

pub struct HysteresisTrigger {
    pub on: f32,
    pub off: f32,
}

impl HysteresisTrigger {
    pub fn new(on: f32, off: f32) -> Self {
        Self { on, off }
    }

    /// Scan `probs` for onset/offset pairs. An onset triggers when `probs[i] >= on`;
    /// once triggered, the trace is in an "armed" state until `probs[i] <= off`,
    /// which closes the pair. A trace that ends still armed closes at `probs.len()`
    /// (there is no partial/open pair left dangling), matching obspy's
    /// `trigger_onset`.
    pub fn scan(&self, probs: &[f32]) -> Vec<TriggerWindow> {
        let mut windows = Vec::new();
        let mut armed_at: Option<usize> = None;

        for (i, &p) in probs.iter().enumerate() {
            match armed_at {
                None => {
                    if p >= self.on {
                        armed_at = Some(i);
                    }
                }
                Some(onset) => {
                    if p <= self.off {
                        if i > onset {
                            windows.push(TriggerWindow { onset, offset: i });
                        }
                        armed_at = None;
                    }
                }
            }
        }

        if let Some(onset) = armed_at {
            windows.push(TriggerWindow { onset, offset: probs.len() });
        }

        windows
    }

    /// For each trigger window, the index of the maximum probability within it.
    pub fn pick_indices(&self, probs: &[f32]) -> Vec<usize> {
        self.scan(probs)
            .into_iter()
            .filter_map(|w| {
                probs[w.onset..w.offset]
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(rel, _)| w.onset + rel)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_peak_yields_single_pick() {
        let mut probs = vec![0.1f32; 300];
        probs[137] = 0.99;
        let trig = HysteresisTrigger::new(0.95, 0.10);
        let picks = trig.pick_indices(&probs);
        assert_eq!(picks, vec![137]);
    }

    #[test]
    fn zero_width_trigger_is_dropped() {
        let mut probs = vec![0.0f32; 10];
        probs[5] = 0.95; // immediately followed by a value <= off
        probs[6] = 0.05;
        let trig = HysteresisTrigger::new(0.95, 0.10);
        assert_eq!(trig.scan(&probs).len(), 1);
        assert_eq!(trig.scan(&probs)[0], TriggerWindow { onset: 5, offset: 6 });
    }

    #[test]
    fn trace_still_armed_at_end_closes_at_probs_len() {
        let mut probs = vec![0.1f32; 20];
        probs[15] = 0.99; // onset, never drops back below `off` before the trace ends
        let trig = HysteresisTrigger::new(0.95, 0.10);
        let windows = trig.scan(&probs);
        assert_eq!(windows, vec![TriggerWindow { onset: 15, offset: 20 }]);
    }

    #[test]
    fn idempotent_on_identical_input() {
        let mut probs = vec![0.05f32; 400];
        for i in 50..70 {
            probs[i] = 0.97;
        }
        let trig = HysteresisTrigger::new(0.95, 0.10);
        let a = trig.pick_indices(&probs);
        let b = trig.pick_indices(&probs);
        assert_eq!(a, b);
    }
}
