//! Cross-window duplicate suppression: `RecentPicks` (§4.F [ADDED]).
//!
//! A fixed-size ring keyed by phase, reusing the buffer's array + head/len idiom
//! at a much smaller scale (two phases, so really just two slots).

use chrono::{DateTime, Utc};

use crate::pick::{Phase, Pick};

const DEDUP_WINDOW_MS: i64 = 250;

/// Remembers the last emitted time per phase across inference windows, so a pick
/// that recurs within 250 ms of the same phase's last emission (e.g. because the
/// sliding-window stride straddles two inference runs) is suppressed.
pub struct RecentPicks {
    last_emitted: [Option<DateTime<Utc>>; 2],
}

impl RecentPicks {
    pub fn new() -> Self {
        Self { last_emitted: [None; 2] }
    }

    fn slot(phase: Phase) -> usize {
        match phase {
            Phase::P => 0,
            Phase::S => 1,
        }
    }

    /// Keep `pick` only if its phase has not been emitted within the last 250 ms;
    /// records the pick's time as the new "last emitted" for its phase either way
    /// so repeated near-duplicates don't each reset the window.
    pub fn admit(&mut self, pick: &Pick) -> bool {
        let slot = Self::slot(pick.phase);
        let admit = match self.last_emitted[slot] {
            Some(last) => (pick.time - last).num_milliseconds().abs() >= DEDUP_WINDOW_MS,
            None => true,
        };
        if admit {
            self.last_emitted[slot] = Some(pick.time);
        }
        admit
    }

    /// Filter a batch of already within-window-deduped picks in time order.
    pub fn filter(&mut self, picks: Vec<Pick>) -> Vec<Pick> {
        picks.into_iter().filter(|p| self.admit(p)).collect()
    }
}

impl Default for RecentPicks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pick_at(phase: Phase, ms_offset: i64, prob: f32) -> Pick {
        let t0 = Utc.with_ymd_and_hms(2025, 12, 10, 15, 0, 0).unwrap();
        Pick {
            network: "XX".into(),
            station: "STA1".into(),
            phase,
            time: t0 + chrono::Duration::milliseconds(ms_offset),
            probability: prob,
            channel: "ELZ".into(),
        }
    }

    #[test]
    fn suppresses_within_250ms_same_phase() {
        let mut recent = RecentPicks::new();
        assert!(recent.admit(&pick_at(Phase::P, 0, 0.9)));
        assert!(!recent.admit(&pick_at(Phase::P, 200, 0.9)));
        assert!(recent.admit(&pick_at(Phase::P, 260, 0.9)));
    }

    #[test]
    fn different_phases_independent() {
        let mut recent = RecentPicks::new();
        assert!(recent.admit(&pick_at(Phase::P, 0, 0.9)));
        assert!(recent.admit(&pick_at(Phase::S, 50, 0.9)));
    }

    #[test]
    fn filter_preserves_order_and_drops_duplicates() {
        let mut recent = RecentPicks::new();
        let picks = vec![pick_at(Phase::P, 0, 0.9), pick_at(Phase::P, 100, 0.95), pick_at(Phase::P, 400, 0.8)];
        let kept = recent.filter(picks);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].time, Utc.with_ymd_and_hms(2025, 12, 10, 15, 0, 0).unwrap());
        assert_eq!(kept[1].time, Utc.with_ymd_and_hms(2025, 12, 10, 15, 0, 0).unwrap() + chrono::Duration::milliseconds(400));
    }
}
