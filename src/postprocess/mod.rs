//! Pick postprocessing (§4.F): within-window dedup, cross-window dedup, publish
//! and persist. Owns the `RecentPicks` LRU and the pick-log file handle across
//! inference cycles — both carry state between windows.

mod dedup;
mod recent;

pub use dedup::dedup_within_window;
pub use recent::RecentPicks;

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use log::{error, warn};

use crate::bus::EventBus;
use crate::error::PublishError;
use crate::pick::Pick;
use crate::stats::Stats;

/// Opens the pick log in append mode and owns the cross-window dedup state.
pub struct Postprocessor {
    recent: RecentPicks,
    log_file: File,
    log_path: std::path::PathBuf,
}

impl Postprocessor {
    pub fn open(pick_log_path: &Path) -> Result<Self, PublishError> {
        let log_file =
            OpenOptions::new().create(true).append(true).open(pick_log_path).map_err(|source| {
                PublishError::Log { path: pick_log_path.to_path_buf(), source }
            })?;
        Ok(Self { recent: RecentPicks::new(), log_file, log_path: pick_log_path.to_path_buf() })
    }

    /// Within-window dedup, then cross-window dedup, then publish + append each
    /// surviving pick. Publish/log failures are logged and do not abort the batch
    /// (§7: recoverable, not retried).
    pub fn process(&mut self, picks: Vec<Pick>, bus: &EventBus, stats: &Stats) {
        let deduped = dedup_within_window(picks);
        let admitted = self.recent.filter(deduped);

        stats.record_picks(admitted.len() as u64);
        for pick in &admitted {
            if let Err(e) = self.append_to_log(pick) {
                error!("failed to append pick to log: {e}");
            }
            if let Err(e) = bus.publish_pick(pick) {
                warn!("failed to publish pick: {e}");
            }
        }
    }

    fn append_to_log(&mut self, pick: &Pick) -> Result<(), PublishError> {
        writeln!(self.log_file, "{}", pick.to_log_line())
            .map_err(|source| PublishError::Log { path: self.log_path.clone(), source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pick::Phase;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

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
    fn appends_log_lines_for_each_pick() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("picks.log");
        let mut postproc = Postprocessor::open(&log_path).unwrap();
        let stats = Stats::new();

        let picks = vec![pick_at(Phase::P, 0, 0.9), pick_at(Phase::S, 2000, 0.9)];

        // No bus — publish path exercised separately via integration tests; here we
        // only need an EventBus-shaped stand-in, which isn't constructible without a
        // broker, so this test only covers dedup + log-append wiring by calling
        // append_to_log directly through dedup_within_window + RecentPicks.
        let deduped = dedup_within_window(picks);
        let admitted = postproc.recent.filter(deduped);
        for pick in &admitted {
            postproc.append_to_log(pick).unwrap();
        }
        stats.record_picks(admitted.len() as u64);

        drop(postproc);
        let contents = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert_eq!(stats.snapshot().picks_emitted, 2);
    }
}
