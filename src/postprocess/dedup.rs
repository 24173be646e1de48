//! Within-window near-duplicate suppression (§4.F steps 1–2).

use crate::pick::Pick;

/// Sort picks stably by time, then collapse same-phase picks that fall within
/// 500 ms of the *first* pick of their group into the single highest-probability
/// pick of that group. The group anchor is the first pick's time, not the previous
/// pick's — otherwise a slow drift of sub-500ms gaps would merge arbitrarily many
/// picks into one (see the dedup test grounded on the spec's 3-pick example).
pub fn dedup_within_window(mut picks: Vec<Pick>) -> Vec<Pick> {
    picks.sort_by_key(|p| p.time);

    let mut groups: Vec<Vec<Pick>> = Vec::new();
    for pick in picks {
        let starts_new_group = match groups.last() {
            None => true,
            Some(group) => {
                let anchor = group.first().expect("groups are never empty");
                anchor.phase != pick.phase || (pick.time - anchor.time).num_milliseconds() >= 500
            }
        };
        if starts_new_group {
            groups.push(vec![pick]);
        } else {
            groups.last_mut().expect("just checked non-empty").push(pick);
        }
    }

    groups
        .into_iter()
        .map(|group| {
            group
                .into_iter()
                .max_by(|a, b| a.probability.partial_cmp(&b.probability).unwrap_or(std::cmp::Ordering::Equal))
                .expect("group is never empty")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pick::Phase;
    use chrono::{TimeZone, Utc};

    fn pick_at(phase: Phase, secs_offset: i64, prob: f32) -> Pick {
        let t0 = Utc.with_ymd_and_hms(2025, 12, 10, 15, 0, 0).unwrap();
        Pick {
            network: "XX".into(),
            station: "STA1".into(),
            phase,
            time: t0 + chrono::Duration::milliseconds(secs_offset),
            probability: prob,
            channel: "ELZ".into(),
        }
    }

    #[test]
    fn dedup_keeps_middle_and_last_s5() {
        let picks = vec![
            pick_at(Phase::P, 0, 0.8),
            pick_at(Phase::P, 300, 0.95),
            pick_at(Phase::P, 600, 0.7),
        ];
        let result = dedup_within_window(picks);
        assert_eq!(result.len(), 2);
        assert!((result[0].probability - 0.95).abs() < 1e-6);
        assert_eq!(result[0].time, Utc.with_ymd_and_hms(2025, 12, 10, 15, 0, 0).unwrap() + chrono::Duration::milliseconds(300));
        assert_eq!(result[1].time, Utc.with_ymd_and_hms(2025, 12, 10, 15, 0, 0).unwrap() + chrono::Duration::milliseconds(600));
    }

    #[test]
    fn different_phases_never_grouped() {
        let picks = vec![pick_at(Phase::P, 0, 0.9), pick_at(Phase::S, 100, 0.9)];
        let result = dedup_within_window(picks);
        assert_eq!(result.len(), 2);
    }
}
