//! The [`Pick`] type: a single P/S phase detection.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Seismic phase a pick corresponds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    P,
    S,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::P => "P",
            Phase::S => "S",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single detected phase arrival, owned by the postprocessor until it is
/// published and logged.
#[derive(Debug, Clone, Serialize)]
pub struct Pick {
    pub network: String,
    pub station: String,
    pub phase: Phase,
    pub time: DateTime<Utc>,
    pub probability: f32,
    pub channel: String,
}

impl Pick {
    /// Render as one pick-log line: `NET STA {P|S} ISO8601 PROB.4f CHAN`.
    pub fn to_log_line(&self) -> String {
        format!(
            "{} {} {} {} {:.4} {}",
            self.network,
            self.station,
            self.phase,
            self.time.to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            self.probability,
            self.channel,
        )
    }

    /// JSON payload published to the event bus: `{network, station, phase, time,
    /// probability, channel}`.
    pub fn to_bus_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "network": self.network,
            "station": self.station,
            "phase": self.phase.as_str(),
            "time": self.time.to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            "probability": self.probability,
            "channel": self.channel,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_pick() -> Pick {
        Pick {
            network: "XX".into(),
            station: "STA1".into(),
            phase: Phase::P,
            time: Utc.with_ymd_and_hms(2025, 12, 10, 15, 0, 0).unwrap(),
            probability: 0.9876,
            channel: "EHZ".into(),
        }
    }

    #[test]
    fn log_line_format() {
        let line = sample_pick().to_log_line();
        assert!(line.starts_with("XX STA1 P 2025-12-10T15:00:00.000000Z 0.9876 EHZ"));
    }

    #[test]
    fn bus_payload_fields() {
        let payload = sample_pick().to_bus_payload();
        assert_eq!(payload["network"], "XX");
        assert_eq!(payload["phase"], "P");
        assert_eq!(payload["probability"], 0.9876_f32 as f64);
    }
}
