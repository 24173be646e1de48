//! Startup configuration: four JSON files read once, never reloaded.
//!
//! Mirrors the original source's split between `configuracion_dispositivo.json` and
//! `configuracion_mqtt.json` — one JSON document per concern, loaded from a single
//! directory path given on the command line.

mod load;

pub use load::load_all;

use serde::Deserialize;

/// Sensor family, driving the channel-code suffix letter (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SensorKind {
    Sismico,
    Acelerometro,
}

/// Acquisition metadata (`device.json`).
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel_codes: String,
    pub sampling_rate: f64,
    pub sensor_kind: SensorKind,
    pub quality_flag: String,
}

impl DeviceConfig {
    /// Derive the three SEED-ish channel codes from `channel_codes`, per §6:
    /// prefix `E` if `sampling_rate > 80` else `S`; suffix `L` for `SISMICO` else `N`;
    /// final letter taken from `channel_codes` in order.
    pub fn channel_names(&self) -> Vec<String> {
        let prefix = if self.sampling_rate > 80.0 { 'E' } else { 'S' };
        let suffix = match self.sensor_kind {
            SensorKind::Sismico => 'L',
            SensorKind::Acelerometro => 'N',
        };
        self.channel_codes
            .chars()
            .map(|letter| format!("{prefix}{suffix}{letter}"))
            .collect()
    }
}

/// Inference tuning (`inference.json`).
#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    pub model_path: std::path::PathBuf,
    #[serde(default = "default_min_probability")]
    pub min_probability: f32,
    #[serde(default = "default_freq_min")]
    pub freq_min: f64,
    #[serde(default = "default_freq_max")]
    pub freq_max: f64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
    #[serde(default = "default_inference_interval")]
    pub inference_interval_seconds: u64,
    #[serde(default = "default_inference_window")]
    pub inference_window_seconds: usize,
}

fn default_min_probability() -> f32 {
    0.95
}
fn default_freq_min() -> f64 {
    3.0
}
fn default_freq_max() -> f64 {
    20.0
}
fn default_batch_size() -> usize {
    100
}
fn default_num_threads() -> usize {
    2
}
fn default_inference_interval() -> u64 {
    10
}
fn default_inference_window() -> usize {
    60
}

/// Buffer sizing (`buffer.json`).
#[derive(Debug, Clone, Deserialize)]
pub struct BufferConfig {
    #[serde(default = "default_capacity_seconds")]
    pub capacity_seconds: usize,
}

fn default_capacity_seconds() -> usize {
    crate::buffer::DEFAULT_CAPACITY_SECONDS
}

/// Event-bus connection settings (`mqtt.json`).
#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    pub server_address: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,
    #[serde(default = "default_status_topic")]
    pub topic_status: String,
}

fn default_mqtt_port() -> u16 {
    1883
}
fn default_topic_prefix() -> String {
    "eventos".to_string()
}
fn default_status_topic() -> String {
    "status".to_string()
}

/// FIFO path (defaults to `/tmp/my_pipe` per §6).
fn default_fifo_path() -> std::path::PathBuf {
    std::path::PathBuf::from("/tmp/my_pipe")
}

/// Ingest settings (`ingest.json`, optional — falls back to defaults if absent).
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_fifo_path")]
    pub fifo_path: std::path::PathBuf,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { fifo_path: default_fifo_path() }
    }
}

/// Everything read once at startup.
#[derive(Debug, Clone)]
pub struct StationConfig {
    pub device: DeviceConfig,
    pub inference: InferenceConfig,
    pub buffer: BufferConfig,
    pub mqtt: MqttConfig,
    pub ingest: IngestConfig,
    pub pick_log_path: std::path::PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_names_for_high_rate_seismometer() {
        let device = DeviceConfig {
            network: "XX".into(),
            station: "STA1".into(),
            location: "00".into(),
            channel_codes: "ZNE".into(),
            sampling_rate: 250.0,
            sensor_kind: SensorKind::Sismico,
            quality_flag: "D".into(),
        };
        assert_eq!(device.channel_names(), vec!["ELZ", "ELN", "ELE"]);
    }

    #[test]
    fn channel_names_for_low_rate_accelerometer() {
        let device = DeviceConfig {
            network: "XX".into(),
            station: "STA1".into(),
            location: "00".into(),
            channel_codes: "Z".into(),
            sampling_rate: 50.0,
            sensor_kind: SensorKind::Acelerometro,
            quality_flag: "D".into(),
        };
        assert_eq!(device.channel_names(), vec!["SNZ"]);
    }
}
