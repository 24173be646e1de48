//! JSON file loading for the four configuration groups.

use std::fs;
use std::path::Path;

use crate::error::ConfigError;

use super::{BufferConfig, DeviceConfig, IngestConfig, InferenceConfig, MqttConfig, StationConfig};

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound { path: path.to_path_buf() });
    }
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load `device.json`, `inference.json`, `buffer.json`, and `mqtt.json` from
/// `config_dir`. `buffer.json` and `ingest.json` may be absent, in which case
/// defaults apply; the other two are required.
pub fn load_all(config_dir: &Path, pick_log_path: std::path::PathBuf) -> Result<StationConfig, ConfigError> {
    let device: DeviceConfig = read_json(&config_dir.join("device.json"))?;
    let inference: InferenceConfig = read_json(&config_dir.join("inference.json"))?;
    let mqtt: MqttConfig = read_json(&config_dir.join("mqtt.json"))?;

    let buffer_path = config_dir.join("buffer.json");
    let buffer: BufferConfig = if buffer_path.exists() {
        read_json(&buffer_path)?
    } else {
        BufferConfig { capacity_seconds: crate::buffer::DEFAULT_CAPACITY_SECONDS }
    };

    let ingest_path = config_dir.join("ingest.json");
    let ingest: IngestConfig = if ingest_path.exists() {
        read_json(&ingest_path)?
    } else {
        IngestConfig::default()
    };

    Ok(StationConfig { device, inference, buffer, mqtt, ingest, pick_log_path })
}
