//! Binary entry point: load config from the one directory path given on the
//! command line, install logging, load the ONNX model, connect the event bus,
//! and run the station until shutdown.

use std::path::PathBuf;
use std::process::ExitCode;

use gpd_station::bus::EventBus;
use gpd_station::config;
use gpd_station::inference::OrtPhaseModel;
use gpd_station::supervisor::Station;
use log::{error, info};

/// CLI parsing proper is a Non-goal; this reads the one argument the binary needs
/// (the config directory) by hand, the way a small ops tool in this corpus does it
/// when argument parsing isn't the point of the crate.
fn parse_config_dir() -> Result<PathBuf, String> {
    let mut args = std::env::args().skip(1);
    match args.next() {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => Err("usage: gpd-station <config-dir>".to_string()),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_dir = match parse_config_dir() {
        Ok(dir) => dir,
        Err(msg) => {
            error!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let pick_log_path = config_dir.join("picks.log");
    let station_config = match config::load_all(&config_dir, pick_log_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("fatal: failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let model = match OrtPhaseModel::load(
        &station_config.inference.model_path,
        station_config.inference.batch_size,
        station_config.inference.num_threads,
    ) {
        Ok(m) => m,
        Err(e) => {
            error!("fatal: failed to load model: {e}");
            return ExitCode::FAILURE;
        }
    };

    let bus = EventBus::connect(&station_config.mqtt, &station_config.device.station);

    let station = Station::new(station_config);
    station.install_shutdown_handler();

    info!("station starting");
    station.run(model, bus);
    info!("station shut down cleanly");

    ExitCode::SUCCESS
}
