//! Process supervisor (§4.G): composes the ingest, inference and reporter tasks as
//! real OS threads sharing one [`CircularBuffer`] and one [`Stats`], and wires
//! `ctrlc` to a shared cancel flag checked by all three.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info};

use crate::bus::EventBus;
use crate::buffer::CircularBuffer;
use crate::config::StationConfig;
use crate::ingest::{self, FifoSource};
use crate::inference::{run_inference, OrtPhaseModel, WindowMeta};
use crate::postprocess::Postprocessor;
use crate::preprocess::preprocess;
use crate::registry::UploadRegistry;
use crate::shutdown::sleep_interruptible;
use crate::stats::Stats;

const REPORTER_INTERVAL: Duration = Duration::from_secs(60);

/// Upper bound on how long `run` waits for a task to unwind once shutdown has
/// been requested (§4.G: "join reader ≤5 s; join inference ≤5 s"). Every task
/// loop already rechecks `running` on a sub-second interval — the ingest task
/// via its `poll` timeout, inference/reporter via [`sleep_interruptible`] — so in
/// practice each exits almost immediately; this is a backstop against a task
/// wedged somewhere this crate doesn't control, not the normal exit path.
const SHUTDOWN_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything the three tasks share; owned by `main` and handed out by reference
/// or `Arc` to each spawned thread.
pub struct Station {
    pub config: StationConfig,
    pub buffer: Arc<CircularBuffer>,
    pub stats: Arc<Stats>,
    pub running: Arc<AtomicBool>,
}

impl Station {
    pub fn new(config: StationConfig) -> Self {
        let buffer = Arc::new(CircularBuffer::new(config.buffer.capacity_seconds));
        Self { config, buffer, stats: Arc::new(Stats::new()), running: Arc::new(AtomicBool::new(true)) }
    }

    /// Install a SIGINT/SIGTERM handler that clears `running`. Must be called once,
    /// before spawning tasks.
    pub fn install_shutdown_handler(&self) {
        let running = self.running.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            info!("shutdown signal received");
            running.store(false, Ordering::Relaxed);
        }) {
            error!("failed to install signal handler: {e}");
        }
    }

    fn spawn_reader(&self) -> thread::JoinHandle<()> {
        let buffer = self.buffer.clone();
        let stats = self.stats.clone();
        let running = self.running.clone();
        let fifo_path = self.config.ingest.fifo_path.clone();

        thread::spawn(move || {
            let source = FifoSource::new(fifo_path);
            ingest::run(source, &buffer, &stats, &running);
        })
    }

    fn spawn_inference(&self, model: OrtPhaseModel, bus: Arc<EventBus>) -> thread::JoinHandle<()> {
        let buffer = self.buffer.clone();
        let stats = self.stats.clone();
        let running = self.running.clone();
        let inference_cfg = self.config.inference.clone();
        let meta = WindowMeta {
            network: self.config.device.network.clone(),
            station: self.config.device.station.clone(),
            channel: self.config.device.channel_names().into_iter().next().unwrap_or_default(),
        };
        let pick_log_path = self.config.pick_log_path.clone();

        thread::spawn(move || {
            let mut model = model;
            let mut postprocessor = match Postprocessor::open(&pick_log_path) {
                Ok(p) => p,
                Err(e) => {
                    error!("failed to open pick log, inference task exiting: {e}");
                    return;
                }
            };

            while running.load(Ordering::Relaxed) {
                sleep_interruptible(Duration::from_secs(inference_cfg.inference_interval_seconds), &running);
                if !running.load(Ordering::Relaxed) {
                    break;
                }

                let window = match buffer.extract(inference_cfg.inference_window_seconds, None) {
                    Some(w) => w,
                    None => continue,
                };

                let preprocessed = match preprocess(&window, inference_cfg.freq_min, inference_cfg.freq_max) {
                    Ok(p) => p,
                    Err(e) => {
                        error!("preprocessing failed: {e}");
                        continue;
                    }
                };

                let picks = match run_inference(
                    &preprocessed,
                    &mut model,
                    inference_cfg.min_probability,
                    &meta,
                    &stats,
                ) {
                    Ok(picks) => picks,
                    Err(e) => {
                        error!("inference failed: {e}");
                        continue;
                    }
                };

                if !picks.is_empty() {
                    postprocessor.process(picks, &bus, &stats);
                }
            }
            info!("inference task shutting down");
        })
    }

    fn spawn_reporter(&self) -> thread::JoinHandle<()> {
        let stats = self.stats.clone();
        let buffer = self.buffer.clone();
        let running = self.running.clone();

        thread::spawn(move || {
            while running.load(Ordering::Relaxed) {
                sleep_interruptible(REPORTER_INTERVAL, &running);
                if !running.load(Ordering::Relaxed) {
                    break;
                }
                let snapshot = stats.snapshot();
                let buf_stats = buffer.stats();
                info!(
                    "stats: frames={} invalid_size={} invalid_ts={} picks={} buffer_len={}/{}",
                    snapshot.frames_received,
                    snapshot.frames_invalid_size,
                    snapshot.frames_invalid_timestamp,
                    snapshot.picks_emitted,
                    buf_stats.len,
                    buf_stats.capacity,
                );
            }
            info!("reporter task shutting down");
        })
    }

    /// Spawn all three tasks and block until shutdown has fully drained. `model`
    /// and `bus` are moved into the inference task, the only task that touches
    /// either.
    pub fn run(&self, model: OrtPhaseModel, bus: EventBus) {
        let bus = Arc::new(bus);
        let reader = self.spawn_reader();
        let inference = self.spawn_inference(model, bus);
        let reporter = self.spawn_reporter();

        // Block here for the station's lifetime. Every task loop rechecks
        // `running` on its own short interval, so once it's cleared (the ctrlc
        // handler, or a task's own fatal error) they all wind down within that
        // interval rather than this thread's poll rate.
        while self.running.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_millis(200));
        }

        join_bounded(reader, "reader", SHUTDOWN_JOIN_TIMEOUT);
        join_bounded(inference, "inference", SHUTDOWN_JOIN_TIMEOUT);
        join_bounded(reporter, "reporter", SHUTDOWN_JOIN_TIMEOUT);

        let snapshot = self.stats.snapshot();
        let buf_stats = self.buffer.stats();
        info!(
            "final stats: frames={} invalid_size={} invalid_ts={} picks={} buffer_len={}/{}",
            snapshot.frames_received,
            snapshot.frames_invalid_size,
            snapshot.frames_invalid_timestamp,
            snapshot.picks_emitted,
            buf_stats.len,
            buf_stats.capacity,
        );
    }

    /// Construct the upload registry collaborator (§H), rooted alongside the pick
    /// log.
    pub fn open_registry(&self) -> std::io::Result<UploadRegistry> {
        let registry_path = self
            .config
            .pick_log_path
            .parent()
            .map(|p| p.join("uploaded_files_registry.json"))
            .unwrap_or_else(|| std::path::PathBuf::from("uploaded_files_registry.json"));
        UploadRegistry::open(registry_path)
    }
}

/// Join `handle`, allowing up to `timeout` for it to finish. Intended to be
/// called only once shutdown has already been requested; abandons the thread
/// (rather than blocking indefinitely) if it overruns the deadline.
fn join_bounded(handle: thread::JoinHandle<()>, name: &str, timeout: Duration) {
    let start = Instant::now();
    while !handle.is_finished() {
        if start.elapsed() >= timeout {
            error!("{name} task did not shut down within {timeout:?}, abandoning its thread");
            return;
        }
        thread::sleep(Duration::from_millis(50));
    }
    if let Err(e) = handle.join() {
        error!("{name} task panicked: {e:?}");
    }
}
