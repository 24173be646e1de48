//! Process-wide monotonic counters, updated lock-free from any task.
//!
//! Mirrors the atomics-snapshot pattern used for the RTP input path's `InputStats`:
//! each field is an independent atomic, and a snapshot is a plain `Copy` struct taken
//! with a single `Ordering::Relaxed` load per field (exact ordering across fields is
//! not required, only monotonicity of each).

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters shared by the ingest, inference and reporter tasks.
#[derive(Default)]
pub struct Stats {
    pub frames_received: AtomicU64,
    pub frames_invalid_size: AtomicU64,
    pub frames_invalid_timestamp: AtomicU64,
    pub bytes_received: AtomicU64,
    pub buffer_rotations: AtomicU64,
    pub picks_emitted: AtomicU64,
    pub inference_batches: AtomicU64,
    pub inference_wall_ns: AtomicU64,
}

/// Point-in-time copy of [`Stats`], cheap to log or serialize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub frames_received: u64,
    pub frames_invalid_size: u64,
    pub frames_invalid_timestamp: u64,
    pub bytes_received: u64,
    pub buffer_rotations: u64,
    pub picks_emitted: u64,
    pub inference_batches: u64,
    pub inference_wall_ns: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_invalid_size: self.frames_invalid_size.load(Ordering::Relaxed),
            frames_invalid_timestamp: self.frames_invalid_timestamp.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            buffer_rotations: self.buffer_rotations.load(Ordering::Relaxed),
            picks_emitted: self.picks_emitted.load(Ordering::Relaxed),
            inference_batches: self.inference_batches.load(Ordering::Relaxed),
            inference_wall_ns: self.inference_wall_ns.load(Ordering::Relaxed),
        }
    }

    pub fn record_frame_received(&self, bytes: usize) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_invalid_size(&self) {
        self.frames_invalid_size.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid_timestamp(&self) {
        self.frames_invalid_timestamp.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rotation(&self) {
        self.buffer_rotations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_picks(&self, n: u64) {
        self.picks_emitted.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_inference_batch(&self, wall_ns: u64) {
        self.inference_batches.fetch_add(1, Ordering::Relaxed);
        self.inference_wall_ns.fetch_add(wall_ns, Ordering::Relaxed);
    }
}
