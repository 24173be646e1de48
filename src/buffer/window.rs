//! Materialized time-range extraction from the circular buffer.

use chrono::{DateTime, Utc};

use crate::frame::{NUM_CHANNELS, SAMPLES_PER_FRAME};

use super::SEGMENT_RATE_HZ;

/// A contiguous, densely materialized time range, inclusive of its first and last
/// second. Missing seconds are zero-filled (see [`CircularBuffer::extract`][super::CircularBuffer::extract]).
#[derive(Debug, Clone)]
pub struct Window {
    pub start_time: DateTime<Utc>,
    pub duration_s: usize,
    pub channels: [Vec<i32>; NUM_CHANNELS],
}

impl Window {
    pub(super) fn zeroed(start_time: DateTime<Utc>, duration_s: usize) -> Self {
        let len = duration_s * SEGMENT_RATE_HZ;
        Self {
            start_time,
            duration_s,
            channels: std::array::from_fn(|_| vec![0i32; len]),
        }
    }

    /// Number of samples per channel (`duration_s * 250`).
    pub fn len_samples(&self) -> usize {
        self.duration_s * SAMPLES_PER_FRAME
    }
}
