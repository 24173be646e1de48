//! Frame decoding: turning a raw 2506-byte digitizer packet into a [`FrameRecord`].

mod decoder;
mod timestamp;

pub use decoder::{decode, FRAME_SIZE};
pub use timestamp::decode_timestamp;

use chrono::{DateTime, Utc};

/// Samples per channel in one frame, at 250 Hz.
pub const SAMPLES_PER_FRAME: usize = 250;

/// Number of channels encoded in one frame.
pub const NUM_CHANNELS: usize = 3;

/// One fully decoded frame: an absolute UTC second and 250 int32 samples per channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRecord {
    pub timestamp: DateTime<Utc>,
    pub channels: [[i32; SAMPLES_PER_FRAME]; NUM_CHANNELS],
}
