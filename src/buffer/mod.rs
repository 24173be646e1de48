//! Time-indexed bounded circular buffer of decoded frame segments.
//!
//! Mirrors the "deque with `maxlen` semantics → fixed-capacity ring buffer" design
//! note: a fixed-size array of `Option<Segment>` plus head/len, not a dynamic
//! collection with eviction. A single [`parking_lot::Mutex`] serializes every access
//! (push is ~1 Hz, extract is ~1 per inference interval — contention is bounded by
//! construction, see §4.B).

mod window;

pub use window::Window;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::frame::{FrameRecord, NUM_CHANNELS, SAMPLES_PER_FRAME};
use crate::stats::Stats;

/// Default capacity in seconds (~30 minutes at 1 segment/second).
pub const DEFAULT_CAPACITY_SECONDS: usize = 1800;

/// Sampling rate of each stored segment, in Hz.
pub const SEGMENT_RATE_HZ: usize = 250;

/// One second of acquisition: a decoded frame kept verbatim in the ring.
pub type Segment = FrameRecord;

struct Inner {
    slots: Vec<Option<Segment>>,
    /// Index in `slots` of the oldest occupied slot.
    head: usize,
    /// Number of occupied slots.
    len: usize,
}

impl Inner {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn push(&mut self, record: Segment) {
        if self.len == self.capacity() {
            // Evict oldest: overwrite head, advance head.
            let idx = self.head;
            self.slots[idx] = Some(record);
            self.head = (self.head + 1) % self.capacity();
        } else {
            let idx = (self.head + self.len) % self.capacity();
            self.slots[idx] = Some(record);
            self.len += 1;
        }
    }

    fn iter(&self) -> impl Iterator<Item = &Segment> {
        (0..self.len).map(move |i| {
            let idx = (self.head + i) % self.capacity();
            self.slots[idx].as_ref().expect("occupied slot within len")
        })
    }

    fn find(&self, ts: DateTime<Utc>) -> Option<&Segment> {
        // Segments are stored in non-decreasing timestamp order; binary search the
        // logical (unwrapped) index range for O(log N) lookup.
        let mut lo = 0usize;
        let mut hi = self.len;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let idx = (self.head + mid) % self.capacity();
            let seg = self.slots[idx].as_ref().expect("occupied slot within len");
            match seg.timestamp.cmp(&ts) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => return Some(seg),
            }
        }
        None
    }
}

/// Snapshot of the buffer's current occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferStats {
    pub len: usize,
    pub capacity: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

/// Thread-safe bounded ring of [`Segment`]s, shared by exactly one producer (the
/// ingest task, via [`CircularBuffer::push`]) and one consumer (the inference task,
/// via [`CircularBuffer::extract`]).
pub struct CircularBuffer {
    inner: Mutex<Inner>,
}

impl CircularBuffer {
    pub fn new(capacity_seconds: usize) -> Self {
        assert!(capacity_seconds > 0, "circular buffer capacity must be positive");
        Self {
            inner: Mutex::new(Inner {
                slots: (0..capacity_seconds).map(|_| None).collect(),
                head: 0,
                len: 0,
            }),
        }
    }

    /// Append one segment. If the buffer is full, the oldest segment is evicted.
    /// O(1) amortized. Records a `buffer_rotations` event in `stats` on eviction.
    pub fn push(&self, record: Segment, stats: &Stats) {
        let mut inner = self.inner.lock();
        let was_full = inner.len == inner.capacity();
        inner.push(record);
        if was_full {
            stats.record_rotation();
        }
    }

    /// Extract a `duration_s`-second window ending at `end_time` (defaults to the
    /// latest stored timestamp). Returns `None` if the buffer is empty or if fewer
    /// than `duration_s` seconds of wall-clock time precede `end_time`. Missing
    /// seconds within the range are left zero-filled.
    pub fn extract(&self, duration_s: usize, end_time: Option<DateTime<Utc>>) -> Option<Window> {
        let inner = self.inner.lock();
        if inner.len == 0 {
            return None;
        }
        let newest = inner.iter().last()?.timestamp;
        let oldest = inner.iter().next()?.timestamp;
        let end = end_time.unwrap_or(newest);

        let start = end - chrono::Duration::seconds(duration_s.saturating_sub(1) as i64);
        if start < oldest {
            return None;
        }

        let mut window = Window::zeroed(start, duration_s);
        for second in 0..duration_s {
            let ts = start + chrono::Duration::seconds(second as i64);
            if let Some(seg) = inner.find(ts) {
                let offset = second * SEGMENT_RATE_HZ;
                for ch in 0..NUM_CHANNELS {
                    window.channels[ch][offset..offset + SAMPLES_PER_FRAME]
                        .copy_from_slice(&seg.channels[ch]);
                }
            }
        }
        Some(window)
    }

    /// Timestamp of the most recently pushed segment, if any.
    pub fn latest_time(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().iter().last().map(|s| s.timestamp)
    }

    /// `(oldest, newest)` timestamps currently retained, if any.
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let inner = self.inner.lock();
        let oldest = inner.iter().next()?.timestamp;
        let newest = inner.iter().last()?.timestamp;
        Some((oldest, newest))
    }

    pub fn stats(&self) -> BufferStats {
        let inner = self.inner.lock();
        BufferStats {
            len: inner.len,
            capacity: inner.capacity(),
            oldest: inner.iter().next().map(|s| s.timestamp),
            newest: inner.iter().last().map(|s| s.timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn seg_at(ts: DateTime<Utc>, fill: i32) -> Segment {
        FrameRecord {
            timestamp: ts,
            channels: [[fill; SAMPLES_PER_FRAME]; NUM_CHANNELS],
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 10, 15, 0, 0).unwrap()
    }

    #[test]
    fn monotonicity_and_size_bound() {
        let buf = CircularBuffer::new(10);
        let stats = Stats::new();
        for i in 0..10 {
            buf.push(seg_at(t0() + chrono::Duration::seconds(i), i as i32), &stats);
        }
        let (lo, hi) = buf.time_range().unwrap();
        assert!(lo <= hi);
        assert_eq!(buf.stats().len, 10);
    }

    #[test]
    fn eviction_drops_oldest_k() {
        let buf = CircularBuffer::new(10);
        let stats = Stats::new();
        for i in 0..15 {
            buf.push(seg_at(t0() + chrono::Duration::seconds(i), i as i32), &stats);
        }
        assert_eq!(stats.snapshot().buffer_rotations, 5);
        let (lo, _) = buf.time_range().unwrap();
        assert_eq!(lo, t0() + chrono::Duration::seconds(5));
    }

    #[test]
    fn extraction_gap_fill() {
        let buf = CircularBuffer::new(10);
        let stats = Stats::new();
        buf.push(seg_at(t0(), 1), &stats);
        // t0+1 missing
        buf.push(seg_at(t0() + chrono::Duration::seconds(2), 2), &stats);

        let window = buf.extract(3, Some(t0() + chrono::Duration::seconds(2))).unwrap();
        for ch in 0..NUM_CHANNELS {
            assert_eq!(window.channels[ch][0..250], [1; 250]);
            assert_eq!(window.channels[ch][250..500], [0; 250]);
            assert_eq!(window.channels[ch][500..750], [2; 250]);
        }
    }

    #[test]
    fn gap_scenario_s3() {
        let buf = CircularBuffer::new(200);
        let stats = Stats::new();
        for i in 0..60 {
            buf.push(seg_at(t0() + chrono::Duration::seconds(i), 7), &stats);
        }
        // skip t0+60
        for i in 61..120 {
            buf.push(seg_at(t0() + chrono::Duration::seconds(i), 7), &stats);
        }
        let window = buf.extract(120, Some(t0() + chrono::Duration::seconds(119))).unwrap();
        assert_eq!(window.channels[0][60 * 250..61 * 250], [0; 250]);
        assert_eq!(window.channels[0][0..250], [7; 250]);
        assert_eq!(window.channels[0][119 * 250..120 * 250], [7; 250]);
    }

    #[test]
    fn overflow_scenario_s4() {
        let buf = CircularBuffer::new(10);
        let stats = Stats::new();
        for i in 0..15 {
            buf.push(seg_at(t0() + chrono::Duration::seconds(i), i as i32), &stats);
        }
        let window = buf.extract(10, None).unwrap();
        assert_eq!(window.start_time, t0() + chrono::Duration::seconds(5));
        assert!(buf.extract(11, None).is_none());
    }

    #[test]
    fn empty_buffer_returns_none() {
        let buf = CircularBuffer::new(10);
        assert!(buf.extract(1, None).is_none());
    }
}
