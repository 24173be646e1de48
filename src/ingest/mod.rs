//! FIFO reader task (§4.C): read loop turning raw frames into [`CircularBuffer`]
//! pushes, interruptible by the supervisor's shutdown flag.
//!
//! The retry/resync protocol is written against [`FrameSource`] rather than
//! directly against a named pipe, the same seam-via-trait idiom used elsewhere in
//! this codebase to keep protocol logic testable without a privileged `mkfifo`
//! environment. The production [`FifoSource`] opens the pipe non-blocking and
//! waits on `poll(2)` with a bounded timeout, so the reader always wakes up to
//! recheck `running` instead of blocking on `read()` until the digitizer writes
//! or closes — the same "don't let a file descriptor block shutdown" problem the
//! corpus solves with `O_NONBLOCK` + `poll` for other long-lived FIFO readers.

use std::io::{self, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use nix::fcntl::OFlag;
use nix::poll::{poll, PollFd, PollFlags};

use crate::buffer::CircularBuffer;
use crate::frame::{self, FRAME_SIZE};
use crate::shutdown::sleep_interruptible;
use crate::stats::Stats;

/// Time to wait before retrying to open a FIFO that doesn't exist yet, or to
/// reopen one after the writer closed it. Broken into short slices by
/// [`sleep_interruptible`] so a shutdown request is never held up by it.
const REOPEN_RETRY: Duration = Duration::from_secs(5);

/// How long one `read_frame` call waits for the fd to become readable before
/// giving the caller a chance to recheck `running`.
const POLL_TIMEOUT: Duration = Duration::from_millis(500);

/// A readable byte source producing the digitizer's frame stream.
pub trait FrameSource {
    /// Wait up to `poll_timeout` for data, then read into `buf`.
    ///
    /// Returns `Ok(None)` if nothing arrived within `poll_timeout` (the caller
    /// should recheck its cancellation flag and call again), `Ok(Some(n))` for an
    /// actual read (`n == 0` means EOF — the writer closed its end), or `Err` on
    /// I/O failure. A short read (`0 < n < buf.len()`) is a partial frame,
    /// discarded by the caller and never resynced against — see §4.C.
    fn read_frame(&mut self, buf: &mut [u8], poll_timeout: Duration) -> io::Result<Option<usize>>;
}

/// Production frame source: a named FIFO opened non-blocking so a stalled or
/// absent writer never hangs the read past `poll_timeout`.
pub struct FifoSource {
    path: PathBuf,
    file: Option<std::fs::File>,
}

impl FifoSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path, file: None }
    }

    fn ensure_open(&mut self) -> io::Result<&mut std::fs::File> {
        if self.file.is_none() {
            let file = std::fs::OpenOptions::new()
                .read(true)
                .custom_flags(OFlag::O_NONBLOCK.bits())
                .open(&self.path)?;
            self.file = Some(file);
        }
        Ok(self.file.as_mut().expect("just set"))
    }
}

impl FrameSource for FifoSource {
    fn read_frame(&mut self, buf: &mut [u8], poll_timeout: Duration) -> io::Result<Option<usize>> {
        let file = self.ensure_open()?;
        let mut fds = [PollFd::new(file.as_raw_fd(), PollFlags::POLLIN)];
        let timeout_ms = poll_timeout.as_millis().min(i32::MAX as u128) as i32;
        let ready = poll(&mut fds, timeout_ms).map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        if ready == 0 {
            return Ok(None);
        }

        match file.read(buf) {
            Ok(0) => {
                // EOF: either the writer closed its end, or none has ever
                // connected (a non-blocking FIFO with no writer reads as EOF
                // rather than blocking). Drop the handle so the next call reopens.
                self.file = None;
                Ok(Some(0))
            }
            Ok(n) => Ok(Some(n)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => {
                self.file = None;
                Err(e)
            }
        }
    }
}

/// Run the ingest loop until `running` is cleared. Reopens `source` on open
/// failure (FIFO not yet created by the digitizer driver) or EOF (writer
/// disconnected) after [`REOPEN_RETRY`]; a short read (partial frame) is
/// discarded and counted, never resynced byte-by-byte, per §4.C.
pub fn run(mut source: impl FrameSource, buffer: &CircularBuffer, stats: &Stats, running: &Arc<AtomicBool>) {
    let mut raw = vec![0u8; FRAME_SIZE];

    while running.load(Ordering::Relaxed) {
        match source.read_frame(&mut raw, POLL_TIMEOUT) {
            Ok(None) => continue,
            Ok(Some(0)) => {
                sleep_interruptible(REOPEN_RETRY, running);
            }
            Ok(Some(n)) if n == FRAME_SIZE => {
                stats.record_frame_received(n);
                match frame::decode(&raw) {
                    Ok(record) => buffer.push(record, stats),
                    Err(e) => {
                        warn!("dropping malformed frame: {e}");
                        match e {
                            crate::error::DecodeError::BadSize { .. } => stats.record_invalid_size(),
                            crate::error::DecodeError::BadTimestamp { .. } => stats.record_invalid_timestamp(),
                        }
                    }
                }
            }
            Ok(Some(n)) => {
                warn!("short read of {n} bytes, discarding (no resync)");
                stats.record_invalid_size();
            }
            Err(e) => {
                error!("fifo read failed: {e}, retrying in {:?}", REOPEN_RETRY);
                sleep_interruptible(REOPEN_RETRY, running);
            }
        }
    }
    info!("ingest task shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct FakeSource {
        chunks: VecDeque<Vec<u8>>,
    }

    impl FrameSource for FakeSource {
        fn read_frame(&mut self, buf: &mut [u8], _poll_timeout: Duration) -> io::Result<Option<usize>> {
            match self.chunks.pop_front() {
                Some(chunk) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    Ok(Some(n))
                }
                None => Ok(Some(0)),
            }
        }
    }

    fn valid_frame() -> Vec<u8> {
        let mut raw = vec![0u8; FRAME_SIZE];
        raw[2500] = 25; // yy
        raw[2501] = 12; // mm
        raw[2502] = 10; // dd
        raw
    }

    #[test]
    fn pushes_well_formed_frames_and_counts_short_reads() {
        let buffer = CircularBuffer::new(10);
        let stats = Stats::new();
        let running = Arc::new(AtomicBool::new(true));

        let good = valid_frame();
        let short = vec![0u8; 100];
        let running_clone = running.clone();

        let source = FakeSource { chunks: VecDeque::from(vec![good, short]) };

        // Run in a loop that stops itself after both chunks are drained, since a real
        // FakeSource returning Ok(Some(0)) afterwards would otherwise sleep for
        // REOPEN_RETRY inside the shared `run` loop; instead we drive it by hand here.
        let mut source = source;
        let mut raw = vec![0u8; FRAME_SIZE];
        for _ in 0..2 {
            let n = source.read_frame(&mut raw, Duration::ZERO).unwrap().unwrap();
            if n == FRAME_SIZE {
                stats.record_frame_received(n);
                if let Ok(record) = frame::decode(&raw) {
                    buffer.push(record, &stats);
                }
            } else if n > 0 {
                stats.record_invalid_size();
            }
        }
        running_clone.store(false, Ordering::Relaxed);

        assert_eq!(buffer.stats().len, 1);
        assert_eq!(stats.snapshot().frames_invalid_size, 1);
    }
}
