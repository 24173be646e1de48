//! Shared shutdown-aware sleep used by every task loop that waits on a timer.
//!
//! A single long `thread::sleep` can't notice `running` going false until it
//! wakes up; this breaks the wait into short steps so the flag is observed
//! within one step instead of only after the full duration elapses.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const POLL_STEP: Duration = Duration::from_millis(200);

/// Sleep for `total`, checking `running` every [`POLL_STEP`] and returning early
/// if it is cleared.
pub(crate) fn sleep_interruptible(total: Duration, running: &Arc<AtomicBool>) {
    let mut remaining = total;
    while remaining > Duration::ZERO && running.load(Ordering::Relaxed) {
        let step = remaining.min(POLL_STEP);
        std::thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }
}
