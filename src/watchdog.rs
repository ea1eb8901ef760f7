//! Frame liveness watchdog.
//!
//! Fed once per captured frame. A stall is fatal: the caller restarts the
//! device rather than trying to recover in place.

use crate::clock::elapsed_ms;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StallCheck {
    Ok,
    Stalled { elapsed_ms: u64 },
}

pub fn check_stall(now_ms: u64, last_frame_ms: u64, timeout_ms: u64) -> StallCheck {
    let elapsed_ms = elapsed_ms(now_ms, last_frame_ms);
    if elapsed_ms > timeout_ms {
        StallCheck::Stalled { elapsed_ms }
    } else {
        StallCheck::Ok
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FrameWatchdog {
    last_frame_ms: u64,
    timeout_ms: u64,
}

impl FrameWatchdog {
    pub const fn new(now_ms: u64, timeout_ms: u64) -> Self {
        Self {
            last_frame_ms: now_ms,
            timeout_ms,
        }
    }

    pub fn feed(&mut self, now_ms: u64) {
        self.last_frame_ms = now_ms;
    }

    pub fn check(&self, now_ms: u64) -> StallCheck {
        check_stall(now_ms, self.last_frame_ms, self.timeout_ms)
    }

    pub fn last_frame_ms(&self) -> u64 {
        self.last_frame_ms
    }
}
