//! Refresh pacing for the render loop.
//!
//! The loop is a chain of one-shot frame requests: each rendered frame asks
//! for the next one, and stopping cancels whatever is pending.

use std::time::{Duration, Instant};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

pub trait FrameScheduler {
    /// Ask for one frame callback.
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
    /// Hand out the frame that is due now, if any.
    fn poll_due(&mut self) -> Option<FrameHandle>;
}

/// Wall-clock scheduler with a minimum interval between frames.
#[derive(Debug)]
pub struct RefreshScheduler {
    interval: Duration,
    next_id: u64,
    pending: Option<(FrameHandle, Instant)>,
    last_frame: Option<Instant>,
}

impl RefreshScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_id: 0,
            pending: None,
            last_frame: None,
        }
    }

    /// Time left until the pending frame is due. `None` when nothing is pending.
    pub fn time_until_due(&self) -> Option<Duration> {
        self.pending
            .map(|(_, due)| due.saturating_duration_since(Instant::now()))
    }
}

impl FrameScheduler for RefreshScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next_id);
        self.next_id += 1;
        let due = match self.last_frame {
            Some(last) => last + self.interval,
            None => Instant::now(),
        };
        self.pending = Some((handle, due));
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if matches!(self.pending, Some((h, _)) if h == handle) {
            self.pending = None;
        }
    }

    fn poll_due(&mut self) -> Option<FrameHandle> {
        let (handle, due) = self.pending?;
        let now = Instant::now();
        if now < due {
            return None;
        }
        self.pending = None;
        self.last_frame = Some(now);
        Some(handle)
    }
}
