//! Deterministic host for driving coalescers under a manual clock.

use std::sync::Arc;
use std::time::Duration;

use crate::clock::ManualClock;
use crate::frame::FrameQueue;
use crate::timer::TimerQueue;

/// A manual clock with a timer queue and a frame queue attached.
///
/// [`advance`](Self::advance) walks the clock through every timer deadline
/// in the interval, firing each timer at exactly its deadline. Frames only
/// tick when [`run_frame`](Self::run_frame) is called.
pub struct SimulatedHost {
    clock: Arc<ManualClock>,
    timers: Arc<TimerQueue>,
    frames: Arc<FrameQueue>,
}

impl SimulatedHost {
    /// Create a host with its clock at zero.
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new());
        Self {
            timers: Arc::new(TimerQueue::new(clock.clone())),
            frames: Arc::new(FrameQueue::new(clock.clone())),
            clock,
        }
    }

    /// The manual clock.
    pub fn clock(&self) -> Arc<ManualClock> {
        self.clock.clone()
    }

    /// The timer queue.
    pub fn timers(&self) -> Arc<TimerQueue> {
        self.timers.clone()
    }

    /// The frame queue.
    pub fn frames(&self) -> Arc<FrameQueue> {
        self.frames.clone()
    }

    /// Time elapsed since the host was created.
    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Move time forward by `by`, firing timers as their deadlines pass.
    ///
    /// Returns the number of timers fired.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.clock.origin() + self.clock.elapsed() + by;
        let mut fired = 0;

        while let Some(deadline) = self.timers.next_deadline() {
            if deadline > target {
                break;
            }
            self.clock
                .set_elapsed(deadline.saturating_duration_since(self.clock.origin()));
            fired += self.timers.process_expired();
        }

        self.clock
            .set_elapsed(target.saturating_duration_since(self.clock.origin()));
        crate::rasterman_trace!(elapsed = ?self.clock.elapsed(), fired, "simulated time advanced");
        fired
    }

    /// Reach one frame boundary. Returns the number of frame callbacks run.
    pub fn run_frame(&self) -> usize {
        self.frames.tick()
    }
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new()
    }
}
