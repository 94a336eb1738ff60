//! A real-time driver for the timer and frame queues.
//!
//! [`EventLoop`] is the host used outside tests: it owns a clock, a
//! [`TimerQueue`] and a [`FrameQueue`], fires timers as their deadlines pass
//! and ticks frames at a fixed interval. Coalescers are handed its queues as
//! their [`TimerService`](crate::TimerService) and
//! [`FrameService`](crate::FrameService).

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::frame::FrameQueue;
use crate::logging::targets;
use crate::timer::TimerQueue;

/// Default frame interval, roughly 60 frames per second.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Drives a timer queue and a frame queue against a clock.
pub struct EventLoop {
    clock: Arc<dyn Clock>,
    timers: Arc<TimerQueue>,
    frames: Arc<FrameQueue>,
    frame_interval: Duration,
    last_frame: Mutex<Option<Instant>>,
}

impl EventLoop {
    /// Create an event loop on the system clock.
    pub fn new(frame_interval: Duration) -> Self {
        Self::with_clock(Arc::new(SystemClock), frame_interval)
    }

    /// Create an event loop on an explicit clock.
    pub fn with_clock(clock: Arc<dyn Clock>, frame_interval: Duration) -> Self {
        Self {
            timers: Arc::new(TimerQueue::new(clock.clone())),
            frames: Arc::new(FrameQueue::new(clock.clone())),
            clock,
            frame_interval,
            last_frame: Mutex::new(None),
        }
    }

    /// The timer queue.
    pub fn timers(&self) -> Arc<TimerQueue> {
        self.timers.clone()
    }

    /// The frame queue.
    pub fn frames(&self) -> Arc<FrameQueue> {
        self.frames.clone()
    }

    /// The interval between frame boundaries.
    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Whether any timer or frame request is outstanding.
    pub fn has_work(&self) -> bool {
        self.timers.active_count() > 0 || self.frames.has_pending()
    }

    /// When the next frame boundary is due.
    fn next_frame_at(&self) -> Option<Instant> {
        if !self.frames.has_pending() {
            return None;
        }
        Some(match *self.last_frame.lock() {
            Some(last) => last + self.frame_interval,
            None => self.clock.now(),
        })
    }

    /// Fire due timers, then tick frames if a frame boundary is due.
    ///
    /// Returns the number of callbacks run.
    pub fn run_pending(&self) -> usize {
        let mut ran = self.timers.process_expired();

        let now = self.clock.now();
        if let Some(due) = self.next_frame_at() {
            if due <= now {
                *self.last_frame.lock() = Some(now);
                ran += self.frames.tick();
            }
        }
        ran
    }

    /// Run until nothing is pending or `limit` has elapsed.
    ///
    /// Sleeps between steps until the next timer deadline or frame
    /// boundary. Returns the number of callbacks run.
    pub fn run_until_idle(&self, limit: Duration) -> usize {
        let started = self.clock.now();
        let give_up = started + limit;
        let mut ran = 0;

        loop {
            ran += self.run_pending();

            if !self.has_work() {
                break;
            }

            let now = self.clock.now();
            if now >= give_up {
                tracing::debug!(
                    target: targets::EVENT_LOOP,
                    timers = self.timers.active_count(),
                    frames = self.frames.pending_count(),
                    "run_until_idle limit reached with work outstanding"
                );
                break;
            }

            let wake = [self.timers.next_deadline(), self.next_frame_at()]
                .into_iter()
                .flatten()
                .min()
                .unwrap_or(give_up)
                .min(give_up);

            if wake > now {
                std::thread::sleep(wake - now);
            }
        }

        ran
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_INTERVAL)
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("frame_interval", &self.frame_interval)
            .field("timers", &self.timers.active_count())
            .field("frames", &self.frames.pending_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::frame::FrameService;
    use crate::timer::TimerService;

    #[test]
    fn test_run_pending_fires_due_timers() {
        let clock = Arc::new(ManualClock::new());
        let event_loop = EventLoop::with_clock(clock.clone(), DEFAULT_FRAME_INTERVAL);
        let fired = Arc::new(Mutex::new(0));

        let fired_clone = fired.clone();
        event_loop
            .timers()
            .start_timer(Duration::from_millis(10), Box::new(move || *fired_clone.lock() += 1));

        assert_eq!(event_loop.run_pending(), 0);
        clock.advance(Duration::from_millis(10));
        assert_eq!(event_loop.run_pending(), 1);
        assert_eq!(*fired.lock(), 1);
        assert!(!event_loop.has_work());
    }

    #[test]
    fn test_frames_respect_interval() {
        let clock = Arc::new(ManualClock::new());
        let event_loop = EventLoop::with_clock(clock.clone(), Duration::from_millis(16));
        let frames = event_loop.frames();

        frames.request_frame(Box::new(|_| {}));
        assert_eq!(event_loop.run_pending(), 1);

        frames.request_frame(Box::new(|_| {}));
        clock.advance(Duration::from_millis(8));
        assert_eq!(event_loop.run_pending(), 0);

        clock.advance(Duration::from_millis(8));
        assert_eq!(event_loop.run_pending(), 1);
    }

    #[test]
    fn test_run_until_idle_on_system_clock() {
        let event_loop = EventLoop::new(Duration::from_millis(1));
        let fired = Arc::new(Mutex::new(Vec::new()));

        for (delay, label) in [(5, "b"), (1, "a")] {
            let fired = fired.clone();
            event_loop
                .timers()
                .start_timer(Duration::from_millis(delay), Box::new(move || fired.lock().push(label)));
        }

        let ran = event_loop.run_until_idle(Duration::from_secs(2));
        assert_eq!(ran, 2);
        assert_eq!(*fired.lock(), vec!["a", "b"]);
    }

    #[test]
    fn test_run_until_idle_returns_when_empty() {
        let event_loop = EventLoop::default();
        assert_eq!(event_loop.run_until_idle(Duration::from_secs(1)), 0);
    }
}
