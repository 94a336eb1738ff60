//! One-shot timer service.
//!
//! [`TimerService`] is the capability the debounce coalescer needs from its
//! host: read the clock, start a one-shot timer, cancel it. [`TimerQueue`]
//! is the in-process implementation driven by an event loop or a test.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

use crate::clock::Clock;
use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a timer.
    pub struct TimerId;
}

/// A boxed timer callback.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// A host capability for one-shot timers.
pub trait TimerService: Send + Sync {
    /// The current instant according to the host's clock.
    fn now(&self) -> Instant;

    /// Run `callback` once, `delay` from now.
    fn start_timer(&self, delay: Duration, callback: TimerCallback) -> TimerId;

    /// Cancel a timer.
    ///
    /// Returns `true` if the timer was still pending. Cancelling a timer that
    /// already fired or was already cancelled returns `false`.
    fn cancel_timer(&self, id: TimerId) -> bool;
}

/// Internal timer data.
struct TimerData {
    deadline: Instant,
    callback: TimerCallback,
}

/// An entry in the timer queue (min-heap by deadline, then insertion order).
#[derive(Debug, Clone, Copy)]
struct TimerQueueEntry {
    id: TimerId,
    deadline: Instant,
    seq: u64,
}

impl PartialEq for TimerQueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for TimerQueueEntry {}

impl PartialOrd for TimerQueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerQueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (BinaryHeap is max-heap by default).
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct TimerQueueInner {
    timers: SlotMap<TimerId, TimerData>,
    queue: BinaryHeap<TimerQueueEntry>,
    next_seq: u64,
}

impl TimerQueueInner {
    /// Drop cancelled entries from the front of the heap.
    fn prune(&mut self) {
        while let Some(entry) = self.queue.peek() {
            if self.timers.contains_key(entry.id) {
                break;
            }
            self.queue.pop();
        }
    }

    /// Pop the next timer due at `now` that was started before `horizon`.
    fn pop_expired(&mut self, now: Instant, horizon: u64) -> Option<(TimerId, TimerCallback)> {
        self.prune();
        let entry = *self.queue.peek()?;
        if entry.deadline > now || entry.seq >= horizon {
            return None;
        }
        self.queue.pop();
        let data = self.timers.remove(entry.id)?;
        Some((entry.id, data.callback))
    }
}

/// An in-process timer queue.
///
/// Timers fire from [`process_expired`](Self::process_expired), in deadline
/// order and first-in-first-out for equal deadlines. Callbacks run with no
/// internal lock held, so a callback may freely start or cancel timers.
pub struct TimerQueue {
    clock: Arc<dyn Clock>,
    inner: Mutex<TimerQueueInner>,
}

impl TimerQueue {
    /// Create a timer queue reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: Mutex::new(TimerQueueInner::default()),
        }
    }

    /// The clock this queue reads.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Check if a timer is still pending.
    pub fn is_active(&self, id: TimerId) -> bool {
        self.inner.lock().timers.contains_key(id)
    }

    /// Get the number of pending timers.
    pub fn active_count(&self) -> usize {
        self.inner.lock().timers.len()
    }

    /// The earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        let mut inner = self.inner.lock();
        inner.prune();
        inner.queue.peek().map(|entry| entry.deadline)
    }

    /// Get the duration until the next timer fires, if any.
    ///
    /// Returns `None` if there are no pending timers.
    pub fn time_until_next(&self) -> Option<Duration> {
        let deadline = self.next_deadline()?;
        Some(deadline.saturating_duration_since(self.clock.now()))
    }

    /// Fire every timer whose deadline has passed.
    ///
    /// Timers started by a callback during this pass wait for the next pass,
    /// even when they are already due. Returns the number of timers fired.
    #[tracing::instrument(skip(self), target = "rasterman_core::timer", level = "trace")]
    pub fn process_expired(&self) -> usize {
        let now = self.clock.now();
        let horizon = self.inner.lock().next_seq;
        let mut fired = 0;

        loop {
            // The guard is released before the callback runs.
            let next = self.inner.lock().pop_expired(now, horizon);
            let Some((id, callback)) = next else {
                break;
            };
            tracing::trace!(target: targets::TIMER, ?id, "timer fired");
            callback();
            fired += 1;
        }

        fired
    }
}

impl TimerService for TimerQueue {
    fn now(&self) -> Instant {
        self.clock.now()
    }

    fn start_timer(&self, delay: Duration, callback: TimerCallback) -> TimerId {
        let deadline = self.clock.now() + delay;
        let mut inner = self.inner.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        let id = inner.timers.insert(TimerData { deadline, callback });
        inner.queue.push(TimerQueueEntry { id, deadline, seq });
        tracing::trace!(target: targets::TIMER, ?id, ?delay, "timer started");
        id
    }

    fn cancel_timer(&self, id: TimerId) -> bool {
        // The heap entry goes stale and is pruned lazily.
        let removed = self.inner.lock().timers.remove(id).is_some();
        if removed {
            tracing::trace!(target: targets::TIMER, ?id, "timer cancelled");
        }
        removed
    }
}

static_assertions::assert_impl_all!(TimerQueue: Send, Sync);
