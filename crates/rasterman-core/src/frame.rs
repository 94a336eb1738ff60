//! "Run this before the next paint" service.
//!
//! [`FrameService`] is the capability the frame coalescer needs from its
//! host, the equivalent of `requestAnimationFrame`. [`FrameQueue`] is the
//! in-process implementation: the host calls [`FrameQueue::tick`] once per
//! display refresh.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

use crate::clock::Clock;
use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a frame request.
    pub struct FrameId;
}

/// Information passed to frame callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTick {
    /// When the frame boundary was reached.
    pub now: Instant,
    /// Monotonically increasing frame counter, starting at 0.
    pub frame_index: u64,
}

/// A boxed frame callback.
pub type FrameCallback = Box<dyn FnOnce(FrameTick) + Send + 'static>;

/// A host capability for frame-aligned callbacks.
pub trait FrameService: Send + Sync {
    /// Run `callback` once, at the next frame boundary.
    fn request_frame(&self, callback: FrameCallback) -> FrameId;

    /// Cancel a frame request.
    ///
    /// Returns `true` if the request was still outstanding.
    fn cancel_frame(&self, id: FrameId) -> bool;
}

#[derive(Default)]
struct FrameQueueInner {
    requests: SlotMap<FrameId, FrameCallback>,
    /// Request order for the upcoming tick.
    order: Vec<FrameId>,
    frame_index: u64,
}

/// An in-process frame request queue.
pub struct FrameQueue {
    clock: Arc<dyn Clock>,
    inner: Mutex<FrameQueueInner>,
}

impl FrameQueue {
    /// Create a frame queue stamping ticks with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: Mutex::new(FrameQueueInner::default()),
        }
    }

    /// Whether any frame request is outstanding.
    pub fn has_pending(&self) -> bool {
        !self.inner.lock().requests.is_empty()
    }

    /// Number of outstanding frame requests.
    pub fn pending_count(&self) -> usize {
        self.inner.lock().requests.len()
    }

    /// Index the next tick will carry.
    pub fn frame_index(&self) -> u64 {
        self.inner.lock().frame_index
    }

    /// Reach a frame boundary.
    ///
    /// Runs every request that was outstanding when the tick began, in
    /// request order. Requests made by those callbacks run on the next tick.
    /// Returns the number of callbacks run.
    #[tracing::instrument(skip(self), target = "rasterman_core::frame", level = "trace")]
    pub fn tick(&self) -> usize {
        let (batch, tick) = {
            let mut inner = self.inner.lock();
            let tick = FrameTick {
                now: self.clock.now(),
                frame_index: inner.frame_index,
            };
            inner.frame_index += 1;
            (std::mem::take(&mut inner.order), tick)
        };

        let mut ran = 0;
        for id in batch {
            // Cancelled requests, including ones cancelled by an earlier
            // callback in this batch, are already gone.
            let callback = self.inner.lock().requests.remove(id);
            if let Some(callback) = callback {
                callback(tick);
                ran += 1;
            }
        }

        if ran > 0 {
            tracing::trace!(
                target: targets::FRAME,
                frame_index = tick.frame_index,
                count = ran,
                "frame callbacks ran"
            );
        }
        ran
    }
}

impl FrameService for FrameQueue {
    fn request_frame(&self, callback: FrameCallback) -> FrameId {
        let mut inner = self.inner.lock();
        let id = inner.requests.insert(callback);
        inner.order.push(id);
        id
    }

    fn cancel_frame(&self, id: FrameId) -> bool {
        let mut inner = self.inner.lock();
        let removed = inner.requests.remove(id).is_some();
        if removed {
            inner.order.retain(|queued| *queued != id);
        }
        removed
    }
}

static_assertions::assert_impl_all!(FrameQueue: Send, Sync);
