//! Per-frame "latest value wins" batching.
//!
//! A [`FrameCoalescer`] accepts values at any rate and hands its consumer at
//! most one value per frame boundary: the most recent one submitted. Values
//! superseded before the frame fires are discarded; this is lossy on
//! purpose.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::frame::{FrameId, FrameService, FrameTick};
use crate::logging::targets;

#[derive(Debug, Clone, Copy)]
struct ScheduledFrame {
    id: FrameId,
    generation: u64,
}

/// The Frame Slot: one optional value and one optional frame request.
struct FrameSlot<T> {
    pending: Option<T>,
    frame: Option<ScheduledFrame>,
    generation: u64,
}

type Consumer<T> = Box<dyn FnMut(T) + Send + 'static>;

struct CoalescerInner<T> {
    frames: Arc<dyn FrameService>,
    slot: Mutex<FrameSlot<T>>,
    consumer: Mutex<Consumer<T>>,
}

impl<T: Send + 'static> CoalescerInner<T> {
    fn submit(self: &Arc<Self>, value: T) {
        let mut slot = self.slot.lock();
        slot.pending = Some(value);
        if slot.frame.is_some() {
            return;
        }

        slot.generation += 1;
        let generation = slot.generation;
        let weak: Weak<Self> = Arc::downgrade(self);
        let id = self.frames.request_frame(Box::new(move |tick| {
            if let Some(inner) = weak.upgrade() {
                inner.frame_fired(generation, tick);
            }
        }));
        slot.frame = Some(ScheduledFrame { id, generation });
    }

    fn frame_fired(&self, generation: u64, tick: FrameTick) {
        let value = {
            let mut slot = self.slot.lock();
            if slot.frame.map(|frame| frame.generation) != Some(generation) {
                return;
            }
            // Clear the flag before the consumer runs so a submission made
            // from inside it schedules a fresh frame.
            slot.frame = None;
            slot.pending.take()
        };

        if let Some(value) = value {
            tracing::trace!(
                target: targets::COALESCE,
                frame_index = tick.frame_index,
                "delivering coalesced value"
            );
            (*self.consumer.lock())(value);
        }
    }

    fn cancel(&self) {
        let mut slot = self.slot.lock();
        slot.pending = None;
        if let Some(frame) = slot.frame.take() {
            self.frames.cancel_frame(frame.id);
        }
    }

    fn flush(&self) -> bool {
        let value = {
            let mut slot = self.slot.lock();
            if let Some(frame) = slot.frame.take() {
                self.frames.cancel_frame(frame.id);
            }
            slot.pending.take()
        };

        match value {
            Some(value) => {
                (*self.consumer.lock())(value);
                true
            }
            None => false,
        }
    }
}

/// A frame-aligned, latest-value-wins batcher.
///
/// At most one frame request is outstanding per instance. Dropping the
/// coalescer cancels it.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use parking_lot::Mutex;
/// use rasterman_core::{FrameCoalescer, SimulatedHost};
///
/// let host = SimulatedHost::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = seen.clone();
/// let coalescer = FrameCoalescer::new(host.frames(), move |v: i32| sink.lock().push(v));
///
/// for v in 1..=5 {
///     coalescer.submit(v);
/// }
/// host.run_frame();
/// assert_eq!(*seen.lock(), vec![5]);
/// ```
pub struct FrameCoalescer<T> {
    inner: Arc<CoalescerInner<T>>,
}

impl<T: Send + 'static> FrameCoalescer<T> {
    /// Create a coalescer delivering to `consumer` on `frames`' boundaries.
    pub fn new<F>(frames: Arc<dyn FrameService>, consumer: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        Self {
            inner: Arc::new(CoalescerInner {
                frames,
                slot: Mutex::new(FrameSlot {
                    pending: None,
                    frame: None,
                    generation: 0,
                }),
                consumer: Mutex::new(Box::new(consumer)),
            }),
        }
    }

    /// Record `value` as pending and make sure a frame is requested.
    pub fn submit(&self, value: T) {
        self.inner.submit(value);
    }

    /// Drop the pending value and the frame request without invoking.
    ///
    /// Safe to call at any time, any number of times.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Deliver the pending value now instead of at the next frame.
    ///
    /// Returns `true` if a value was delivered.
    pub fn flush(&self) -> bool {
        self.inner.flush()
    }

    /// Whether a frame request is outstanding.
    pub fn is_scheduled(&self) -> bool {
        self.inner.slot.lock().frame.is_some()
    }

    /// Whether a value is waiting for delivery.
    pub fn has_pending(&self) -> bool {
        self.inner.slot.lock().pending.is_some()
    }
}

impl<T> Drop for FrameCoalescer<T> {
    fn drop(&mut self) {
        let mut slot = self.inner.slot.lock();
        slot.pending = None;
        if let Some(frame) = slot.frame.take() {
            self.inner.frames.cancel_frame(frame.id);
        }
    }
}

impl<T> std::fmt::Debug for FrameCoalescer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.inner.slot.lock();
        f.debug_struct("FrameCoalescer")
            .field("scheduled", &slot.frame.is_some())
            .field("pending", &slot.pending.is_some())
            .finish()
    }
}

static_assertions::assert_impl_all!(FrameCoalescer<f32>: Send, Sync);
