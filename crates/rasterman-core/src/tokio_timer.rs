//! Timer service backed by a Tokio runtime.
//!
//! This module requires the `tokio` feature:
//!
//! ```toml
//! [dependencies]
//! rasterman-core = { version = "0.1", features = ["tokio"] }
//! ```
//!
//! Each timer is a spawned task that sleeps for its delay and then runs the
//! callback on a runtime worker. Cancelling aborts the task. Time is read
//! from Tokio's clock, so tests with paused time see consistent deadlines.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use slotmap::SlotMap;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use crate::timer::{TimerCallback, TimerId, TimerService};

type TimerTable = SlotMap<TimerId, Option<AbortHandle>>;

/// A [`TimerService`] that schedules callbacks on a Tokio runtime.
#[derive(Clone)]
pub struct TokioTimers {
    handle: Handle,
    timers: Arc<Mutex<TimerTable>>,
}

impl TokioTimers {
    /// Schedule timers on the runtime behind `handle`.
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            timers: Arc::new(Mutex::new(SlotMap::with_key())),
        }
    }

    /// Schedule timers on the runtime of the calling context, if any.
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    /// Number of timers that have not fired or been cancelled.
    pub fn active_count(&self) -> usize {
        self.timers.lock().len()
    }
}

impl TimerService for TokioTimers {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn start_timer(&self, delay: Duration, callback: TimerCallback) -> TimerId {
        let mut timers = self.timers.lock();
        let id = timers.insert(None);

        let table = Arc::downgrade(&self.timers);
        let task = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(table) = table.upgrade() else {
                return;
            };
            // Losing this race to cancel_timer means the timer was cancelled.
            if table.lock().remove(id).is_some() {
                callback();
            }
        });

        if let Some(slot) = timers.get_mut(id) {
            *slot = Some(task.abort_handle());
        }
        id
    }

    fn cancel_timer(&self, id: TimerId) -> bool {
        match self.timers.lock().remove(id) {
            Some(task) => {
                if let Some(task) = task {
                    task.abort();
                }
                true
            }
            None => false,
        }
    }
}

impl Drop for TokioTimers {
    fn drop(&mut self) {
        // Clones share the table; only the last one aborts outstanding tasks.
        if Arc::strong_count(&self.timers) == 1 {
            for (_, task) in self.timers.lock().drain() {
                if let Some(task) = task {
                    task.abort();
                }
            }
        }
    }
}

impl std::fmt::Debug for TokioTimers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioTimers")
            .field("active", &self.active_count())
            .finish()
    }
}

static_assertions::assert_impl_all!(TokioTimers: Send, Sync);
