//! Core scheduling for Rasterman.
//!
//! This crate holds the host-agnostic half of the image-filter panel: the
//! machinery that turns a flood of slider events into a bounded number of
//! expensive re-renders.
//!
//! - **Debounce Coalescer**: [`Debouncer`] delays invocation until input
//!   settles, with optional leading and trailing edges and a maximum wait
//! - **Frame Coalescer**: [`FrameCoalescer`] delivers at most one value per
//!   frame, the latest one
//! - **Host services**: [`Clock`], [`TimerService`] and [`FrameService`] are
//!   injected, so the same coalescers run against the real-time
//!   [`EventLoop`], the deterministic [`SimulatedHost`], or Tokio
//!
//! # Two-tier throttle
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use parking_lot::Mutex;
//! use rasterman_core::{DebounceConfig, Debouncer, FrameCoalescer, SimulatedHost};
//!
//! let host = SimulatedHost::new();
//! let rendered = Arc::new(Mutex::new(Vec::new()));
//!
//! let sink = rendered.clone();
//! let frame = FrameCoalescer::new(host.frames(), move |v: u32| sink.lock().push(v));
//! let debounce = Debouncer::new(
//!     host.timers(),
//!     DebounceConfig::new(Duration::from_millis(80)),
//!     move |v: u32| frame.submit(v),
//! )
//! .unwrap();
//!
//! for step in 0..10 {
//!     debounce.schedule(step);
//!     host.advance(Duration::from_millis(5));
//! }
//! host.advance(Duration::from_millis(100));
//! host.run_frame();
//!
//! assert_eq!(*rendered.lock(), vec![9]);
//! ```

mod clock;
mod coalesce;
mod debounce;
mod error;
mod event_loop;
mod frame;
pub mod logging;
mod sim;
mod timer;
#[cfg(feature = "tokio")]
mod tokio_timer;

#[doc(hidden)]
pub use tracing;

pub use clock::{Clock, ManualClock, SystemClock};
pub use coalesce::FrameCoalescer;
pub use debounce::{DebounceConfig, Debouncer};
pub use error::{CoreError, DebounceError, Result};
pub use event_loop::{EventLoop, DEFAULT_FRAME_INTERVAL};
pub use frame::{FrameCallback, FrameId, FrameQueue, FrameService, FrameTick};
pub use logging::PerfSpan;
pub use sim::SimulatedHost;
pub use timer::{TimerCallback, TimerId, TimerQueue, TimerService};
#[cfg(feature = "tokio")]
pub use tokio_timer::TokioTimers;
