//! Logging facilities for Rasterman.
//!
//! Rasterman is instrumented with the `tracing` crate. Nothing is printed
//! unless the embedding application installs a subscriber:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("rasterman_core::debounce=trace")
//!     .init();
//! ```
//!
//! Every event carries one of the [`targets`] below, so directives can
//! switch individual subsystems on.

/// Target names for log filtering.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "rasterman_core";
    /// Timer queue target.
    pub const TIMER: &str = "rasterman_core::timer";
    /// Frame queue target.
    pub const FRAME: &str = "rasterman_core::frame";
    /// Debounce coalescer target.
    pub const DEBOUNCE: &str = "rasterman_core::debounce";
    /// Frame coalescer target.
    pub const COALESCE: &str = "rasterman_core::coalesce";
    /// Real-time event loop target.
    pub const EVENT_LOOP: &str = "rasterman_core::event_loop";
    /// Filter model target.
    pub const FILTER: &str = "rasterman_render::filter";
    /// Filter pipeline target.
    pub const PIPELINE: &str = "rasterman_render::pipeline";
    /// Software engine target.
    pub const ENGINE: &str = "rasterman_render::software";
    /// Panel target.
    pub const PANEL: &str = "rasterman::panel";
    /// Host protocol target.
    pub const HOST: &str = "rasterman::host";
    /// Configuration loading target.
    pub const CONFIG: &str = "rasterman::config";
    /// Timing spans target.
    pub const PERF: &str = "rasterman::perf";
}

/// A guard that times an operation under the `rasterman::perf` target.
///
/// ```
/// use rasterman_core::PerfSpan;
///
/// {
///     let _span = PerfSpan::new("reapply_filters");
///     // expensive work
/// }
/// ```
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Enter a span named after `operation`. It closes when the guard drops.
    pub fn new(operation: &'static str) -> Self {
        let span = tracing::debug_span!(target: targets::PERF, "perf", operation);
        Self {
            span: span.entered(),
        }
    }
}

/// `tracing::trace!` under the core target.
#[macro_export]
macro_rules! rasterman_trace {
    ($($arg:tt)*) => {
        $crate::tracing::trace!(target: "rasterman_core", $($arg)*)
    };
}

/// `tracing::debug!` under the core target.
#[macro_export]
macro_rules! rasterman_debug {
    ($($arg:tt)*) => {
        $crate::tracing::debug!(target: "rasterman_core", $($arg)*)
    };
}
