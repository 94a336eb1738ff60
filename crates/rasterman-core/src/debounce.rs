//! Time-window debounce coalescer.
//!
//! A [`Debouncer`] accepts a rapid stream of calls and invokes its consumer
//! at most once per settling window, always with the most recent arguments.
//!
//! # Bursts
//!
//! A call made while the debouncer is idle opens a *burst*. Each later call
//! overwrites the pending arguments and pushes the trailing deadline out to
//! `wait` after itself. When input stays quiet for a full `wait`, the burst
//! closes with a trailing invocation.
//!
//! # Edges
//!
//! - `leading`: invoke synchronously on the call that opens a burst.
//! - `trailing`: invoke when the burst closes, unless nothing was called
//!   since the last invocation (an isolated leading call is not repeated).
//!
//! With both edges off the debouncer still tracks bursts but never invokes;
//! [`Debouncer::is_pending`] observes this.
//!
//! # Maximum wait
//!
//! With `max_wait` set, a burst cannot suppress invocation for longer than
//! `max_wait`: once that much time has passed since the burst started (or
//! since the last forced invocation), the pending arguments are delivered
//! immediately and the max-wait period restarts at that instant. Whichever of
//! the timer and an incoming call observes the expiry first performs the
//! forced invocation; the other then sees a fresh period.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use parking_lot::Mutex;
//! use rasterman_core::{DebounceConfig, Debouncer, SimulatedHost};
//!
//! let host = SimulatedHost::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//!
//! let debouncer = Debouncer::new(
//!     host.timers(),
//!     DebounceConfig::new(Duration::from_millis(80)),
//!     move |value: u32| sink.lock().push(value),
//! )
//! .unwrap();
//!
//! for value in 0..8 {
//!     debouncer.schedule(value);
//!     host.advance(Duration::from_millis(10));
//! }
//! host.advance(Duration::from_millis(80));
//! assert_eq!(*seen.lock(), vec![7]);
//! ```

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::{DebounceError, Result};
use crate::logging::targets;
use crate::timer::{TimerId, TimerService};

/// Configuration for a [`Debouncer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceConfig {
    /// The settling window.
    pub wait: Duration,
    /// Upper bound on how long a burst can suppress invocation.
    pub max_wait: Option<Duration>,
    /// Invoke on the call that opens a burst.
    pub leading: bool,
    /// Invoke when a burst closes.
    pub trailing: bool,
}

impl DebounceConfig {
    /// Trailing-edge debounce with the given settling window.
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            max_wait: None,
            leading: false,
            trailing: true,
        }
    }

    /// Set the maximum wait.
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    /// Enable or disable the leading edge.
    pub fn leading(mut self, leading: bool) -> Self {
        self.leading = leading;
        self
    }

    /// Enable or disable the trailing edge.
    pub fn trailing(mut self, trailing: bool) -> Self {
        self.trailing = trailing;
        self
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> std::result::Result<(), DebounceError> {
        match self.max_wait {
            Some(max_wait) if max_wait < self.wait => Err(DebounceError::MaxWaitShorterThanWait {
                wait: self.wait,
                max_wait,
            }),
            _ => Ok(()),
        }
    }

    fn invokes(&self) -> bool {
        self.leading || self.trailing
    }
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self::new(Duration::from_millis(80))
    }
}

/// The live timer of a pending burst.
#[derive(Debug, Clone, Copy)]
struct ArmedTimer {
    id: TimerId,
    /// Stamp matched against the firing callback; a mismatch means the
    /// timer was superseded after it was popped.
    generation: u64,
}

struct Burst {
    timer: ArmedTimer,
    /// Start of the current max-wait period.
    started: Instant,
    last_call: Instant,
    /// A synchronous invocation that arrived while the consumer was running.
    /// The timer is armed with no delay to deliver it.
    deferred: Option<Edge>,
}

struct DebounceState<A, R> {
    /// The Call Record. At most one is retained.
    pending: Option<A>,
    burst: Option<Burst>,
    last_result: Option<R>,
    generation: u64,
    /// Invocations in progress. Synchronous invocations are deferred while
    /// this is nonzero.
    invoking: usize,
}

impl<A, R> DebounceState<A, R> {
    fn new() -> Self {
        Self {
            pending: None,
            burst: None,
            last_result: None,
            generation: 0,
            invoking: 0,
        }
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}

type Consumer<A, R> = Box<dyn FnMut(A) -> R + Send + 'static>;

struct DebounceInner<A, R> {
    timers: Arc<dyn TimerService>,
    config: DebounceConfig,
    state: Mutex<DebounceState<A, R>>,
    consumer: Mutex<Consumer<A, R>>,
}

/// Why the consumer is being invoked.
#[derive(Debug, Clone, Copy)]
enum Edge {
    Leading,
    Trailing,
    MaxWait,
    Flush,
}

impl<A, R> DebounceInner<A, R>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    /// Arm a timer `delay` from now. Must be called with the state lock held.
    fn arm(self: &Arc<Self>, state: &mut DebounceState<A, R>, delay: Duration) -> ArmedTimer {
        let generation = state.next_generation();
        let weak: Weak<Self> = Arc::downgrade(self);
        let id = self.timers.start_timer(
            delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.timer_expired(generation);
                }
            }),
        );
        ArmedTimer { id, generation }
    }

    /// Delay until the burst must be re-examined.
    fn next_delay(&self, now: Instant, burst: &Burst) -> Duration {
        let until_quiet = self
            .config
            .wait
            .saturating_sub(now.saturating_duration_since(burst.last_call));
        match self.config.max_wait {
            Some(max_wait) => {
                let until_forced =
                    max_wait.saturating_sub(now.saturating_duration_since(burst.started));
                until_quiet.min(until_forced)
            }
            None => until_quiet,
        }
    }

    fn max_wait_expired(&self, now: Instant, burst: &Burst) -> bool {
        self.config
            .max_wait
            .is_some_and(|max_wait| now.saturating_duration_since(burst.started) >= max_wait)
    }

    fn schedule(self: &Arc<Self>, args: A) {
        let now = self.timers.now();
        let mut state = self.state.lock();
        state.pending = Some(args);

        let invoke = match state.burst.take() {
            None => {
                // Idle: this call opens a burst.
                let deferred =
                    (self.config.leading && state.invoking > 0).then_some(Edge::Leading);
                let delay = if deferred.is_some() {
                    Duration::ZERO
                } else {
                    self.config.wait
                };
                let timer = self.arm(&mut state, delay);
                state.burst = Some(Burst {
                    timer,
                    started: now,
                    last_call: now,
                    deferred,
                });
                if self.config.leading && deferred.is_none() {
                    state.pending.take().map(|args| (args, Edge::Leading))
                } else {
                    None
                }
            }
            Some(mut burst) => {
                burst.last_call = now;
                self.timers.cancel_timer(burst.timer.id);
                let forced = if self.max_wait_expired(now, &burst) && self.config.invokes() {
                    burst.started = now;
                    if state.invoking > 0 {
                        burst.deferred = Some(Edge::MaxWait);
                        None
                    } else {
                        state.pending.take().map(|args| (args, Edge::MaxWait))
                    }
                } else {
                    None
                };
                let delay = if burst.deferred.is_some() {
                    Duration::ZERO
                } else {
                    self.next_delay(now, &burst)
                };
                burst.timer = self.arm(&mut state, delay);
                state.burst = Some(burst);
                forced
            }
        };
        drop(state);

        if let Some((args, edge)) = invoke {
            self.invoke(args, edge);
        }
    }

    fn timer_expired(self: &Arc<Self>, generation: u64) {
        let now = self.timers.now();
        let mut state = self.state.lock();
        let Some(mut burst) = state.burst.take() else {
            return;
        };
        if burst.timer.generation != generation {
            state.burst = Some(burst);
            return;
        }

        let quiet = now.saturating_duration_since(burst.last_call) >= self.config.wait;
        let invoke = if let Some(edge) = burst.deferred.take() {
            let deferred = state.pending.take().map(|args| (args, edge));
            let delay = self.next_delay(now, &burst);
            burst.timer = self.arm(&mut state, delay);
            state.burst = Some(burst);
            deferred
        } else if quiet {
            // Trailing edge: the burst closes and the debouncer goes idle.
            let pending = state.pending.take();
            if self.config.trailing {
                pending.map(|args| (args, Edge::Trailing))
            } else {
                None
            }
        } else {
            let forced = if self.max_wait_expired(now, &burst) && self.config.invokes() {
                burst.started = now;
                state.pending.take().map(|args| (args, Edge::MaxWait))
            } else {
                None
            };
            let delay = self.next_delay(now, &burst);
            burst.timer = self.arm(&mut state, delay);
            state.burst = Some(burst);
            forced
        };
        drop(state);

        if let Some((args, edge)) = invoke {
            self.invoke(args, edge);
        }
    }

    fn invoke(&self, args: A, edge: Edge) -> R {
        tracing::trace!(target: targets::DEBOUNCE, ?edge, "invoking debounced consumer");
        self.state.lock().invoking += 1;
        let result = {
            let mut consumer = self.consumer.lock();
            (*consumer)(args)
        };
        let mut state = self.state.lock();
        state.invoking -= 1;
        state.last_result = Some(result.clone());
        result
    }

    fn cancel(&self) {
        let mut state = self.state.lock();
        state.pending = None;
        if let Some(burst) = state.burst.take() {
            self.timers.cancel_timer(burst.timer.id);
            tracing::trace!(target: targets::DEBOUNCE, "pending burst cancelled");
        }
    }

    fn flush(&self) -> Option<R> {
        let mut state = self.state.lock();
        let Some(burst) = state.burst.take() else {
            return state.last_result.clone();
        };
        self.timers.cancel_timer(burst.timer.id);
        let pending = state.pending.take();
        let last_result = state.last_result.clone();
        drop(state);

        match pending {
            Some(args) => Some(self.invoke(args, Edge::Flush)),
            None => last_result,
        }
    }
}

/// A debounce coalescer.
///
/// Owns one pending timer and one Call Record. Dropping the debouncer
/// cancels any pending invocation; callbacks already queued in the host then
/// do nothing.
///
/// Calls from several logical callers into one instance form a single shared
/// stream (last writer wins). Callers needing isolation use separate
/// instances.
///
/// The consumer runs with no internal lock held except its own, so it may
/// call [`schedule`](Self::schedule) on the same debouncer. A leading or
/// forced invocation requested from inside the consumer is not run
/// re-entrantly; it is delivered by a zero-delay timer once the consumer
/// returns. The consumer must not call [`flush`](Self::flush) on the same
/// debouncer.
pub struct Debouncer<A, R = ()> {
    inner: Arc<DebounceInner<A, R>>,
}

impl<A, R> Debouncer<A, R>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    /// Create a debouncer that invokes `consumer` through `timers`.
    pub fn new<F>(timers: Arc<dyn TimerService>, config: DebounceConfig, consumer: F) -> Result<Self>
    where
        F: FnMut(A) -> R + Send + 'static,
    {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(DebounceInner {
                timers,
                config,
                state: Mutex::new(DebounceState::new()),
                consumer: Mutex::new(Box::new(consumer)),
            }),
        })
    }

    /// The configuration this debouncer was built with.
    pub fn config(&self) -> &DebounceConfig {
        &self.inner.config
    }

    /// Record `args` as the current Call Record.
    ///
    /// Returns immediately. The consumer runs synchronously only when the
    /// leading edge is enabled and this call opens a burst, or when this
    /// call observes an expired maximum wait, and only if no invocation is
    /// already running.
    pub fn schedule(&self, args: A) {
        self.inner.schedule(args);
    }

    /// Drop the pending Call Record and timer without invoking.
    ///
    /// Safe to call at any time, any number of times.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Invoke now with the pending Call Record, if any, and go idle.
    ///
    /// Returns the result of that invocation, or the last result when there
    /// was nothing to deliver.
    pub fn flush(&self) -> Option<R> {
        self.inner.flush()
    }

    /// Whether a burst is in progress.
    pub fn is_pending(&self) -> bool {
        self.inner.state.lock().burst.is_some()
    }

    /// The result of the most recent invocation.
    pub fn last_result(&self) -> Option<R> {
        self.inner.state.lock().last_result.clone()
    }
}

impl<A, R> Drop for Debouncer<A, R> {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        state.pending = None;
        if let Some(burst) = state.burst.take() {
            self.inner.timers.cancel_timer(burst.timer.id);
        }
    }
}

impl<A, R> std::fmt::Debug for Debouncer<A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Debouncer")
            .field("config", &self.inner.config)
            .field("pending", &state.burst.is_some())
            .finish()
    }
}

static_assertions::assert_impl_all!(Debouncer<u32, ()>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedHost;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// A debouncer recording `(elapsed ms, value)` for each invocation.
    fn recording(
        host: &SimulatedHost,
        config: DebounceConfig,
    ) -> (Debouncer<u32, u32>, Arc<Mutex<Vec<(u64, u32)>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        let clock = host.clock();
        let debouncer = Debouncer::new(host.timers(), config, move |value: u32| {
            sink.lock().push((clock.elapsed().as_millis() as u64, value));
            value
        })
        .unwrap();
        (debouncer, calls)
    }

    #[test]
    fn test_trailing_only_single_invocation() {
        let host = SimulatedHost::new();
        let (debouncer, calls) = recording(&host, DebounceConfig::new(ms(80)));

        for value in 0..8 {
            debouncer.schedule(value);
            if value < 7 {
                host.advance(ms(10));
            }
        }
        assert!(debouncer.is_pending());

        host.advance(ms(79));
        assert!(calls.lock().is_empty());

        host.advance(ms(1));
        assert_eq!(*calls.lock(), vec![(150, 7)]);
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_leading_and_trailing_isolated_call() {
        let host = SimulatedHost::new();
        let config = DebounceConfig::new(ms(50)).leading(true).trailing(true);
        let (debouncer, calls) = recording(&host, config);

        debouncer.schedule(1);
        assert_eq!(*calls.lock(), vec![(0, 1)]);

        host.advance(ms(200));
        assert_eq!(*calls.lock(), vec![(0, 1)]);
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_leading_and_trailing_burst() {
        let host = SimulatedHost::new();
        let config = DebounceConfig::new(ms(50)).leading(true).trailing(true);
        let (debouncer, calls) = recording(&host, config);

        debouncer.schedule(1);
        host.advance(ms(20));
        debouncer.schedule(2);
        host.advance(ms(20));
        debouncer.schedule(3);
        host.advance(ms(100));

        assert_eq!(*calls.lock(), vec![(0, 1), (90, 3)]);
    }

    #[test]
    fn test_leading_only() {
        let host = SimulatedHost::new();
        let config = DebounceConfig::new(ms(50)).leading(true).trailing(false);
        let (debouncer, calls) = recording(&host, config);

        debouncer.schedule(1);
        host.advance(ms(10));
        debouncer.schedule(2);
        host.advance(ms(100));
        assert_eq!(*calls.lock(), vec![(0, 1)]);

        // The burst closed; the next call opens a new one.
        debouncer.schedule(3);
        assert_eq!(*calls.lock(), vec![(0, 1), (110, 3)]);
    }

    #[test]
    fn test_max_wait_forces_periodic_invocation() {
        let host = SimulatedHost::new();
        let config = DebounceConfig::new(ms(50)).max_wait(ms(200));
        let (debouncer, calls) = recording(&host, config);

        for value in 0..50 {
            debouncer.schedule(value);
            host.advance(ms(10));
        }
        host.advance(ms(100));

        // Calls at t = 0, 10, ..., 490. The timer fires at 200 and 400 while
        // input continues, delivering the call made just before each, then the
        // burst closes 50ms after the last call.
        assert_eq!(*calls.lock(), vec![(200, 19), (400, 39), (540, 49)]);
    }

    #[test]
    fn test_max_wait_caps_restarted_window() {
        let host = SimulatedHost::new();
        let config = DebounceConfig::new(ms(100)).max_wait(ms(100));
        let (debouncer, calls) = recording(&host, config);

        debouncer.schedule(1);
        host.advance(ms(60));
        debouncer.schedule(2);
        // The timer re-armed for the max-wait deadline at 100, not 160.
        host.advance(ms(40));
        assert_eq!(*calls.lock(), vec![(100, 2)]);
    }

    #[test]
    fn test_max_wait_timer_wins_tie_with_call() {
        let host = SimulatedHost::new();
        let config = DebounceConfig::new(ms(50)).max_wait(ms(100));
        let (debouncer, calls) = recording(&host, config);

        for value in 1..=4 {
            debouncer.schedule(value);
            host.advance(ms(if value < 4 { 30 } else { 10 }));
        }
        // t = 100: the timer fired first and delivered the value from t = 90.
        assert_eq!(*calls.lock(), vec![(100, 4)]);

        debouncer.schedule(5);
        assert_eq!(*calls.lock(), vec![(100, 4)]);

        // The call at 100 sits in a fresh period that expires at 200.
        for value in 6..=8 {
            host.advance(ms(30));
            debouncer.schedule(value);
        }
        host.advance(ms(9));
        assert_eq!(calls.lock().len(), 1);
        host.advance(ms(1));
        assert_eq!(*calls.lock(), vec![(100, 4), (200, 8)]);

        // Nothing arrived after the forced invocation, so the burst closes quietly.
        host.advance(ms(100));
        assert_eq!(*calls.lock(), vec![(100, 4), (200, 8)]);
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_max_wait_expiry_observed_by_call() {
        // A host that runs timers late: the call sees the expired period first.
        let clock = Arc::new(crate::clock::ManualClock::new());
        let timers = Arc::new(crate::timer::TimerQueue::new(clock.clone()));
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        let clock_clone = clock.clone();
        let debouncer = Debouncer::new(
            timers.clone(),
            DebounceConfig::new(ms(50)).max_wait(ms(100)),
            move |value: u32| sink.lock().push((clock_clone.elapsed().as_millis() as u64, value)),
        )
        .unwrap();

        debouncer.schedule(1);
        clock.advance(ms(120));
        debouncer.schedule(2);
        assert_eq!(*calls.lock(), vec![(120, 2)]);

        // The stale timer was replaced; the fresh period ends quietly.
        assert_eq!(timers.process_expired(), 0);
        clock.advance(ms(50));
        assert_eq!(timers.process_expired(), 1);
        assert_eq!(*calls.lock(), vec![(120, 2)]);
    }

    #[test]
    fn test_both_edges_disabled_never_invokes() {
        let host = SimulatedHost::new();
        let config = DebounceConfig::new(ms(20))
            .leading(false)
            .trailing(false)
            .max_wait(ms(40));
        let (debouncer, calls) = recording(&host, config);

        for value in 0..10 {
            debouncer.schedule(value);
            assert!(debouncer.is_pending());
            host.advance(ms(10));
        }
        host.advance(ms(100));

        assert!(calls.lock().is_empty());
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_cancel_prevents_invocation() {
        let host = SimulatedHost::new();
        let (debouncer, calls) = recording(&host, DebounceConfig::new(ms(80)));

        debouncer.schedule(1);
        host.advance(ms(40));
        debouncer.cancel();
        assert!(!debouncer.is_pending());
        assert_eq!(host.timers().active_count(), 0);

        host.advance(ms(200));
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let host = SimulatedHost::new();
        let (debouncer, _calls) = recording(&host, DebounceConfig::new(ms(80)));

        debouncer.cancel();
        debouncer.cancel();
        assert!(!debouncer.is_pending());

        debouncer.schedule(1);
        debouncer.cancel();
        debouncer.cancel();
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_schedule_after_cancel_starts_fresh_burst() {
        let host = SimulatedHost::new();
        let config = DebounceConfig::new(ms(50)).leading(true);
        let (debouncer, calls) = recording(&host, config);

        debouncer.schedule(1);
        debouncer.schedule(2);
        debouncer.cancel();

        host.advance(ms(10));
        debouncer.schedule(3);
        host.advance(ms(100));

        assert_eq!(*calls.lock(), vec![(0, 1), (10, 3)]);
    }

    #[test]
    fn test_flush_invokes_pending_immediately() {
        let host = SimulatedHost::new();
        let (debouncer, calls) = recording(&host, DebounceConfig::new(ms(80)));

        debouncer.schedule(4);
        host.advance(ms(10));
        debouncer.schedule(5);

        assert_eq!(debouncer.flush(), Some(5));
        assert_eq!(*calls.lock(), vec![(10, 5)]);
        assert!(!debouncer.is_pending());

        host.advance(ms(200));
        assert_eq!(calls.lock().len(), 1);
    }

    #[test]
    fn test_flush_when_idle_returns_last_result() {
        let host = SimulatedHost::new();
        let (debouncer, calls) = recording(&host, DebounceConfig::new(ms(80)));

        assert_eq!(debouncer.flush(), None);

        debouncer.schedule(9);
        host.advance(ms(80));
        assert_eq!(debouncer.last_result(), Some(9));
        assert_eq!(debouncer.flush(), Some(9));
        assert_eq!(calls.lock().len(), 1);
    }

    #[test]
    fn test_identical_arguments_still_restart_window() {
        let host = SimulatedHost::new();
        let (debouncer, calls) = recording(&host, DebounceConfig::new(ms(50)));

        debouncer.schedule(1);
        host.advance(ms(40));
        debouncer.schedule(1);
        host.advance(ms(40));
        assert!(calls.lock().is_empty());

        host.advance(ms(10));
        assert_eq!(*calls.lock(), vec![(90, 1)]);
    }

    #[test]
    fn test_drop_cancels_pending_timer() {
        let host = SimulatedHost::new();
        let (debouncer, calls) = recording(&host, DebounceConfig::new(ms(50)));

        debouncer.schedule(1);
        drop(debouncer);
        assert_eq!(host.timers().active_count(), 0);

        host.advance(ms(100));
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn test_consumer_may_reschedule() {
        let host = SimulatedHost::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let slot: Arc<Mutex<Option<Arc<Debouncer<u32>>>>> = Arc::new(Mutex::new(None));

        let sink = calls.clone();
        let slot_clone = slot.clone();
        let debouncer = Arc::new(
            Debouncer::new(host.timers(), DebounceConfig::new(ms(30)), move |value: u32| {
                sink.lock().push(value);
                if value < 3 {
                    let this = slot_clone.lock().clone();
                    if let Some(this) = this {
                        this.schedule(value + 1);
                    }
                }
            })
            .unwrap(),
        );
        *slot.lock() = Some(debouncer.clone());

        debouncer.schedule(1);
        host.advance(ms(200));
        assert_eq!(*calls.lock(), vec![1, 2, 3]);

        slot.lock().take();
    }

    /// A debouncer whose consumer schedules `value + 1` on receiving `trigger`.
    fn self_scheduling(
        host: &SimulatedHost,
        config: DebounceConfig,
        trigger: u32,
    ) -> (
        Arc<Debouncer<u32>>,
        Arc<Mutex<Vec<(u64, u32)>>>,
        Arc<Mutex<Option<Arc<Debouncer<u32>>>>>,
    ) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let slot: Arc<Mutex<Option<Arc<Debouncer<u32>>>>> = Arc::new(Mutex::new(None));

        let sink = calls.clone();
        let slot_clone = slot.clone();
        let clock = host.clock();
        let debouncer = Arc::new(
            Debouncer::new(host.timers(), config, move |value: u32| {
                sink.lock().push((clock.elapsed().as_millis() as u64, value));
                if value == trigger {
                    let this = slot_clone.lock().clone();
                    if let Some(this) = this {
                        this.schedule(value + 1);
                    }
                }
            })
            .unwrap(),
        );
        *slot.lock() = Some(debouncer.clone());
        (debouncer, calls, slot)
    }

    #[test]
    fn test_leading_reschedule_from_consumer_is_deferred() {
        let host = SimulatedHost::new();
        let config = DebounceConfig::new(ms(30)).leading(true).trailing(true);
        let (debouncer, calls, slot) = self_scheduling(&host, config, 2);

        debouncer.schedule(1);
        debouncer.schedule(2);
        host.advance(ms(100));

        // The trailing call delivers 2, whose nested leading call for 3 runs
        // right after it at the same instant.
        assert_eq!(*calls.lock(), vec![(0, 1), (30, 2), (30, 3)]);
        assert!(!debouncer.is_pending());
        assert_eq!(host.timers().active_count(), 0);

        slot.lock().take();
    }

    #[test]
    fn test_leading_reschedule_inside_leading_call() {
        let host = SimulatedHost::new();
        let config = DebounceConfig::new(ms(30)).leading(true).trailing(true);
        let (debouncer, calls, slot) = self_scheduling(&host, config, 1);

        // The nested call lands in the burst the outer call just opened.
        debouncer.schedule(1);
        assert_eq!(*calls.lock(), vec![(0, 1)]);
        assert!(debouncer.is_pending());

        host.advance(ms(100));
        assert_eq!(*calls.lock(), vec![(0, 1), (30, 2)]);
        assert!(!debouncer.is_pending());

        slot.lock().take();
    }

    #[test]
    fn test_forced_invocation_from_consumer_is_deferred() {
        let clock = Arc::new(crate::clock::ManualClock::new());
        let timers = Arc::new(crate::timer::TimerQueue::new(clock.clone()));
        let calls = Arc::new(Mutex::new(Vec::new()));
        let slot: Arc<Mutex<Option<Arc<Debouncer<u32>>>>> = Arc::new(Mutex::new(None));

        let sink = calls.clone();
        let slot_clone = slot.clone();
        let inner_clock = clock.clone();
        let debouncer = Arc::new(
            Debouncer::new(
                timers.clone(),
                DebounceConfig::new(ms(50)).max_wait(ms(100)),
                move |value: u32| {
                    sink.lock().push(value);
                    if value == 1 {
                        // Time passes inside the consumer, past the max wait
                        // of the burst opened below.
                        let this = slot_clone.lock().clone();
                        if let Some(this) = this {
                            this.schedule(2);
                            inner_clock.advance(ms(120));
                            this.schedule(3);
                        }
                    }
                },
            )
            .unwrap(),
        );
        *slot.lock() = Some(debouncer.clone());

        debouncer.schedule(1);
        assert_eq!(debouncer.flush(), Some(()));
        assert_eq!(*calls.lock(), vec![1]);

        // The forced delivery of 3 waits for the zero-delay timer.
        assert!(debouncer.is_pending());
        assert_eq!(timers.process_expired(), 1);
        assert_eq!(*calls.lock(), vec![1, 3]);

        clock.advance(ms(50));
        timers.process_expired();
        assert_eq!(*calls.lock(), vec![1, 3]);
        assert!(!debouncer.is_pending());

        slot.lock().take();
    }

    #[test]
    fn test_invalid_max_wait_rejected() {
        let host = SimulatedHost::new();
        let config = DebounceConfig::new(ms(100)).max_wait(ms(50));
        let result = Debouncer::new(host.timers(), config, |_: u32| {});
        assert!(result.is_err());
    }
}
