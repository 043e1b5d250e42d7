//! Exponentially weighted moving average rate tracker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use super::adder::StripedAdder;

/// Granularity of simulated decay.
pub const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// [`TICK_INTERVAL`] in nanoseconds.
pub const TICK_INTERVAL_NANOS: u64 = 5_000_000_000;

const TICK_INTERVAL_SECS: f64 = 5.0;

/// Averaging window of a rate tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Window {
    /// One minute average
    OneMinute,
    /// Five minute average
    FiveMinutes,
    /// Fifteen minute average
    FifteenMinutes,
}

impl Window {
    /// Get the duration of this window.
    pub fn duration(&self) -> Duration {
        match self {
            Window::OneMinute => Duration::from_secs(60),
            Window::FiveMinutes => Duration::from_secs(300),
            Window::FifteenMinutes => Duration::from_secs(900),
        }
    }

    /// Decay constant applied on every tick: `1 - e^(-tick / window)`.
    pub fn alpha(&self) -> f64 {
        1.0 - (-TICK_INTERVAL_SECS / self.duration().as_secs_f64()).exp()
    }
}

#[derive(Debug)]
struct Smoothed {
    rate: f64,
    initialized: bool,
}

/// Tracks an events-per-second EWMA over one [`Window`].
///
/// Events accumulate in a striped adder until the next tick folds them into
/// the average. The published rate lives in an atomic so readers never take
/// the tick lock.
#[derive(Debug)]
pub struct RateTracker {
    window: Window,
    alpha: f64,
    pending: StripedAdder,
    published: AtomicU64,
    state: Mutex<Smoothed>,
}

impl RateTracker {
    /// Create a tracker for the given window.
    pub fn new(window: Window) -> Self {
        Self {
            window,
            alpha: window.alpha(),
            pending: StripedAdder::new(),
            published: AtomicU64::new(0f64.to_bits()),
            state: Mutex::new(Smoothed {
                rate: 0.0,
                initialized: false,
            }),
        }
    }

    /// Record `n` events for the next tick.
    pub fn update(&self, n: u64) {
        self.pending.add(n);
    }

    /// Apply one decay step.
    pub fn tick(&self) {
        self.tick_n(1);
    }

    /// Apply `ticks` decay steps in time order.
    ///
    /// The tracker lock is held for one step at a time. Once the average is
    /// zero with nothing pending, further steps are no-ops and the loop stops
    /// early.
    pub fn tick_n(&self, ticks: u64) {
        for _ in 0..ticks {
            if !self.step() {
                break;
            }
        }
    }

    /// Fold pending events into the average. Returns `false` if the step
    /// could not change anything.
    fn step(&self) -> bool {
        let mut state = self.state.lock();
        if state.initialized && state.rate == 0.0 && self.pending.sum() == 0 {
            return false;
        }

        let observed = self.pending.sum_then_reset() as f64 / TICK_INTERVAL_SECS;
        if state.initialized {
            state.rate += self.alpha * (observed - state.rate);
        } else {
            state.rate = observed;
            state.initialized = true;
        }
        // Repeated decay stalls on a subnormal once alpha * rate rounds to zero.
        if state.rate < f64::MIN_POSITIVE {
            state.rate = 0.0;
        }
        self.published.store(state.rate.to_bits(), Ordering::Release);
        true
    }

    /// Current smoothed rate in events per second.
    pub fn rate(&self) -> f64 {
        f64::from_bits(self.published.load(Ordering::Acquire))
    }

    /// Get the window of this tracker.
    pub fn window(&self) -> Window {
        self.window
    }

    /// Get the decay constant of this tracker.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}
