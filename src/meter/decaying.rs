//! The decaying rate meter.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use super::adder::StripedAdder;
use super::clock::{Clock, MonotonicClock};
use super::rate::{RateTracker, Window, TICK_INTERVAL_NANOS};
use super::snapshot::MeterSnapshot;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// A meter tracking a total count plus 1, 5 and 15 minute moving averages.
///
/// There is no background thread. Every mark and every rate read first
/// checks whether a tick boundary has passed since the last refresh and, if
/// so, fast-forwards all three averages by the number of missed ticks. A
/// single compare-and-swap on the refresh timestamp elects one caller to do
/// that work; everyone else carries on without waiting.
pub struct DecayingRateMeter<C: Clock = MonotonicClock> {
    count: StripedAdder,
    rate1: RateTracker,
    rate5: RateTracker,
    rate15: RateTracker,
    start_nanos: u64,
    last_refresh: AtomicU64,
    unit: String,
    clock: C,
}

impl DecayingRateMeter<MonotonicClock> {
    /// Create a meter driven by the monotonic system clock.
    pub fn new(unit: impl Into<String>) -> Self {
        Self::with_clock(unit, MonotonicClock::new())
    }
}

impl<C: Clock> DecayingRateMeter<C> {
    /// Create a meter driven by the given clock.
    pub fn with_clock(unit: impl Into<String>, clock: C) -> Self {
        let now = clock.now_nanos();
        Self {
            count: StripedAdder::new(),
            rate1: RateTracker::new(Window::OneMinute),
            rate5: RateTracker::new(Window::FiveMinutes),
            rate15: RateTracker::new(Window::FifteenMinutes),
            start_nanos: now,
            last_refresh: AtomicU64::new(now),
            unit: unit.into(),
            clock,
        }
    }

    /// Record a single event.
    pub fn mark(&self) {
        self.mark_n(1);
    }

    /// Record `n` events.
    pub fn mark_n(&self, n: u64) {
        self.refresh();
        self.count.add(n);
        self.rate1.update(n);
        self.rate5.update(n);
        self.rate15.update(n);
    }

    /// Total number of events recorded.
    pub fn count(&self) -> u64 {
        self.count.sum()
    }

    /// One minute moving average, in events per second.
    pub fn one_minute_rate(&self) -> f64 {
        self.refresh();
        self.rate1.rate()
    }

    /// Five minute moving average, in events per second.
    pub fn five_minute_rate(&self) -> f64 {
        self.refresh();
        self.rate5.rate()
    }

    /// Fifteen minute moving average, in events per second.
    pub fn fifteen_minute_rate(&self) -> f64 {
        self.refresh();
        self.rate15.rate()
    }

    /// Average events per second since the meter was created.
    ///
    /// Both the elapsed time and the quotient are whole numbers: a meter
    /// younger than one second reports zero, and 7 events over 2 seconds
    /// report 3.
    pub fn mean_rate(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }
        let elapsed = self.clock.now_nanos().saturating_sub(self.start_nanos);
        if elapsed == 0 {
            return 0.0;
        }
        let seconds = elapsed / NANOS_PER_SEC;
        if seconds == 0 {
            return 0.0;
        }
        (count / seconds) as f64
    }

    /// Label describing what is being counted.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Refresh once and capture every reported value.
    pub fn snapshot(&self) -> MeterSnapshot {
        self.refresh();
        MeterSnapshot {
            count: self.count(),
            mean_rate: self.mean_rate(),
            one_minute_rate: self.rate1.rate(),
            five_minute_rate: self.rate5.rate(),
            fifteen_minute_rate: self.rate15.rate(),
            unit: self.unit.clone(),
        }
    }

    /// Apply every tick that has elapsed since the last refresh.
    fn refresh(&self) {
        let now = self.clock.now_nanos();
        let last = self.last_refresh.load(Ordering::Acquire);
        let elapsed = now.saturating_sub(last);
        if elapsed <= TICK_INTERVAL_NANOS {
            return;
        }

        // Losers skip: the winner covers this interval.
        if self
            .last_refresh
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return;
        }

        let ticks = elapsed / TICK_INTERVAL_NANOS;
        trace!(ticks, unit = %self.unit, "Catching up meter decay");

        self.rate1.tick_n(ticks);
        self.rate5.tick_n(ticks);
        self.rate15.tick_n(ticks);
    }
}

impl Default for DecayingRateMeter<MonotonicClock> {
    fn default() -> Self {
        Self::new("events")
    }
}

impl<C: Clock> std::fmt::Debug for DecayingRateMeter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecayingRateMeter")
            .field("unit", &self.unit)
            .field("count", &self.count())
            .field("one_minute_rate", &self.rate1.rate())
            .field("five_minute_rate", &self.rate5.rate())
            .field("fifteen_minute_rate", &self.rate15.rate())
            .finish()
    }
}
