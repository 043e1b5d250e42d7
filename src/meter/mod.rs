//! Decaying rate meters and their building blocks.

mod adder;
mod clock;
mod decaying;
mod rate;
mod snapshot;

pub use adder::StripedAdder;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use decaying::DecayingRateMeter;
pub use rate::{RateTracker, Window, TICK_INTERVAL, TICK_INTERVAL_NANOS};
pub use snapshot::MeterSnapshot;
