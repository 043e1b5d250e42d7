//! Ratemeter - decaying rate meters without a background clock
//!
//! A [`meter::DecayingRateMeter`] counts events and tracks 1, 5 and 15 minute
//! exponentially weighted moving averages of their rate. Decay is simulated
//! lazily: whichever caller first notices that a tick boundary has passed
//! fast-forwards the averages, so no timer thread is needed.

pub mod config;
pub mod error;
pub mod load;
pub mod meter;
pub mod registry;
pub mod report;
