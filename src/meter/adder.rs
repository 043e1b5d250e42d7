//! Striped additive accumulator.
//!
//! Writers hit one of several cache-padded cells chosen per thread, so
//! concurrent `add` calls rarely contend on the same cache line. Reads sum
//! every cell.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

/// Number of cells per accumulator.
const STRIPES: usize = 16;

static NEXT_STRIPE: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static STRIPE: usize = NEXT_STRIPE.fetch_add(1, Ordering::Relaxed) % STRIPES;
}

/// A lock-free counter optimized for many concurrent writers.
///
/// `sum` is not a linearizable snapshot while writers are active, but every
/// increment is observed exactly once by `sum_then_reset`.
pub struct StripedAdder {
    cells: Box<[CachePadded<AtomicU64>]>,
}

impl StripedAdder {
    /// Create an accumulator starting at zero.
    pub fn new() -> Self {
        let cells = (0..STRIPES)
            .map(|_| CachePadded::new(AtomicU64::new(0)))
            .collect();
        Self { cells }
    }

    /// Add `n` to the accumulator.
    pub fn add(&self, n: u64) {
        let stripe = STRIPE.with(|s| *s);
        self.cells[stripe].fetch_add(n, Ordering::Relaxed);
    }

    /// Current total across all cells.
    pub fn sum(&self) -> u64 {
        self.cells
            .iter()
            .map(|cell| cell.load(Ordering::Relaxed))
            .fold(0u64, u64::wrapping_add)
    }

    /// Drain every cell, returning what was drained.
    ///
    /// Each cell is swapped to zero individually, so an increment racing
    /// with the drain lands either in this total or in the next one.
    pub fn sum_then_reset(&self) -> u64 {
        self.cells
            .iter()
            .map(|cell| cell.swap(0, Ordering::AcqRel))
            .fold(0u64, u64::wrapping_add)
    }
}

impl Default for StripedAdder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StripedAdder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripedAdder").field("sum", &self.sum()).finish()
    }
}
