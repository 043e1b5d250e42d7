//! Named meter registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::error::{MeterError, Result};
use crate::meter::{Clock, DecayingRateMeter, MeterSnapshot, MonotonicClock};

/// Owns one meter per metric name.
///
/// This struct is thread-safe and can be shared across threads. All meters
/// created by a registry read time from the registry's clock.
pub struct MeterRegistry<C: Clock + Clone = MonotonicClock> {
    /// Meters indexed by metric name
    meters: DashMap<String, Arc<DecayingRateMeter<C>>>,
    /// Clock handed to every new meter
    clock: C,
}

impl MeterRegistry<MonotonicClock> {
    /// Create an empty registry on the monotonic system clock.
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::new())
    }
}

impl<C: Clock + Clone> MeterRegistry<C> {
    /// Create an empty registry on the given clock.
    pub fn with_clock(clock: C) -> Self {
        Self {
            meters: DashMap::new(),
            clock,
        }
    }

    /// Get the meter for `name`, creating it with `unit` if it does not exist.
    ///
    /// An existing meter keeps the unit it was created with.
    pub fn meter(&self, name: &str, unit: &str) -> Arc<DecayingRateMeter<C>> {
        if let Some(meter) = self.meters.get(name) {
            return Arc::clone(meter.value());
        }

        let meter = self.meters.entry(name.to_string()).or_insert_with(|| {
            debug!(name = %name, unit = %unit, "Creating new meter");
            Arc::new(DecayingRateMeter::with_clock(unit, self.clock.clone()))
        });
        Arc::clone(meter.value())
    }

    /// Create a meter for `name`, failing if one is already registered.
    pub fn register(&self, name: &str, unit: &str) -> Result<Arc<DecayingRateMeter<C>>> {
        match self.meters.entry(name.to_string()) {
            Entry::Occupied(_) => Err(MeterError::AlreadyRegistered(name.to_string())),
            Entry::Vacant(vacant) => {
                debug!(name = %name, unit = %unit, "Registering meter");
                let meter = Arc::new(DecayingRateMeter::with_clock(unit, self.clock.clone()));
                vacant.insert(Arc::clone(&meter));
                Ok(meter)
            }
        }
    }

    /// Get the meter for `name`, if registered.
    pub fn get(&self, name: &str) -> Option<Arc<DecayingRateMeter<C>>> {
        self.meters.get(name).map(|m| Arc::clone(m.value()))
    }

    /// Remove the meter for `name`, returning it.
    ///
    /// Holders of the returned `Arc` may keep marking it; the registry just
    /// stops reporting it.
    pub fn remove(&self, name: &str) -> Option<Arc<DecayingRateMeter<C>>> {
        let removed = self.meters.remove(name).map(|(_, meter)| meter);
        if removed.is_some() {
            debug!(name = %name, "Removed meter");
        }
        removed
    }

    /// Get the number of registered meters.
    pub fn len(&self) -> usize {
        self.meters.len()
    }

    /// Whether no meters are registered.
    pub fn is_empty(&self) -> bool {
        self.meters.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.meters.iter().map(|m| m.key().clone()).collect();
        names.sort();
        names
    }

    /// Snapshot every registered meter, keyed by name.
    pub fn snapshot(&self) -> BTreeMap<String, MeterSnapshot> {
        self.meters
            .iter()
            .map(|m| (m.key().clone(), m.value().snapshot()))
            .collect()
    }
}

impl Default for MeterRegistry<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meter::{ManualClock, TICK_INTERVAL};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_registry_creation() {
        let registry = MeterRegistry::new();
        assert_eq!(registry.len(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_meter_creates_once() {
        let registry = MeterRegistry::new();

        let first = registry.meter("http.requests", "requests");
        let second = registry.meter("http.requests", "ignored");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.unit(), "requests");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let registry = MeterRegistry::new();

        registry.register("jobs", "jobs").unwrap();
        let result = registry.register("jobs", "jobs");

        assert!(matches!(result, Err(MeterError::AlreadyRegistered(name)) if name == "jobs"));
    }

    #[test]
    fn test_different_names_have_separate_meters() {
        let registry = MeterRegistry::new();

        registry.meter("a", "events").mark_n(5);
        registry.meter("b", "events").mark_n(3);

        assert_eq!(registry.get("a").unwrap().count(), 5);
        assert_eq!(registry.get("b").unwrap().count(), 3);
        assert!(registry.get("c").is_none());
    }

    #[test]
    fn test_remove_meter() {
        let registry = MeterRegistry::new();
        let meter = registry.meter("logins", "logins");
        meter.mark();

        let removed = registry.remove("logins").unwrap();

        assert!(Arc::ptr_eq(&meter, &removed));
        assert!(registry.is_empty());
        assert!(registry.remove("logins").is_none());

        // A new registration starts from scratch.
        assert_eq!(registry.meter("logins", "logins").count(), 0);
    }

    #[test]
    fn test_names_sorted() {
        let registry = MeterRegistry::new();
        registry.meter("zeta", "events");
        registry.meter("alpha", "events");
        registry.meter("mid", "events");

        assert_eq!(registry.names(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_snapshot_shares_clock() {
        let clock = ManualClock::new();
        let registry = MeterRegistry::with_clock(clock.clone());

        registry.meter("a", "events").mark_n(10);
        registry.meter("b", "bytes").mark_n(20);
        clock.advance(TICK_INTERVAL + Duration::from_nanos(1));

        let snapshot = registry.snapshot();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["a"].one_minute_rate, 2.0);
        assert_eq!(snapshot["b"].one_minute_rate, 4.0);
        assert_eq!(snapshot["b"].unit, "bytes");
    }

    #[test]
    fn test_concurrent_get_or_create() {
        let registry = Arc::new(MeterRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..500 {
                        registry.meter("shared", "events").mark();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("shared").unwrap().count(), 4_000);
    }
}
