//! Synthetic workloads that mark meters from background threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::WorkloadConfig;
use crate::error::Result;
use crate::meter::{Clock, DecayingRateMeter};
use crate::registry::MeterRegistry;

/// How often each worker marks its meter.
const BATCH_PERIOD: Duration = Duration::from_millis(100);

/// Running set of workload threads.
pub struct LoadGenerator {
    running: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl LoadGenerator {
    /// Spawn the threads for every workload.
    ///
    /// Each workload's meter is fetched from (or created in) `registry`.
    pub fn start<C>(registry: &MeterRegistry<C>, workloads: &[WorkloadConfig]) -> Result<Self>
    where
        C: Clock + Clone + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let mut generator = Self {
            running: Arc::clone(&running),
            workers: Vec::new(),
        };

        for workload in workloads {
            let meter = registry.meter(&workload.name, &workload.unit);
            let threads = workload.threads.max(1);
            let per_batch = workload.events_per_sec * BATCH_PERIOD.as_secs_f64() / threads as f64;

            for index in 0..threads {
                let worker = Worker {
                    meter: Arc::clone(&meter),
                    running: Arc::clone(&running),
                    per_batch,
                    jitter: workload.jitter,
                };
                let handle = thread::Builder::new()
                    .name(format!("load-{}-{}", workload.name, index))
                    .spawn(move || worker.run());

                match handle {
                    Ok(handle) => generator.workers.push(handle),
                    Err(e) => {
                        generator.stop();
                        return Err(e.into());
                    }
                }
            }

            info!(
                name = %workload.name,
                events_per_sec = workload.events_per_sec,
                threads = threads,
                "Workload started"
            );
        }

        Ok(generator)
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Signal every worker to finish and wait for them.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("Load worker panicked");
            }
        }
        debug!("Load generator stopped");
    }
}

impl Drop for LoadGenerator {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.stop();
        }
    }
}

struct Worker<C: Clock> {
    meter: Arc<DecayingRateMeter<C>>,
    running: Arc<AtomicBool>,
    per_batch: f64,
    jitter: f64,
}

impl<C: Clock> Worker<C> {
    fn run(self) {
        let mut rng = rand::thread_rng();
        // Fractional events carry over so low rates still mark.
        let mut carry = 0.0;

        while self.running.load(Ordering::Acquire) {
            let scale = if self.jitter > 0.0 {
                rng.gen_range(1.0 - self.jitter..=1.0 + self.jitter)
            } else {
                1.0
            };
            carry += self.per_batch * scale;
            let whole = carry.floor();
            carry -= whole;

            if whole >= 1.0 {
                self.meter.mark_n(whole as u64);
            }
            thread::sleep(BATCH_PERIOD);
        }
    }
}
