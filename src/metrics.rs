//! Delivery counters and rate meters
//!
//! Counters and meters are plain atomics so a reporting thread can read them
//! while the delivery thread writes. They live in a [`MetricsRegistry`] owned
//! by the host process and are handed to each sink at construction.

use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

pub const SUCCEEDED_MESSAGE_COUNT: &str = "succeededMessageCount";
pub const SUCCEEDED_MESSAGE_METER: &str = "succeededMessageMeter";
pub const FAILED_MESSAGE_COUNT: &str = "failedMessageCount";
pub const FAILED_MESSAGE_METER: &str = "failedMessageMeter";

/// Monotonic counter
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Event rate meter
#[derive(Debug)]
pub struct Meter {
    count: AtomicU64,
    interval: AtomicU64,
    started: Instant,
}

impl Default for Meter {
    fn default() -> Self {
        Self {
            count: AtomicU64::new(0),
            interval: AtomicU64::new(0),
            started: Instant::now(),
        }
    }
}

impl Meter {
    pub fn mark(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.interval.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Events per second since the meter was created
    pub fn mean_rate(&self) -> f64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        self.count() as f64 / elapsed
    }

    /// Events marked since the previous call
    pub fn take_interval_count(&self) -> u64 {
        self.interval.swap(0, Ordering::Relaxed)
    }
}

/// Point-in-time view of a registry
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub counters: BTreeMap<String, u64>,
    pub meters: BTreeMap<String, MeterSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeterSnapshot {
    pub count: u64,
    pub mean_rate: f64,
}

/// Named counters and meters, created on first use
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    counters: Mutex<HashMap<String, Arc<Counter>>>,
    meters: Mutex<HashMap<String, Arc<Meter>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str) -> Arc<Counter> {
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        counters.entry(name.to_string()).or_default().clone()
    }

    pub fn meter(&self, name: &str) -> Arc<Meter> {
        let mut meters = self
            .meters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        meters.entry(name.to_string()).or_default().clone()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self
            .counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(name, counter)| (name.clone(), counter.count()))
            .collect();

        let meters = self
            .meters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(name, meter)| {
                (
                    name.clone(),
                    MeterSnapshot {
                        count: meter.count(),
                        mean_rate: meter.mean_rate(),
                    },
                )
            })
            .collect();

        MetricsSnapshot { counters, meters }
    }
}

/// The four metrics a sink reports
#[derive(Debug, Clone)]
pub struct DeliveryMetrics {
    succeeded_count: Arc<Counter>,
    succeeded_meter: Arc<Meter>,
    failed_count: Arc<Counter>,
    failed_meter: Arc<Meter>,
}

impl DeliveryMetrics {
    /// Registers (or reuses) the delivery metrics in a registry
    pub fn register(registry: &MetricsRegistry) -> Self {
        Self {
            succeeded_count: registry.counter(SUCCEEDED_MESSAGE_COUNT),
            succeeded_meter: registry.meter(SUCCEEDED_MESSAGE_METER),
            failed_count: registry.counter(FAILED_MESSAGE_COUNT),
            failed_meter: registry.meter(FAILED_MESSAGE_METER),
        }
    }

    /// Metrics backed by a private registry
    pub fn standalone() -> Self {
        Self::register(&MetricsRegistry::new())
    }

    pub fn record_success(&self) {
        self.succeeded_count.inc();
        self.succeeded_meter.mark();
    }

    pub fn record_failure(&self) {
        self.failed_count.inc();
        self.failed_meter.mark();
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded_count.count()
    }

    pub fn failed(&self) -> u64 {
        self.failed_count.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_meter_interval_count_resets() {
        let meter = Meter::default();
        meter.mark();
        meter.mark();

        assert_eq!(meter.take_interval_count(), 2);
        assert_eq!(meter.take_interval_count(), 0);
        assert_eq!(meter.count(), 2);
        assert!(meter.mean_rate() >= 0.0);
    }

    #[test]
    fn test_registry_reuses_named_metrics() {
        let registry = MetricsRegistry::new();
        let first = DeliveryMetrics::register(&registry);
        let second = DeliveryMetrics::register(&registry);

        first.record_success();
        second.record_failure();

        assert_eq!(second.succeeded(), 1);
        assert_eq!(first.failed(), 1);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.counters[SUCCEEDED_MESSAGE_COUNT], 1);
        assert_eq!(snapshot.counters[FAILED_MESSAGE_COUNT], 1);
        assert_eq!(snapshot.meters[SUCCEEDED_MESSAGE_METER].count, 1);
        assert_eq!(snapshot.meters[FAILED_MESSAGE_METER].count, 1);
    }

    #[test]
    fn test_counter_concurrent_increments() {
        let counter = Arc::new(Counter::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = counter.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        counter.inc();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.count(), 4000);
    }

    #[test]
    fn test_standalone_metrics_are_isolated() {
        let a = DeliveryMetrics::standalone();
        let b = DeliveryMetrics::standalone();
        a.record_success();
        assert_eq!(a.succeeded(), 1);
        assert_eq!(b.succeeded(), 0);
    }
}
