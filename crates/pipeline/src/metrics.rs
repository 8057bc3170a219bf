//! Dispatch metrics
//!
//! Atomic counters for the fan-out dispatcher. The sink set is fixed at
//! construction, so per-sink counters live in a `Vec` indexed by the
//! sink's position.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one sink
#[derive(Debug, Default)]
struct SinkCounters {
    delivered: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

/// Metrics for the fan-out dispatcher
///
/// Relaxed ordering throughout; values are eventually consistent.
#[derive(Debug)]
pub struct DispatchMetrics {
    events_seen: AtomicU64,
    names: Vec<String>,
    sinks: Vec<SinkCounters>,
}

impl DispatchMetrics {
    /// Create counters for the named sinks, in dispatch order
    pub fn new(names: Vec<String>) -> Self {
        let sinks = names.iter().map(|_| SinkCounters::default()).collect();
        Self {
            events_seen: AtomicU64::new(0),
            names,
            sinks,
        }
    }

    #[inline]
    pub fn record_event(&self) {
        self.events_seen.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful delivery; returns the sink's new delivered count
    #[inline]
    pub fn record_delivered(&self, sink: usize) -> u64 {
        self.sinks[sink].delivered.fetch_add(1, Ordering::Relaxed) + 1
    }

    #[inline]
    pub fn record_failed(&self, sink: usize) {
        self.sinks[sink].failed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_skipped(&self, sink: usize) {
        self.sinks[sink].skipped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn events_seen(&self) -> u64 {
        self.events_seen.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all counters
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            events_seen: self.events_seen(),
            sinks: self
                .names
                .iter()
                .zip(&self.sinks)
                .map(|(name, c)| SinkCounts {
                    name: name.clone(),
                    delivered: c.delivered.load(Ordering::Relaxed),
                    failed: c.failed.load(Ordering::Relaxed),
                    skipped: c.skipped.load(Ordering::Relaxed),
                })
                .collect(),
        }
    }
}

/// Point-in-time counts for one sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkCounts {
    pub name: String,
    pub delivered: u64,
    pub failed: u64,
    pub skipped: u64,
}

/// Point-in-time copy of the dispatcher counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSnapshot {
    pub events_seen: u64,
    pub sinks: Vec<SinkCounts>,
}

impl DispatchSnapshot {
    /// Counts for the named sink
    pub fn sink(&self, name: &str) -> Option<&SinkCounts> {
        self.sinks.iter().find(|s| s.name == name)
    }
}
