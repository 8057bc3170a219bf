//! Fan-out dispatcher
//!
//! Delivers each event to every sink, one sink at a time, in registration
//! order. A failing sink is recorded and skipped over; it never stops the
//! remaining sinks from receiving the event.
//!
//! The dispatcher is shared by all source workers. Each worker awaits its
//! own `deliver` call before reading the next line, which keeps per-device
//! order on every sink.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use muon_protocol::Event;
use muon_sinks::{Sink, SinkErrorKind};

use crate::metrics::{DispatchMetrics, DispatchSnapshot};

/// Default progress report interval (successful deliveries per sink)
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 10;

/// Result of delivering one event to one sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// Sink was disabled and not attempted
    Skipped,
    Failed { kind: SinkErrorKind, reason: String },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Per-sink outcomes for one event, in dispatch order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    sequence_number: u64,
    outcomes: Vec<(String, DeliveryOutcome)>,
}

impl DeliveryReport {
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn outcomes(&self) -> &[(String, DeliveryOutcome)] {
        &self.outcomes
    }

    /// Outcome for the named sink
    pub fn outcome(&self, sink: &str) -> Option<&DeliveryOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == sink)
            .map(|(_, outcome)| outcome)
    }

    pub fn delivered_count(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_delivered()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_failed()).count()
    }
}

/// Handle for reading dispatch counters after the dispatcher is shared
#[derive(Debug, Clone)]
pub struct DispatchMetricsHandle {
    metrics: Arc<DispatchMetrics>,
}

impl DispatchMetricsHandle {
    pub fn snapshot(&self) -> DispatchSnapshot {
        self.metrics.snapshot()
    }
}

/// Delivers events to a fixed set of sinks
pub struct FanoutDispatcher {
    sinks: Vec<Arc<dyn Sink>>,
    metrics: Arc<DispatchMetrics>,
    progress_interval: u64,
    closed: AtomicBool,
}

impl FanoutDispatcher {
    pub fn new(sinks: Vec<Arc<dyn Sink>>) -> Self {
        let names = sinks.iter().map(|s| s.name().to_string()).collect();
        Self {
            sinks,
            metrics: Arc::new(DispatchMetrics::new(names)),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            closed: AtomicBool::new(false),
        }
    }

    /// Report progress every `interval` successful deliveries per sink
    #[must_use]
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Name and availability of every sink, in dispatch order
    pub fn sink_status(&self) -> Vec<(String, bool)> {
        self.sinks
            .iter()
            .map(|s| (s.name().to_string(), s.is_available()))
            .collect()
    }

    pub fn metrics_handle(&self) -> DispatchMetricsHandle {
        DispatchMetricsHandle {
            metrics: Arc::clone(&self.metrics),
        }
    }

    pub fn snapshot(&self) -> DispatchSnapshot {
        self.metrics.snapshot()
    }

    /// Deliver one event to every sink
    pub async fn deliver(&self, event: Event) -> DeliveryReport {
        self.metrics.record_event();
        let mut outcomes = Vec::with_capacity(self.sinks.len());

        for (idx, sink) in self.sinks.iter().enumerate() {
            let outcome = if !sink.is_available() {
                self.metrics.record_skipped(idx);
                DeliveryOutcome::Skipped
            } else {
                match sink.deliver(&event).await {
                    Ok(()) => {
                        let delivered = self.metrics.record_delivered(idx);
                        if delivered % self.progress_interval == 0 {
                            tracing::info!(sink = %sink.name(), delivered, "progress");
                        }
                        DeliveryOutcome::Delivered
                    }
                    Err(e) => {
                        self.metrics.record_failed(idx);
                        tracing::warn!(
                            sink = %sink.name(),
                            source_id = %event.source_device_id(),
                            sequence = event.sequence_number(),
                            kind = %e.kind(),
                            error = %e,
                            "delivery failed"
                        );
                        DeliveryOutcome::Failed {
                            kind: e.kind(),
                            reason: e.to_string(),
                        }
                    }
                }
            };
            outcomes.push((sink.name().to_string(), outcome));
        }

        DeliveryReport {
            sequence_number: event.sequence_number(),
            outcomes,
        }
    }

    /// Close every sink; only the first call has any effect
    ///
    /// A sink that fails to close is logged and the rest are still closed.
    pub async fn close_all(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        for sink in &self.sinks {
            match sink.close().await {
                Ok(()) => tracing::debug!(sink = %sink.name(), "sink closed"),
                Err(e) => tracing::warn!(sink = %sink.name(), error = %e, "sink close failed"),
            }
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_test.rs"]
mod dispatcher_test;
