//! Common types and utilities for sinks
//!
//! The `Sink` trait, the error taxonomy, and metrics shared by every sink.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use muon_protocol::Event;
use thiserror::Error;

/// A destination for parsed events
///
/// Implementations must accept concurrent `deliver` calls from several
/// source workers. Each call either fully writes the event or fails; a
/// failure never affects other sinks.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Sink name used in logs and reports
    fn name(&self) -> &str;

    /// Whether the sink is accepting events
    ///
    /// A sink that failed its startup checks reports `false` for the rest
    /// of the run.
    fn is_available(&self) -> bool {
        true
    }

    /// Write one event
    async fn deliver(&self, event: &Event) -> Result<(), SinkError>;

    /// Flush and release resources; later calls are no-ops
    async fn close(&self) -> Result<(), SinkError>;

    /// Metrics handle that outlives the sink
    fn metrics_handle(&self) -> SinkMetricsHandle;
}

/// Metrics shared by all sink types
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Total events handed to `deliver`
    pub events_received: AtomicU64,

    /// Total events successfully written
    pub events_written: AtomicU64,

    /// Total bytes written
    pub bytes_written: AtomicU64,

    /// Write errors encountered
    pub write_errors: AtomicU64,

    /// Flush operations performed
    pub flush_count: AtomicU64,

    /// Close operations that released a resource
    pub close_count: AtomicU64,
}

impl SinkMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            events_received: AtomicU64::new(0),
            events_written: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
            close_count: AtomicU64::new(0),
        }
    }

    /// Record a received event
    #[inline]
    pub fn event_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successfully written event
    #[inline]
    pub fn event_written(&self, bytes: u64) {
        self.events_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a write error
    #[inline]
    pub fn write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a flush operation
    #[inline]
    pub fn flush(&self) {
        self.flush_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn closed(&self) {
        self.close_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_written: self.events_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            flush_count: self.flush_count.load(Ordering::Relaxed),
            close_count: self.close_count.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of sink metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub events_received: u64,
    pub events_written: u64,
    pub bytes_written: u64,
    pub write_errors: u64,
    pub flush_count: u64,
    pub close_count: u64,
}

/// Handle for reading a sink's metrics after it has been shared
#[derive(Debug, Clone)]
pub struct SinkMetricsHandle {
    name: String,
    metrics: Arc<SinkMetrics>,
}

impl SinkMetricsHandle {
    pub fn new(name: impl Into<String>, metrics: Arc<SinkMetrics>) -> Self {
        Self {
            name: name.into(),
            metrics,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Coarse classification of a failed delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkErrorKind {
    /// Destination could not be reached or the handle is gone
    Unavailable,
    /// Destination refused the event
    Rejected,
    /// Destination did not answer in time
    Timeout,
    /// Startup checks failed; the sink is disabled for the run
    Init,
}

impl SinkErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unavailable => "unavailable",
            Self::Rejected => "rejected",
            Self::Timeout => "timeout",
            Self::Init => "init",
        }
    }
}

impl std::fmt::Display for SinkErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    /// Sink initialization failed
    #[error("failed to initialize sink: {0}")]
    Init(String),

    /// Destination unreachable or closed
    #[error("sink unavailable: {0}")]
    Unavailable(String),

    /// Destination refused the write
    #[error("rejected: {0}")]
    Rejected(String),

    /// Request deadline exceeded
    #[error("timed out: {0}")]
    Timeout(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl SinkError {
    /// Create an initialization error
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Classify the error
    pub fn kind(&self) -> SinkErrorKind {
        match self {
            Self::Init(_) => SinkErrorKind::Init,
            Self::Unavailable(_) => SinkErrorKind::Unavailable,
            Self::Rejected(_) | Self::Serialization(_) => SinkErrorKind::Rejected,
            Self::Timeout(_) => SinkErrorKind::Timeout,
            Self::Io(e) if e.kind() == std::io::ErrorKind::TimedOut => SinkErrorKind::Timeout,
            Self::Io(_) => SinkErrorKind::Unavailable,
        }
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod common_test;
