//! Common types for sources
//!
//! The `LineSource` trait and the metrics every source keeps.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::SourceError;

/// A connection to one detector that yields raw text lines
///
/// Lifecycle is `open` → repeated `next_line` → `close`. `close` must be
/// safe to call after a failed `open` and more than once.
///
/// `next_line` is not required to be cancel-safe: a partially read line is
/// lost if the future is dropped. Callers only drop it when shutting down.
#[async_trait]
pub trait LineSource: Send {
    /// Stable source id, stamped on every event as the device id
    fn id(&self) -> &str;

    /// Establish the connection
    async fn open(&mut self) -> Result<(), SourceError>;

    /// Wait for the next non-empty line, without its line terminator
    ///
    /// Returns `Ok(None)` when the device closed the stream.
    async fn next_line(&mut self) -> Result<Option<String>, SourceError>;

    /// Release the connection
    async fn close(&mut self) -> Result<(), SourceError>;

    /// Metrics handle that outlives the source
    fn metrics_handle(&self) -> SourceMetricsHandle;
}

/// Metrics shared by all source types
#[derive(Debug, Default)]
pub struct SourceMetrics {
    /// Successful opens
    pub opens: AtomicU64,

    /// Completed closes
    pub closes: AtomicU64,

    /// Non-empty lines returned
    pub lines_read: AtomicU64,

    /// Bytes consumed, including terminators and blank lines
    pub bytes_read: AtomicU64,

    /// Read or open errors
    pub errors: AtomicU64,

    /// Lines dropped for exceeding the length limit
    pub oversized: AtomicU64,
}

impl SourceMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            opens: AtomicU64::new(0),
            closes: AtomicU64::new(0),
            lines_read: AtomicU64::new(0),
            bytes_read: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            oversized: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn opened(&self) {
        self.opens.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn closed(&self) {
        self.closes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record consumed bytes
    #[inline]
    pub fn bytes(&self, n: u64) {
        self.bytes_read.fetch_add(n, Ordering::Relaxed);
    }

    /// Record a returned line
    #[inline]
    pub fn line(&self) {
        self.lines_read.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dropped oversize line, returning the new total
    #[inline]
    pub fn oversize(&self) -> u64 {
        self.oversized.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> SourceMetricsSnapshot {
        SourceMetricsSnapshot {
            opens: self.opens.load(Ordering::Relaxed),
            closes: self.closes.load(Ordering::Relaxed),
            lines_read: self.lines_read.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            oversized: self.oversized.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of source metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceMetricsSnapshot {
    pub opens: u64,
    pub closes: u64,
    pub lines_read: u64,
    pub bytes_read: u64,
    pub errors: u64,
    pub oversized: u64,
}

/// Handle for reading a source's metrics
///
/// Holds an `Arc` to the metrics, so it remains valid after the source is
/// moved into its worker task.
#[derive(Debug, Clone)]
pub struct SourceMetricsHandle {
    id: String,
    metrics: Arc<SourceMetrics>,
}

impl SourceMetricsHandle {
    pub fn new(id: impl Into<String>, metrics: Arc<SourceMetrics>) -> Self {
        Self {
            id: id.into(),
            metrics,
        }
    }

    pub fn source_id(&self) -> &str {
        &self.id
    }

    pub fn snapshot(&self) -> SourceMetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_tracking() {
        let metrics = SourceMetrics::new();

        metrics.opened();
        metrics.bytes(42);
        metrics.line();
        metrics.line();
        metrics.error();
        assert_eq!(metrics.oversize(), 1);
        metrics.closed();

        let snapshot = metrics.snapshot();
        assert_eq!(
            snapshot,
            SourceMetricsSnapshot {
                opens: 1,
                closes: 1,
                lines_read: 2,
                bytes_read: 42,
                errors: 1,
                oversized: 1,
            }
        );
    }

    #[test]
    fn test_handle_shares_metrics() {
        let metrics = Arc::new(SourceMetrics::new());
        let handle = SourceMetricsHandle::new("det-a", Arc::clone(&metrics));

        metrics.line();
        assert_eq!(handle.source_id(), "det-a");
        assert_eq!(handle.snapshot().lines_read, 1);
    }
}
