//! Channel source
//!
//! In-process line source fed through a tokio mpsc channel. Used to embed
//! the pipeline behind another reader and to drive it from tests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::common::{LineSource, SourceMetrics, SourceMetricsHandle};
use crate::error::SourceError;

/// Default channel capacity
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Line source backed by an mpsc receiver
///
/// The stream ends when every sender has been dropped.
pub struct ChannelSource {
    id: String,
    rx: mpsc::Receiver<String>,
    open: bool,
    metrics: Arc<SourceMetrics>,
}

impl ChannelSource {
    /// Create a source and the sender that feeds it
    pub fn new(id: impl Into<String>) -> (Self, mpsc::Sender<String>) {
        Self::with_capacity(id, DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(id: impl Into<String>, capacity: usize) -> (Self, mpsc::Sender<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        let source = Self {
            id: id.into(),
            rx,
            open: false,
            metrics: Arc::new(SourceMetrics::new()),
        };
        (source, tx)
    }
}

#[async_trait]
impl LineSource for ChannelSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn open(&mut self) -> Result<(), SourceError> {
        self.open = true;
        self.metrics.opened();
        Ok(())
    }

    async fn next_line(&mut self) -> Result<Option<String>, SourceError> {
        if !self.open {
            return Err(SourceError::not_open(&self.id));
        }

        while let Some(line) = self.rx.recv().await {
            self.metrics.bytes(line.len() as u64);
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                continue;
            }
            self.metrics.line();
            return Ok(Some(line.to_string()));
        }
        Ok(None)
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        if self.open {
            self.open = false;
            self.rx.close();
            self.metrics.closed();
        }
        Ok(())
    }

    fn metrics_handle(&self) -> SourceMetricsHandle {
        SourceMetricsHandle::new(&self.id, Arc::clone(&self.metrics))
    }
}
