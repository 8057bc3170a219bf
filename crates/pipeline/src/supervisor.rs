//! Ingestion supervisor
//!
//! Runs one worker task per detector source. Each worker moves through
//!
//! ```text
//! Opening -> Reading -> Closing -> Closed
//!    \
//!     -> Failed
//! ```
//!
//! and in `Reading` loops over stamp, parse and deliver. A bad line is
//! counted and dropped. A source error ends only that worker.
//!
//! Stopping cancels every worker between deliveries, releases every
//! source, and closes the sinks once all workers have returned.

use std::sync::Arc;
use std::time::Duration;

use muon_protocol::{HostStamp, RecordParser, stamp_line};
use muon_sources::LineSource;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dispatcher::FanoutDispatcher;
use crate::error::{PipelineError, Result};
use crate::metrics::DispatchSnapshot;

/// Default time a worker is given to stop before a warning is logged
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle state of one source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Opening,
    Reading,
    Closing,
    Closed,
    /// Connection could not be established
    Failed,
}

impl SourceState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::Reading => "reading",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Failed => "failed",
        }
    }

    /// Whether the worker for this source has finished
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

impl std::fmt::Display for SourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source states indexed by worker position
#[derive(Debug, Clone, Default)]
struct StateRegistry {
    entries: Arc<RwLock<Vec<(String, SourceState)>>>,
}

impl StateRegistry {
    fn register(&self, id: &str) -> usize {
        let mut entries = self.entries.write();
        entries.push((id.to_string(), SourceState::Opening));
        entries.len() - 1
    }

    fn set(&self, idx: usize, state: SourceState) {
        if let Some(entry) = self.entries.write().get_mut(idx) {
            tracing::trace!(source_id = %entry.0, from = %entry.1, to = %state, "source state");
            entry.1 = state;
        }
    }

    fn snapshot(&self) -> Vec<(String, SourceState)> {
        self.entries.read().clone()
    }
}

/// Read-only view of source states, usable while the supervisor runs
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
    states: StateRegistry,
}

impl SupervisorHandle {
    /// `(source id, state)` for every source, in registration order
    pub fn states(&self) -> Vec<(String, SourceState)> {
        self.states.snapshot()
    }

    pub fn state(&self, id: &str) -> Option<SourceState> {
        self.states
            .snapshot()
            .into_iter()
            .find(|(source_id, _)| source_id == id)
            .map(|(_, state)| state)
    }
}

/// Per-source totals reported at shutdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSummary {
    pub id: String,
    pub state: SourceState,
    pub lines_read: u64,
    pub events_parsed: u64,
    pub parse_errors: u64,
    /// Open or read error that ended the worker
    pub error: Option<String>,
}

/// Totals for a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionSummary {
    pub sources: Vec<SourceSummary>,
    pub dispatch: DispatchSnapshot,
}

impl IngestionSummary {
    pub fn lines_read(&self) -> u64 {
        self.sources.iter().map(|s| s.lines_read).sum()
    }

    pub fn parse_errors(&self) -> u64 {
        self.sources.iter().map(|s| s.parse_errors).sum()
    }

    /// Emit the final per-source and per-sink counts
    pub fn log(&self) {
        for source in &self.sources {
            tracing::info!(
                source_id = %source.id,
                state = %source.state,
                lines = source.lines_read,
                events = source.events_parsed,
                parse_errors = source.parse_errors,
                "source summary"
            );
        }
        for sink in &self.dispatch.sinks {
            tracing::info!(
                sink = %sink.name,
                delivered = sink.delivered,
                failed = sink.failed,
                skipped = sink.skipped,
                "sink summary"
            );
        }
    }
}

/// Owns the sources and drives one worker per source
pub struct IngestionSupervisor {
    sources: Vec<Box<dyn LineSource>>,
    dispatcher: Arc<FanoutDispatcher>,
    states: StateRegistry,
    shutdown_timeout: Duration,
}

impl IngestionSupervisor {
    pub fn new(dispatcher: Arc<FanoutDispatcher>) -> Self {
        Self {
            sources: Vec::new(),
            dispatcher,
            states: StateRegistry::default(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Add a source; its id must be unique
    pub fn add_source(&mut self, source: Box<dyn LineSource>) {
        self.states.register(source.id());
        self.sources.push(source);
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn handle(&self) -> SupervisorHandle {
        SupervisorHandle {
            states: self.states.clone(),
        }
    }

    /// Run until every source ends or `cancel` fires
    ///
    /// Sinks are closed exactly once, after every worker has returned.
    ///
    /// # Errors
    ///
    /// `NoSourcesOpened` if every source failed to open; the sinks are
    /// still closed.
    pub async fn run(self, cancel: CancellationToken) -> Result<IngestionSummary> {
        if self.sources.is_empty() {
            return Err(PipelineError::NoSources);
        }

        let attempted = self.sources.len();

        let workers: Vec<(String, JoinHandle<SourceSummary>)> = self
            .sources
            .into_iter()
            .enumerate()
            .map(|(idx, source)| {
                let id = source.id().to_string();
                let worker = Worker {
                    idx,
                    id: id.clone(),
                    source,
                    states: self.states.clone(),
                    dispatcher: Arc::clone(&self.dispatcher),
                    cancel: cancel.clone(),
                };
                (id, tokio::spawn(worker.run()))
            })
            .collect();

        tracing::info!(sources = attempted, "ingestion started");

        let mut summaries = Vec::with_capacity(attempted);
        for (id, mut task) in workers {
            let summary = tokio::select! {
                joined = &mut task => joined,
                _ = cancel.cancelled() => {
                    match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                        Ok(joined) => joined,
                        Err(_) => {
                            tracing::warn!(
                                source_id = %id,
                                timeout = ?self.shutdown_timeout,
                                "worker still delivering, waiting for it to finish"
                            );
                            task.await
                        }
                    }
                }
            };

            match summary {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    tracing::error!(source_id = %id, error = %e, "worker panicked");
                    summaries.push(SourceSummary {
                        id,
                        state: SourceState::Failed,
                        lines_read: 0,
                        events_parsed: 0,
                        parse_errors: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        self.dispatcher.close_all().await;

        let summary = IngestionSummary {
            sources: summaries,
            dispatch: self.dispatcher.snapshot(),
        };

        if summary
            .sources
            .iter()
            .all(|s| s.state == SourceState::Failed)
        {
            return Err(PipelineError::NoSourcesOpened { attempted });
        }

        Ok(summary)
    }
}

/// State owned by one worker task
struct Worker {
    idx: usize,
    id: String,
    source: Box<dyn LineSource>,
    states: StateRegistry,
    dispatcher: Arc<FanoutDispatcher>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(mut self) -> SourceSummary {
        let mut summary = SourceSummary {
            id: self.id.clone(),
            state: SourceState::Opening,
            lines_read: 0,
            events_parsed: 0,
            parse_errors: 0,
            error: None,
        };

        let opened = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = self.source.open() => Some(result),
        };

        match opened {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                tracing::error!(source_id = %self.id, error = %e, "failed to open source");
                summary.error = Some(e.to_string());
                self.release().await;
                return self.finish(summary, SourceState::Failed);
            }
            None => {
                self.release().await;
                return self.finish(summary, SourceState::Closed);
            }
        }

        self.states.set(self.idx, SourceState::Reading);

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                next = self.source.next_line() => next,
            };

            let line = match next {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::info!(source_id = %self.id, "source reached end of stream");
                    break;
                }
                Err(e) => {
                    tracing::error!(source_id = %self.id, error = %e, "source read failed");
                    summary.error = Some(e.to_string());
                    break;
                }
            };

            summary.lines_read += 1;
            tracing::debug!(source_id = %self.id, line = %line, "raw line");

            let stamped = stamp_line(&line, &HostStamp::now());
            match RecordParser::parse(&stamped, &self.id) {
                Ok(event) => {
                    summary.events_parsed += 1;
                    self.dispatcher.deliver(event).await;
                }
                Err(e) => {
                    summary.parse_errors += 1;
                    tracing::warn!(
                        source_id = %self.id,
                        kind = ?e.kind(),
                        error = %e,
                        "discarding unparseable line"
                    );
                }
            }
        }

        self.states.set(self.idx, SourceState::Closing);
        self.release().await;
        self.finish(summary, SourceState::Closed)
    }

    /// Release the source; failures are logged and do not change the outcome
    async fn release(&mut self) {
        if let Err(e) = self.source.close().await {
            tracing::warn!(source_id = %self.id, error = %e, "source close failed");
        }
    }

    fn finish(&self, mut summary: SourceSummary, state: SourceState) -> SourceSummary {
        self.states.set(self.idx, state);
        summary.state = state;
        summary
    }
}

#[cfg(test)]
#[path = "supervisor_test.rs"]
mod supervisor_test;
