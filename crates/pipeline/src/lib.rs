//! Muon - Pipeline
//!
//! Connects detector sources to sinks.
//!
//! # Architecture
//!
//! ```text
//! [Sources]            [Workers]                      [Sinks]
//!   ttyUSB0 ──→ stamp → parse ──┐                  ┌──→ FileSink
//!   ttyUSB1 ──→ stamp → parse ──┼──→ FanoutDispatcher ──┤
//!   tcp     ──→ stamp → parse ──┘                  └──→ ElasticsearchSink
//! ```
//!
//! # Key Design
//!
//! - **One task per source**: an idle detector never blocks the others
//! - **Shared dispatcher**: workers call `deliver` directly, no queues
//! - **Isolated sinks**: a failed delivery is reported per sink and counted
//! - **Ordered shutdown**: sources released first, sinks closed last, once
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use muon_pipeline::{FanoutDispatcher, IngestionSupervisor};
//! use tokio_util::sync::CancellationToken;
//!
//! let dispatcher = Arc::new(FanoutDispatcher::new(vec![file_sink]));
//! let mut supervisor = IngestionSupervisor::new(dispatcher);
//! supervisor.add_source(Box::new(device));
//!
//! let cancel = CancellationToken::new();
//! let summary = supervisor.run(cancel.clone()).await?;
//! summary.log();
//! ```

mod dispatcher;
mod error;
mod metrics;
mod supervisor;

pub use dispatcher::{
    DEFAULT_PROGRESS_INTERVAL, DeliveryOutcome, DeliveryReport, DispatchMetricsHandle,
    FanoutDispatcher,
};
pub use error::{PipelineError, Result};
pub use metrics::{DispatchMetrics, DispatchSnapshot, SinkCounts};
pub use supervisor::{
    DEFAULT_SHUTDOWN_TIMEOUT, IngestionSummary, IngestionSupervisor, SourceState, SourceSummary,
    SupervisorHandle,
};
