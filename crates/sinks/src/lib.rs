//! Muon - Sinks
//!
//! Destinations for parsed detector events. Every sink implements [`Sink`]
//! and is shared by all source workers behind an `Arc`.
//!
//! ```text
//! [Worker] --&Event--> [FanoutDispatcher] --> [FileSink]
//!                                         \-> [ElasticsearchSink]
//! ```
//!
//! # Available Sinks
//!
//! | Sink | Purpose |
//! |------|---------|
//! | `file` | Append-only CosmicWatch data file |
//! | `elasticsearch` | Sparse JSON documents in an Elasticsearch index |
//!
//! # Example
//!
//! ```ignore
//! use muon_sinks::{FileSink, Sink};
//!
//! let sink = FileSink::open_path("CW_data.txt", true).await?;
//! sink.deliver(&event).await?;
//! sink.close().await?;
//! ```

/// File sink - append-only data file in device format
pub mod file;

/// Elasticsearch sink - indexed document store
pub mod elasticsearch;

mod common;

pub use common::{
    MetricsSnapshot, Sink, SinkError, SinkErrorKind, SinkMetrics, SinkMetricsHandle,
};
pub use elasticsearch::ElasticsearchSink;
pub use file::FileSink;
