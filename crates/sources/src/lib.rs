//! Muon Sources
//!
//! Line sources that connect to CosmicWatch detectors and yield raw
//! tab-delimited records for the pipeline.
//!
//! # Available Sources
//!
//! - **Device** - serial device path, serial-over-TCP bridge, or stdin
//! - **Channel** - in-process mpsc feed
//!
//! # Example
//!
//! ```ignore
//! use muon_sources::{DeviceSource, Endpoint, LineSource};
//!
//! let mut source = DeviceSource::new("cosmicwatch-001", Endpoint::Path("/dev/ttyUSB0".into()));
//! source.open().await?;
//! while let Some(line) = source.next_line().await? {
//!     println!("{line}");
//! }
//! source.close().await?;
//! ```

mod channel;
mod common;
mod device;
mod error;
mod thread_reader;

pub use channel::{ChannelSource, DEFAULT_CHANNEL_CAPACITY};
pub use common::{LineSource, SourceMetrics, SourceMetricsHandle, SourceMetricsSnapshot};
pub use device::{DEFAULT_MAX_LINE_LENGTH, DeviceSource, Endpoint};
pub use error::SourceError;
