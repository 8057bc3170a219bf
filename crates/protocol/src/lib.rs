//! Muon Protocol - Detection records and the device line format
//!
//! This crate provides the types that flow through the ingestion pipeline:
//! - `Event` - One parsed detection record, immutable once built
//! - `Vector3` - Accelerometer / gyroscope triple
//! - `RecordParser` - Tab-delimited device line → `Event`
//! - `stamp_line` - Appends the host clock fields before parsing
//!
//! # Line Format
//!
//! ```text
//! Event  Timestamp[s]  Flag  ADC[12b]  SiPM[mV]  Deadtime[s]  Temp[C]  Press[Pa]  Accel(X:Y:Z)[g]  Gyro(X:Y:Z)[deg/sec]  Name  Time  Date
//! ```
//!
//! The first six columns are mandatory. `Time` and `Date` are never sent by
//! the device; the ingesting process appends them (see [`stamp_line`]).

mod error;
mod event;
mod parser;
mod stamp;

pub use error::{ParseError, ParseErrorKind};
pub use event::{Event, Vector3};
pub use parser::RecordParser;
pub use stamp::{HostStamp, stamp_line};

/// Result type for parse operations
pub type Result<T> = std::result::Result<T, ParseError>;

/// Field separator used by the device
pub const FIELD_SEPARATOR: char = '\t';

/// Minimum number of fields for a parseable line (the mandatory columns)
pub const MIN_FIELDS: usize = 6;

/// Number of columns the device itself reports (through `Name`)
pub const DEVICE_FIELDS: usize = 11;

/// Separator inside accelerometer / gyroscope fields
pub const TRIPLE_SEPARATOR: char = ':';
