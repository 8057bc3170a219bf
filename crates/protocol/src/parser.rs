//! Device line parser
//!
//! Converts one tab-delimited line into an `Event`. Strict on the six
//! mandatory columns, lenient on the auxiliary sensor triples.

use std::str::FromStr;

use chrono::Utc;

use crate::error::ParseError;
use crate::event::{Event, Vector3};
use crate::{FIELD_SEPARATOR, MIN_FIELDS, Result};

// Column positions
const COL_SEQUENCE: usize = 0;
const COL_TIMESTAMP: usize = 1;
const COL_FLAG: usize = 2;
const COL_ADC: usize = 3;
const COL_SIPM: usize = 4;
const COL_DEADTIME: usize = 5;
const COL_TEMPERATURE: usize = 6;
const COL_PRESSURE: usize = 7;
const COL_ACCEL: usize = 8;
const COL_GYRO: usize = 9;
const COL_NAME: usize = 10;
const COL_HOST_TIME: usize = 11;
const COL_HOST_DATE: usize = 12;

/// Stateless parser for device lines
///
/// # Example
///
/// ```
/// use muon_protocol::RecordParser;
///
/// let line = "5\t1700000000.123\t1\t2048\t150.5\t0.0001";
/// let event = RecordParser::parse(line, "cosmicwatch-001").unwrap();
/// assert_eq!(event.sequence_number(), 5);
/// assert!(event.is_coincident());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordParser;

impl RecordParser {
    /// Parse a line, stamping it with the current wall clock
    pub fn parse(raw_line: &str, source_id: &str) -> Result<Event> {
        Self::parse_at(raw_line, source_id, Utc::now().timestamp_millis())
    }

    /// Parse a line with an explicit ingest timestamp (Unix milliseconds)
    pub fn parse_at(raw_line: &str, source_id: &str, ingest_timestamp_ms: i64) -> Result<Event> {
        let line = raw_line.trim_end_matches(['\r', '\n']);
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();

        if fields.len() < MIN_FIELDS {
            return Err(ParseError::truncated(fields.len()));
        }

        let sequence_number = required(&fields, COL_SEQUENCE, "event")?;
        let device_timestamp_s = required(&fields, COL_TIMESTAMP, "pico_timestamp_s")?;
        let flag: i64 = required(&fields, COL_FLAG, "coincidence_flag")?;
        let adc_value = required(&fields, COL_ADC, "adc_value")?;
        let sipm_mv = required(&fields, COL_SIPM, "sipm_mv")?;
        let deadtime_s = required(&fields, COL_DEADTIME, "deadtime_s")?;

        let temperature_c = optional(&fields, COL_TEMPERATURE, "temperature_c")?;
        let pressure_pa = optional(&fields, COL_PRESSURE, "pressure_pa")?;

        let accelerometer = fields.get(COL_ACCEL).and_then(|f| Vector3::parse(f));
        let gyroscope = fields.get(COL_GYRO).and_then(|f| Vector3::parse(f));

        Ok(Event {
            sequence_number,
            device_timestamp_s,
            coincidence_flag: flag,
            adc_value,
            sipm_mv,
            deadtime_s,
            temperature_c,
            pressure_pa,
            accelerometer,
            gyroscope,
            source_device_id: source_id.to_string(),
            detector_name: text(&fields, COL_NAME),
            host_time: text(&fields, COL_HOST_TIME),
            host_date: text(&fields, COL_HOST_DATE),
            ingest_timestamp_ms,
            raw_fields: fields.iter().map(|f| (*f).to_string()).collect(),
        })
    }
}

/// Column value type; `nan` and `inf` parse as floats but are not readings
trait Numeric: FromStr {
    fn is_finite(&self) -> bool {
        true
    }
}

impl Numeric for u32 {}
impl Numeric for u64 {}
impl Numeric for i64 {}

impl Numeric for f64 {
    fn is_finite(&self) -> bool {
        f64::is_finite(*self)
    }
}

/// Parse one numeric value, rejecting non-finite floats
fn number<T: Numeric>(value: &str, name: &'static str) -> Result<T> {
    value
        .parse::<T>()
        .ok()
        .filter(Numeric::is_finite)
        .ok_or_else(|| ParseError::invalid_number(name, value))
}

/// Parse a mandatory numeric column
fn required<T: Numeric>(fields: &[&str], index: usize, name: &'static str) -> Result<T> {
    number(fields[index].trim(), name)
}

/// Parse an optional numeric column; missing or empty is `None`
fn optional<T: Numeric>(fields: &[&str], index: usize, name: &'static str) -> Result<Option<T>> {
    match fields.get(index).map(|f| f.trim()) {
        None | Some("") => Ok(None),
        Some(value) => number(value, name).map(Some),
    }
}

/// Optional text column; missing or empty is `None`
fn text(fields: &[&str], index: usize) -> Option<String> {
    fields
        .get(index)
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .map(str::to_string)
}
