//! Detection event types
//!
//! An `Event` is built once by the parser and then only read. Sinks receive
//! `&Event` and derive their own serialized form from it.

use std::fmt;

/// Three-axis sensor reading (accelerometer in g, gyroscope in deg/s)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    /// Create a new vector
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Parse a colon-delimited `X:Y:Z` field
    ///
    /// Returns `None` unless the field splits into exactly three finite
    /// parts. A partial vector is never produced.
    pub fn parse(field: &str) -> Option<Self> {
        let field = field.trim();
        if field.is_empty() {
            return None;
        }

        let mut parts = field.split(crate::TRIPLE_SEPARATOR);
        let mut component = || {
            parts
                .next()?
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
        };
        let x = component()?;
        let y = component()?;
        let z = component()?;

        if parts.next().is_some() {
            return None;
        }

        Some(Self { x, y, z })
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.x, self.y, self.z)
    }
}

/// One detection record from a single device
///
/// The six mandatory columns are always present. Optional sensor columns are
/// either fully present or absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub(crate) sequence_number: u64,
    pub(crate) device_timestamp_s: f64,
    pub(crate) coincidence_flag: i64,
    pub(crate) adc_value: u32,
    pub(crate) sipm_mv: f64,
    pub(crate) deadtime_s: f64,
    pub(crate) temperature_c: Option<f64>,
    pub(crate) pressure_pa: Option<f64>,
    pub(crate) accelerometer: Option<Vector3>,
    pub(crate) gyroscope: Option<Vector3>,
    pub(crate) source_device_id: String,
    pub(crate) detector_name: Option<String>,
    pub(crate) host_time: Option<String>,
    pub(crate) host_date: Option<String>,
    pub(crate) ingest_timestamp_ms: i64,
    pub(crate) raw_fields: Vec<String>,
}

impl Event {
    /// Device-assigned event number (monotonic per device)
    #[inline]
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    /// Device-local clock in seconds
    #[inline]
    pub fn device_timestamp_s(&self) -> f64 {
        self.device_timestamp_s
    }

    /// Whether the coincidence flag was set
    #[inline]
    pub fn is_coincident(&self) -> bool {
        self.coincidence_flag == 1
    }

    /// Raw coincidence flag as reported by the device
    #[inline]
    pub fn coincidence_flag(&self) -> i64 {
        self.coincidence_flag
    }

    /// 12-bit ADC reading
    #[inline]
    pub fn adc_value(&self) -> u32 {
        self.adc_value
    }

    /// SiPM peak voltage in millivolts
    #[inline]
    pub fn sipm_mv(&self) -> f64 {
        self.sipm_mv
    }

    /// Accumulated deadtime in seconds
    #[inline]
    pub fn deadtime_s(&self) -> f64 {
        self.deadtime_s
    }

    #[inline]
    pub fn temperature_c(&self) -> Option<f64> {
        self.temperature_c
    }

    #[inline]
    pub fn pressure_pa(&self) -> Option<f64> {
        self.pressure_pa
    }

    #[inline]
    pub fn accelerometer(&self) -> Option<Vector3> {
        self.accelerometer
    }

    #[inline]
    pub fn gyroscope(&self) -> Option<Vector3> {
        self.gyroscope
    }

    /// Identifier configured for the physical source (never parsed)
    #[inline]
    pub fn source_device_id(&self) -> &str {
        &self.source_device_id
    }

    /// Detector name reported by the device
    #[inline]
    pub fn detector_name(&self) -> Option<&str> {
        self.detector_name.as_deref()
    }

    /// Host time-of-day appended at ingest (metadata only)
    #[inline]
    pub fn host_time(&self) -> Option<&str> {
        self.host_time.as_deref()
    }

    /// Host date appended at ingest (metadata only)
    #[inline]
    pub fn host_date(&self) -> Option<&str> {
        self.host_date.as_deref()
    }

    /// Parse-time wall clock in Unix milliseconds
    ///
    /// This is the authoritative delivery time. Device and host clock fields
    /// never override it.
    #[inline]
    pub fn ingest_timestamp_ms(&self) -> i64 {
        self.ingest_timestamp_ms
    }

    /// Tab-split fields exactly as read (including appended host fields)
    #[inline]
    pub fn raw_fields(&self) -> &[String] {
        &self.raw_fields
    }
}
