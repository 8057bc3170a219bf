//! Source configuration types
//!
//! One entry per physical detector. Each entry names the device id stamped
//! on its events and exactly one way to reach the device.
//!
//! ```toml
//! [[sources]]
//! id = "cosmicwatch-001"
//! path = "/dev/ttyUSB0"
//!
//! [[sources]]
//! id = "cosmicwatch-002"
//! address = "10.0.0.5:4001"   # serial-over-TCP bridge
//! ```

use serde::Deserialize;

/// Default device id (matches the detector firmware's factory label)
pub const DEFAULT_DEVICE_ID: &str = "cosmicwatch-001";

/// Path value that selects standard input
pub const STDIN_PATH: &str = "-";

/// Configuration for a single detector source
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DetectorSourceConfig {
    /// Device id written to every event from this source
    pub id: String,

    /// Whether this source is started
    pub enabled: bool,

    /// Serial device path, or "-" for stdin
    pub path: Option<String>,

    /// TCP address of a serial bridge (host:port)
    pub address: Option<String>,
}

impl Default for DetectorSourceConfig {
    fn default() -> Self {
        Self {
            id: DEFAULT_DEVICE_ID.into(),
            enabled: true,
            path: None,
            address: None,
        }
    }
}

impl DetectorSourceConfig {
    /// Source reading from a device path
    pub fn with_path(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Source reading from a TCP bridge
    pub fn with_address(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: Some(address.into()),
            ..Default::default()
        }
    }

    /// Parse an `ID=PATH` command-line argument; a bare path gets the default id
    pub fn from_cli_arg(arg: &str) -> Self {
        match arg.split_once('=') {
            Some((id, path)) => Self::with_path(id.trim(), path.trim()),
            None => Self::with_path(DEFAULT_DEVICE_ID, arg.trim()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DetectorSourceConfig::default();
        assert_eq!(config.id, "cosmicwatch-001");
        assert!(config.enabled);
        assert!(config.path.is_none());
        assert!(config.address.is_none());
    }

    #[test]
    fn test_deserialize_path() {
        let config: DetectorSourceConfig =
            toml::from_str("id = \"det-a\"\npath = \"/dev/ttyACM0\"").unwrap();
        assert_eq!(config, DetectorSourceConfig::with_path("det-a", "/dev/ttyACM0"));
    }

    #[test]
    fn test_cli_arg() {
        assert_eq!(
            DetectorSourceConfig::from_cli_arg("det-b=/dev/ttyUSB1"),
            DetectorSourceConfig::with_path("det-b", "/dev/ttyUSB1")
        );
        assert_eq!(
            DetectorSourceConfig::from_cli_arg("/dev/ttyUSB0"),
            DetectorSourceConfig::with_path(DEFAULT_DEVICE_ID, "/dev/ttyUSB0")
        );
    }
}
