//! Muon Configuration
//!
//! TOML-based configuration loading with sensible defaults. The ingestion
//! core never prompts; everything it needs arrives through `Config`.
//!
//! # Parsing
//!
//! ```
//! use muon_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[[sources]]\npath = \"/dev/ttyUSB0\"").unwrap();
//! assert_eq!(config.sources[0].id, "cosmicwatch-001");
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [global]
//! progress_interval = 10
//!
//! [[sources]]
//! id = "cosmicwatch-001"
//! path = "/dev/ttyUSB0"
//!
//! [sinks.file]
//! path = "CW_data.txt"
//!
//! [sinks.elasticsearch]
//! enabled = true
//! url = "https://localhost:9200"
//! # password from ES_PASS
//! ```

mod env;
mod error;
mod global;
mod logging;
mod sinks;
mod sources;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use env::{ES_ENABLED, ES_HOST, ES_INDEX, ES_PASS, ES_USER, apply_env_with};
pub use error::{ConfigError, Result};
pub use global::{DEFAULT_PROGRESS_INTERVAL, DEFAULT_SHUTDOWN_TIMEOUT_SECS, GlobalConfig};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use sinks::{ElasticsearchSinkConfig, FileSinkConfig, SinksConfig};
pub use sources::{DEFAULT_DEVICE_ID, DetectorSourceConfig, STDIN_PATH};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults, except that at least
/// one source must be configured before validation passes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Pipeline-wide settings
    pub global: GlobalConfig,

    /// Detector sources
    pub sources: Vec<DetectorSourceConfig>,

    /// Output sinks
    pub sinks: SinksConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Environment overrides are applied before validation.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, contains invalid TOML, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load(Some(path.as_ref()), |_| {})
    }

    /// Load configuration from an optional file, then customize and validate
    ///
    /// Order: file (or defaults) → environment → `customize` → validation.
    /// The binary uses `customize` to apply command-line flags.
    pub fn load<F>(path: Option<&Path>, customize: F) -> Result<Self>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = match path {
            Some(path) => {
                let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
                    path: path.display().to_string(),
                    source: e,
                })?;
                Self::parse_unvalidated(&contents)?
            }
            None => Self::default(),
        };

        env::apply_process_env(&mut config);
        customize(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn parse_unvalidated(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(ConfigError::ParseError)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Enabled sources in configuration order
    pub fn enabled_sources(&self) -> impl Iterator<Item = &DetectorSourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let config = Self::parse_unvalidated(s)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_full_config() {
        let config = Config::from_str(
            r#"
[log]
level = "debug"

[global]
progress_interval = 25

[[sources]]
id = "det-a"
path = "/dev/ttyUSB0"

[[sources]]
id = "det-b"
address = "127.0.0.1:4001"

[[sources]]
id = "det-c"
path = "/dev/ttyUSB2"
enabled = false

[sinks.file]
path = "/data/CW_data.txt"
banner = false

[sinks.elasticsearch]
enabled = true
password = "pw"
"#,
        )
        .unwrap();

        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.global.progress_interval, 25);
        assert_eq!(config.sources.len(), 3);
        let enabled: Vec<_> = config.enabled_sources().map(|s| s.id.as_str()).collect();
        assert_eq!(enabled, vec!["det-a", "det-b"]);
        assert_eq!(config.sinks.file.path, "/data/CW_data.txt");
        assert!(!config.sinks.file.banner);
        assert!(config.sinks.elasticsearch.enabled);
    }

    #[test]
    fn test_shipped_config() {
        let config = Config::from_str(include_str!("../../../configs/muon.toml")).unwrap();

        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].path.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.sinks.file.path, "CW_data.txt");
        assert!(!config.sinks.elasticsearch.enabled);
        assert_eq!(config.sinks.elasticsearch.index, "credo-detections");
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_str("[[sources]\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[sources]]\nid = \"det-a\"\npath = \"/dev/ttyUSB0\"").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.sources[0].id, "det-a");
    }

    #[test]
    fn test_from_missing_file() {
        let err = Config::from_file("/nonexistent/muon.toml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError { .. }));
    }

    #[test]
    fn test_load_without_file_uses_customize() {
        let config = Config::load(None, |c| {
            c.sources
                .push(DetectorSourceConfig::from_cli_arg("det-x=/dev/ttyUSB3"));
        })
        .unwrap();

        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].id, "det-x");
        assert!(config.sinks.file.enabled);
    }
}
