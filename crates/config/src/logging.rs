//! Logging configuration
//!
//! Controls where and how the ingester reports its own activity.

use serde::Deserialize;

/// Log level
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    /// Every raw device line is echoed at this level
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Convert to a tracing filter directive
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable console output (default)
    #[default]
    Console,
    /// One JSON object per line
    Json,
}

/// Log output destination
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Append to a file
    #[serde(untagged)]
    File(String),
}

/// Logging configuration
///
/// ```toml
/// [log]
/// level = "info"
/// format = "console"
/// output = "stderr"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
}

impl LogConfig {
    /// Filter directive, with a command-line level taking precedence
    pub fn filter_directive(&self, cli_level: Option<&str>) -> String {
        match cli_level {
            Some(level) if !level.trim().is_empty() => level.trim().to_string(),
            _ => self.level.as_str().to_string(),
        }
    }
}

impl LogOutput {
    /// Whether output goes to a terminal stream (colors allowed)
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stdout | Self::Stderr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Console);
        assert_eq!(config.output, LogOutput::Stdout);
    }

    #[test]
    fn test_deserialize_file_output() {
        let config: LogConfig = toml::from_str(
            r#"
level = "debug"
format = "json"
output = "/var/log/muon.log"
"#,
        )
        .unwrap();
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.output, LogOutput::File("/var/log/muon.log".into()));
    }

    #[test]
    fn test_deserialize_stderr() {
        let config: LogConfig = toml::from_str("output = \"stderr\"").unwrap();
        assert_eq!(config.output, LogOutput::Stderr);
    }

    #[test]
    fn test_filter_directive() {
        let config = LogConfig {
            level: LogLevel::Warn,
            ..Default::default()
        };
        assert_eq!(config.filter_directive(None), "warn");
        assert_eq!(config.filter_directive(Some("")), "warn");
        assert_eq!(
            config.filter_directive(Some("muon_pipeline=debug")),
            "muon_pipeline=debug"
        );
    }

    #[test]
    fn test_file_output_is_not_stream() {
        assert!(LogOutput::Stdout.is_stream());
        assert!(LogOutput::Stderr.is_stream());
        assert!(!LogOutput::File("muon.log".into()).is_stream());
    }

    #[test]
    fn test_level_as_str() {
        for (level, s) in [
            (LogLevel::Trace, "trace"),
            (LogLevel::Debug, "debug"),
            (LogLevel::Info, "info"),
            (LogLevel::Warn, "warn"),
            (LogLevel::Error, "error"),
        ] {
            assert_eq!(level.as_str(), s);
        }
    }
}
