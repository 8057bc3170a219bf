//! Sink configuration types
//!
//! Two sinks are supported: the append-only data file and the Elasticsearch
//! index. Either may be disabled, but not both.
//!
//! ```toml
//! [sinks.file]
//! path = "CW_data.txt"
//!
//! [sinks.elasticsearch]
//! enabled = true
//! url = "https://localhost:9200"
//! username = "elastic"
//! password = "changeme"
//! index = "credo-detections"
//! ```

use std::time::Duration;

use serde::Deserialize;

/// Container for the sink sections
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SinksConfig {
    pub file: FileSinkConfig,
    pub elasticsearch: ElasticsearchSinkConfig,
}

impl SinksConfig {
    /// Names of enabled sinks
    pub fn enabled(&self) -> Vec<&'static str> {
        let mut names = Vec::with_capacity(2);
        if self.file.enabled {
            names.push("file");
        }
        if self.elasticsearch.enabled {
            names.push("elasticsearch");
        }
        names
    }
}

/// Append-only data file
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FileSinkConfig {
    /// Whether this sink is enabled
    pub enabled: bool,

    /// Output file; relative paths resolve against the working directory
    pub path: String,

    /// Write the column banner when the file is created
    pub banner: bool,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "CW_data.txt".into(),
            banner: true,
        }
    }
}

/// Elasticsearch index sink
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ElasticsearchSinkConfig {
    /// Whether this sink is enabled
    pub enabled: bool,

    /// Cluster endpoint
    pub url: String,

    /// Basic auth username
    pub username: String,

    /// Basic auth password (required when enabled)
    pub password: Option<String>,

    /// Target index
    pub index: String,

    /// Verify TLS certificates (self-signed clusters need `false`)
    pub verify_certs: bool,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Primary shards requested at index creation
    pub shards: u32,

    /// Replicas requested at index creation
    pub replicas: u32,
}

impl Default for ElasticsearchSinkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "https://localhost:9200".into(),
            username: "elastic".into(),
            password: None,
            index: "credo-detections".into(),
            verify_certs: false,
            timeout_secs: 10,
            shards: 12,
            replicas: 0,
        }
    }
}

impl ElasticsearchSinkConfig {
    /// Request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
