//! Elasticsearch Sink - indexed document store
//!
//! Indexes each event as a sparse JSON document through the Elasticsearch
//! REST API. Absent optional values are omitted, never sent as `null`.
//!
//! # Startup
//!
//! [`ElasticsearchSink::initialize`] runs once before ingestion starts:
//!
//! 1. `GET /` to check the cluster answers with the given credentials
//! 2. `PUT /{index}` with shard settings and the fixed field mapping;
//!    `400` means the index already exists and is accepted
//!
//! Any failure leaves the sink disabled for the run. Disabled sinks report
//! `is_available() == false` and the dispatcher skips them.
//!
//! # Delivery
//!
//! One `POST /{index}/_doc` per event. Failures are classified and returned
//! to the caller; nothing is retried inline.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use muon_config::ElasticsearchSinkConfig;
use muon_protocol::Event;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{Value, json};

use crate::common::{Sink, SinkError, SinkMetrics, SinkMetricsHandle};

/// Value of the `source` field on every document
pub const SOURCE_TAG: &str = "cosmicwatch-v3x";

/// Sparse document indexed for one event
#[derive(Debug, Serialize)]
pub struct Document<'a> {
    event: u64,
    pico_timestamp_s: f64,
    coincidence_flag: i64,
    coincident: bool,
    adc_value: u32,
    sipm_mv: f64,
    deadtime_s: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature_c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pressure_pa: Option<f64>,
    device_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detector_name: Option<&'a str>,
    timestamp_ms: i64,
    timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    comp_time: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comp_date: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    accel_x_g: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    accel_y_g: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    accel_z_g: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gyro_x_degs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gyro_y_degs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gyro_z_degs: Option<f64>,
    source: &'static str,
}

impl<'a> Document<'a> {
    pub fn from_event(event: &'a Event) -> Self {
        let accel = event.accelerometer();
        let gyro = event.gyroscope();

        Self {
            event: event.sequence_number(),
            pico_timestamp_s: event.device_timestamp_s(),
            coincidence_flag: event.coincidence_flag(),
            coincident: event.is_coincident(),
            adc_value: event.adc_value(),
            sipm_mv: event.sipm_mv(),
            deadtime_s: event.deadtime_s(),
            temperature_c: event.temperature_c(),
            pressure_pa: event.pressure_pa(),
            device_id: event.source_device_id(),
            detector_name: event.detector_name(),
            timestamp_ms: event.ingest_timestamp_ms(),
            timestamp: event.ingest_timestamp_ms(),
            comp_time: event.host_time(),
            comp_date: event.host_date(),
            accel_x_g: accel.map(|v| v.x),
            accel_y_g: accel.map(|v| v.y),
            accel_z_g: accel.map(|v| v.z),
            gyro_x_degs: gyro.map(|v| v.x),
            gyro_y_degs: gyro.map(|v| v.y),
            gyro_z_degs: gyro.map(|v| v.z),
            source: SOURCE_TAG,
        }
    }
}

/// Fixed field mapping applied at index creation
pub fn mapping() -> Value {
    json!({
        "properties": {
            "event": {"type": "long"},
            "pico_timestamp_s": {"type": "float"},
            "coincidence_flag": {"type": "integer"},
            "coincident": {"type": "boolean"},
            "adc_value": {"type": "integer"},
            "sipm_mv": {"type": "float"},
            "deadtime_s": {"type": "float"},
            "temperature_c": {"type": "float"},
            "pressure_pa": {"type": "float"},
            "device_id": {"type": "keyword"},
            "detector_name": {"type": "keyword"},
            "timestamp_ms": {"type": "long"},
            "timestamp": {"type": "date"},
            "comp_time": {"type": "keyword"},
            "comp_date": {"type": "keyword"},
            "accel_x_g": {"type": "float"},
            "accel_y_g": {"type": "float"},
            "accel_z_g": {"type": "float"},
            "gyro_x_degs": {"type": "float"},
            "gyro_y_degs": {"type": "float"},
            "gyro_z_degs": {"type": "float"},
            "source": {"type": "keyword"},
        }
    })
}

/// Index creation body: settings plus mapping
pub fn index_body(config: &ElasticsearchSinkConfig) -> Value {
    json!({
        "settings": {
            "index": {
                "number_of_shards": config.shards,
                "number_of_replicas": config.replicas,
            }
        },
        "mappings": mapping(),
    })
}

/// Indexed-store sink backed by Elasticsearch
pub struct ElasticsearchSink {
    name: String,
    config: ElasticsearchSinkConfig,
    base_url: String,
    client: reqwest::Client,
    available: AtomicBool,
    metrics: Arc<SinkMetrics>,
}

impl ElasticsearchSink {
    /// Build the sink and its HTTP client; no requests are made yet
    pub fn new(config: ElasticsearchSinkConfig) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(!config.verify_certs)
            .build()
            .map_err(|e| SinkError::init(format!("http client: {e}")))?;

        Ok(Self {
            name: "elasticsearch".into(),
            base_url: config.url.trim_end_matches('/').to_string(),
            config,
            client,
            available: AtomicBool::new(false),
            metrics: Arc::new(SinkMetrics::new()),
        })
    }

    pub fn index(&self) -> &str {
        &self.config.index
    }

    /// Check the cluster is reachable and ensure the index exists
    ///
    /// On success the sink becomes available. On failure it stays disabled
    /// for the run and the error is returned for reporting.
    pub async fn initialize(&self) -> Result<(), SinkError> {
        let result = self.ping_and_create().await;
        self.available.store(result.is_ok(), Ordering::Release);

        match &result {
            Ok(()) => tracing::info!(
                sink = %self.name,
                url = %self.base_url,
                index = %self.config.index,
                "index ready"
            ),
            Err(e) => tracing::warn!(
                sink = %self.name,
                url = %self.base_url,
                error = %e,
                "startup checks failed, sink disabled for this run"
            ),
        }
        result
    }

    async fn ping_and_create(&self) -> Result<(), SinkError> {
        let response = self
            .request(self.client.get(format!("{}/", self.base_url)))
            .send()
            .await
            .map_err(|e| SinkError::init(format!("connect {}: {e}", self.base_url)))?;
        if !response.status().is_success() {
            return Err(SinkError::init(format!(
                "ping {}: HTTP {}",
                self.base_url,
                response.status()
            )));
        }

        let url = format!("{}/{}", self.base_url, self.config.index);
        let response = self
            .request(self.client.put(&url))
            .json(&index_body(&self.config))
            .send()
            .await
            .map_err(|e| SinkError::init(format!("create index {}: {e}", self.config.index)))?;

        let status = response.status();
        if status.is_success() || status == StatusCode::BAD_REQUEST {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(SinkError::init(format!(
            "create index {}: HTTP {status}: {body}",
            self.config.index
        )))
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.basic_auth(&self.config.username, self.config.password.as_ref())
    }
}

/// Map a transport error onto the delivery taxonomy
fn classify(e: reqwest::Error) -> SinkError {
    if e.is_timeout() {
        SinkError::timeout(e.to_string())
    } else {
        SinkError::unavailable(e.to_string())
    }
}

#[async_trait]
impl Sink for ElasticsearchSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    async fn deliver(&self, event: &Event) -> Result<(), SinkError> {
        self.metrics.event_received();
        if !self.is_available() {
            return Err(SinkError::unavailable("sink disabled"));
        }

        let body = serde_json::to_vec(&Document::from_event(event))
            .map_err(|e| SinkError::Serialization(e.to_string()))?;
        let bytes = body.len() as u64;

        let url = format!("{}/{}/_doc", self.base_url, self.config.index);
        let result = self
            .request(self.client.post(&url))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.metrics.write_error();
                return Err(classify(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            self.metrics.event_written(bytes);
            return Ok(());
        }

        self.metrics.write_error();
        let body = response.text().await.unwrap_or_default();
        Err(SinkError::rejected(format!("HTTP {status}: {body}")))
    }

    async fn close(&self) -> Result<(), SinkError> {
        if self.available.swap(false, Ordering::AcqRel) {
            self.metrics.closed();
        }
        Ok(())
    }

    fn metrics_handle(&self) -> SinkMetricsHandle {
        SinkMetricsHandle::new(&self.name, Arc::clone(&self.metrics))
    }
}
