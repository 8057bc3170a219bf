//! File Sink - append-only CosmicWatch data file
//!
//! Writes each event's raw device fields in the format the detector's own
//! tooling reads back:
//!
//! ```text
//! 5	1700000000.123	1	2048	150.5	0.0001	22.3	101325	0.01:0.02:1.00	0.1:0.2:0.3	DetA	14:03:07.512000	17/10/2026
//!
//! 6	1700000000.456	0	1024	80.2	0.0001	22.3	101325	0.01:0.02:1.00	0.1:0.2:0.3	DetA	14:03:07.931000	17/10/2026
//!
//! ```
//!
//! Empty fields are dropped when joining, so the positional padding added
//! before parsing never reaches the file. A banner with the column legend
//! is written once, when the file is created.
//!
//! # Concurrency
//!
//! All workers share one handle. The append and the conditional flush run
//! under one lock, so records from different detectors never interleave.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use muon_config::FileSinkConfig;
use muon_protocol::{Event, FIELD_SEPARATOR};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

use crate::common::{Sink, SinkError, SinkMetrics, SinkMetricsHandle};

/// Flush when the device sequence number is a multiple of this
pub const FLUSH_EVERY: u64 = 10;

/// Header written to a freshly created data file
pub const BANNER: &str = concat!(
    "###########################################################################################################################################################\n",
    "#                                                          CosmicWatch: The Desktop Muon Detector v3X\n",
    "# Event  Timestamp[s]  Flag  ADC[12b]  SiPM[mV]  Deadtime[s]  Temp[C]  Press[Pa]  Accel(X:Y:Z)[g]  Gyro(X:Y:Z)[deg/sec]  Name  Time  Date\n",
    "###########################################################################################################################################################\n",
);

/// Append-only data file shared by all source workers
pub struct FileSink {
    name: String,
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
    metrics: Arc<SinkMetrics>,
}

impl FileSink {
    /// Open the configured file for appending
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Init` if the file cannot be opened or the banner
    /// cannot be written. The caller treats this as fatal for the run.
    pub async fn open(config: &FileSinkConfig) -> Result<Self, SinkError> {
        Self::open_path(&config.path, config.banner).await
    }

    /// Open `path` for appending, writing the banner if the file is empty
    pub async fn open_path(path: impl AsRef<Path>, banner: bool) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let init_err = |e: std::io::Error| SinkError::init(format!("{}: {e}", path.display()));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(init_err)?;
        let fresh = file.metadata().await.map_err(init_err)?.len() == 0;

        let mut writer = BufWriter::new(file);
        if banner && fresh {
            writer.write_all(BANNER.as_bytes()).await.map_err(init_err)?;
            writer.flush().await.map_err(init_err)?;
        }

        tracing::info!(path = %path.display(), fresh, "data file opened");

        Ok(Self {
            name: "file".into(),
            path,
            writer: Mutex::new(Some(writer)),
            metrics: Arc::new(SinkMetrics::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the handle has not been closed yet
    pub async fn is_open(&self) -> bool {
        self.writer.lock().await.is_some()
    }
}

/// Render one record: non-empty raw fields joined by tabs, then a blank line
pub fn render_record(event: &Event) -> String {
    let mut record = String::with_capacity(160);
    for field in event.raw_fields().iter().filter(|f| !f.is_empty()) {
        if !record.is_empty() {
            record.push(FIELD_SEPARATOR);
        }
        record.push_str(field);
    }
    record.push_str("\n\n");
    record
}

#[async_trait]
impl Sink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, event: &Event) -> Result<(), SinkError> {
        self.metrics.event_received();
        let record = render_record(event);

        let mut guard = self.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            self.metrics.write_error();
            return Err(SinkError::unavailable(format!(
                "{} is closed",
                self.path.display()
            )));
        };

        let result = async {
            writer.write_all(record.as_bytes()).await?;
            if event.sequence_number() % FLUSH_EVERY == 0 {
                writer.flush().await?;
                self.metrics.flush();
            }
            Ok::<_, std::io::Error>(())
        }
        .await;

        match result {
            Ok(()) => {
                self.metrics.event_written(record.len() as u64);
                Ok(())
            }
            Err(e) => {
                self.metrics.write_error();
                Err(SinkError::Io(e))
            }
        }
    }

    async fn close(&self) -> Result<(), SinkError> {
        let Some(mut writer) = self.writer.lock().await.take() else {
            return Ok(());
        };

        // the handle is released even if the final flush fails
        let result = async {
            writer.flush().await?;
            writer.get_ref().sync_all().await
        }
        .await;
        self.metrics.closed();

        match result {
            Ok(()) => {
                self.metrics.flush();
                tracing::info!(path = %self.path.display(), "data file closed");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "final flush failed");
                Err(SinkError::Io(e))
            }
        }
    }

    fn metrics_handle(&self) -> SinkMetricsHandle {
        SinkMetricsHandle::new(&self.name, Arc::clone(&self.metrics))
    }
}

#[cfg(test)]
#[path = "file_test.rs"]
mod file_test;
