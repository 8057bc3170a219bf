//! Device source - one CosmicWatch detector
//!
//! Reads newline-terminated records from one of three endpoints:
//!
//! - a serial device path such as `/dev/ttyUSB0` (line settings, 115200 8N1,
//!   are configured outside the process, e.g. with `stty`)
//! - a TCP serial bridge (`host:port`)
//! - standard input (`-`)
//!
//! Regular files are read to the end and then report end-of-stream, which
//! makes recorded runs replayable. Character devices and FIFOs are opened
//! non-blocking on Unix so an idle detector never pins a blocking thread.
//! Stdin is drained by a detached thread for the same reason.
//!
//! Lines longer than the configured limit are dropped whole.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use muon_config::{DetectorSourceConfig, STDIN_PATH};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpStream;

use crate::common::{LineSource, SourceMetrics, SourceMetricsHandle};
use crate::error::SourceError;
use crate::thread_reader::ThreadReader;

/// Default maximum line length in bytes, terminator excluded
///
/// A detector record is around 100 bytes; anything near this limit is a
/// stuck or misconfigured link.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4096;

/// Log every Nth oversize line after the first
const OVERSIZE_LOG_EVERY: u64 = 100;

/// Boxed byte stream behind every endpoint
type Stream = Box<dyn AsyncRead + Send + Unpin>;
type Reader = BufReader<Stream>;

/// Where the detector is reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Serial device or recorded file
    Path(PathBuf),

    /// Serial-over-TCP bridge
    Tcp(String),

    /// Standard input
    Stdin,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Tcp(address) => write!(f, "tcp://{address}"),
            Self::Stdin => f.write_str("stdin"),
        }
    }
}

/// Line source for a single detector
pub struct DeviceSource {
    id: String,
    endpoint: Endpoint,
    reader: Option<Reader>,
    buf: Vec<u8>,
    max_line_length: usize,
    metrics: Arc<SourceMetrics>,
}

impl DeviceSource {
    pub fn new(id: impl Into<String>, endpoint: Endpoint) -> Self {
        Self {
            id: id.into(),
            endpoint,
            reader: None,
            buf: Vec::with_capacity(256),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            metrics: Arc::new(SourceMetrics::new()),
        }
    }

    /// Set the longest line accepted, terminator excluded
    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    /// Build from a `[[sources]]` entry
    pub fn from_config(config: &DetectorSourceConfig) -> Result<Self, SourceError> {
        let endpoint = match (&config.path, &config.address) {
            (Some(path), _) if path == STDIN_PATH => Endpoint::Stdin,
            (Some(path), _) => Endpoint::Path(PathBuf::from(path)),
            (None, Some(address)) => Endpoint::Tcp(address.clone()),
            (None, None) => {
                return Err(SourceError::NoEndpoint {
                    id: config.id.clone(),
                });
            }
        };
        Ok(Self::new(&config.id, endpoint))
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }
}

/// Open the byte stream for an endpoint
async fn connect(endpoint: &Endpoint) -> io::Result<Stream> {
    match endpoint {
        Endpoint::Path(path) => open_path(path).await,
        Endpoint::Tcp(address) => {
            let stream = TcpStream::connect(address).await?;
            stream.set_nodelay(true)?;
            Ok(Box::new(stream))
        }
        Endpoint::Stdin => Ok(Box::new(ThreadReader::spawn("muon-stdin", io::stdin())?)),
    }
}

async fn open_path(path: &Path) -> io::Result<Stream> {
    let metadata = tokio::fs::metadata(path).await?;
    if metadata.is_file() {
        return Ok(Box::new(tokio::fs::File::open(path).await?));
    }
    open_device(path).await
}

/// tty and fifo: readiness-driven, no blocking thread
#[cfg(unix)]
async fn open_device(path: &Path) -> io::Result<Stream> {
    let receiver = tokio::net::unix::pipe::OpenOptions::new()
        .unchecked(true)
        .open_receiver(path)?;
    Ok(Box::new(receiver))
}

#[cfg(not(unix))]
async fn open_device(path: &Path) -> io::Result<Stream> {
    Ok(Box::new(tokio::fs::File::open(path).await?))
}

/// Result of reading one bounded line
#[derive(Debug, PartialEq, Eq)]
enum ReadLine {
    /// A line of this many bytes, terminator included
    Line(usize),
    /// A line over the limit was consumed and discarded
    TooLong(usize),
    Eof,
}

/// Read up to the next newline, keeping at most `max` bytes before it
///
/// An oversize line is consumed through its newline (or end of stream) so
/// the next read starts on a fresh line.
async fn read_bounded_line<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max: usize,
) -> io::Result<ReadLine>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut total = 0usize;
    let mut exceeded = false;

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            if total == 0 {
                return Ok(ReadLine::Eof);
            }
            break;
        }

        let (chunk, done) = match find_newline(available) {
            Some(i) => (&available[..=i], true),
            None => (available, false),
        };
        let used = chunk.len();

        if !exceeded {
            // the terminator does not count toward the limit
            let content = chunk.strip_suffix(b"\n").unwrap_or(chunk);
            if buf.len() + content.len() > max {
                exceeded = true;
                buf.clear();
            } else {
                buf.extend_from_slice(chunk);
            }
        }

        reader.consume(used);
        total += used;

        if done {
            break;
        }
    }

    if exceeded {
        Ok(ReadLine::TooLong(total))
    } else {
        Ok(ReadLine::Line(total))
    }
}

fn find_newline(bytes: &[u8]) -> Option<usize> {
    bytes.iter().position(|&b| b == b'\n')
}

#[async_trait]
impl LineSource for DeviceSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn open(&mut self) -> Result<(), SourceError> {
        let connected = connect(&self.endpoint).await;
        let stream = connected.map_err(|e| {
            self.metrics.error();
            SourceError::open(&self.id, self.endpoint.to_string(), e)
        })?;

        self.reader = Some(BufReader::new(stream));
        self.metrics.opened();
        tracing::info!(source_id = %self.id, endpoint = %self.endpoint, "detector opened");
        Ok(())
    }

    async fn next_line(&mut self) -> Result<Option<String>, SourceError> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| SourceError::not_open(&self.id))?;

        loop {
            self.buf.clear();
            let read = read_bounded_line(reader, &mut self.buf, self.max_line_length)
                .await
                .map_err(|e| {
                    self.metrics.error();
                    SourceError::Io(e)
                })?;

            let n = match read {
                ReadLine::Eof => return Ok(None),
                ReadLine::Line(n) => n,
                ReadLine::TooLong(n) => {
                    self.metrics.bytes(n as u64);
                    let dropped = self.metrics.oversize();
                    if dropped == 1 || dropped % OVERSIZE_LOG_EVERY == 0 {
                        tracing::warn!(
                            source_id = %self.id,
                            bytes = n,
                            max = self.max_line_length,
                            dropped,
                            "line too long, dropped"
                        );
                    }
                    continue;
                }
            };
            self.metrics.bytes(n as u64);

            // serial noise at power-up is not always valid UTF-8
            let text = String::from_utf8_lossy(&self.buf);
            let line = text.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                continue;
            }

            self.metrics.line();
            return Ok(Some(line.to_string()));
        }
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        if self.reader.take().is_some() {
            self.metrics.closed();
            tracing::debug!(source_id = %self.id, "detector closed");
        }
        Ok(())
    }

    fn metrics_handle(&self) -> SourceMetricsHandle {
        SourceMetricsHandle::new(&self.id, Arc::clone(&self.metrics))
    }
}

#[cfg(test)]
#[path = "device_test.rs"]
mod device_test;
