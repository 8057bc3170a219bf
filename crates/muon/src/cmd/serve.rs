//! Serve command - Ingest detector lines until interrupted
//!
//! Builds the sinks, opens every configured detector, and runs the
//! supervisor until a stop signal arrives or every source has ended.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use muon_config::{Config, DetectorSourceConfig};
use muon_pipeline::{FanoutDispatcher, IngestionSupervisor};
use muon_sinks::{ElasticsearchSink, FileSink, Sink};
use muon_sources::{DeviceSource, LineSource};

/// Serve command arguments
///
/// Flags override the configuration file.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Detector as `ID=PATH` (repeatable; replaces configured sources).
    /// A bare path uses the default id, `-` reads stdin.
    #[arg(short, long = "source", value_name = "ID=PATH")]
    pub sources: Vec<String>,

    /// Output file for the file sink
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<String>,

    /// Also index events into Elasticsearch
    #[arg(long)]
    pub es: bool,

    /// Disable the file sink
    #[arg(long)]
    pub no_file: bool,
}

impl ServeArgs {
    /// Apply command-line overrides to a loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if !self.sources.is_empty() {
            config.sources = self
                .sources
                .iter()
                .map(|arg| DetectorSourceConfig::from_cli_arg(arg))
                .collect();
        }
        if let Some(output) = &self.output {
            config.sinks.file.path = output.clone();
        }
        if self.es {
            config.sinks.elasticsearch.enabled = true;
        }
        if self.no_file {
            config.sinks.file.enabled = false;
        }
    }
}

/// Run the serve command
pub async fn run(config: Config) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        sources = config.enabled_sources().count(),
        "Muon starting"
    );

    if let Err(e) = run_ingest(config).await {
        error!(error = %e, "ingestion error");
        return Err(e);
    }

    info!("Muon shutdown complete");
    Ok(())
}

/// Main ingest loop
async fn run_ingest(config: Config) -> Result<()> {
    // Create cancellation token for coordinated shutdown
    let cancel = CancellationToken::new();

    let sinks = build_sinks(&config).await?;
    let dispatcher = Arc::new(
        FanoutDispatcher::new(sinks).with_progress_interval(config.global.progress_interval),
    );

    for (sink, available) in dispatcher.sink_status() {
        let status = if available { "available" } else { "disabled" };
        info!(sink = %sink, status, "sink status");
    }

    let mut supervisor = IngestionSupervisor::new(Arc::clone(&dispatcher))
        .with_shutdown_timeout(config.global.shutdown_timeout());

    for source_config in config.enabled_sources() {
        let source = DeviceSource::from_config(source_config)
            .with_context(|| format!("invalid source '{}'", source_config.id))?;
        info!(
            source_id = %source.id(),
            endpoint = %source.endpoint(),
            "source configured"
        );
        supervisor.add_source(Box::new(source));
    }

    let mut ingest = tokio::spawn(supervisor.run(cancel.clone()));

    // Stop on signal, or when every source has ended on its own
    let finished = tokio::select! {
        _ = wait_for_shutdown() => {
            info!("shutdown signal received, stopping sources");
            None
        }
        joined = &mut ingest => Some(joined),
    };

    cancel.cancel();

    let joined = match finished {
        Some(joined) => joined,
        None => ingest.await,
    };

    let summary = joined
        .context("ingestion task panicked")?
        .context("ingestion failed")?;
    summary.log();

    Ok(())
}

/// Build the enabled sinks in dispatch order (file first)
///
/// The file sink is required once enabled. Elasticsearch failures leave
/// that sink disabled for the run.
async fn build_sinks(config: &Config) -> Result<Vec<Arc<dyn Sink>>> {
    let mut sinks: Vec<Arc<dyn Sink>> = Vec::new();

    let file = &config.sinks.file;
    if file.enabled {
        let sink = FileSink::open(file)
            .await
            .with_context(|| format!("failed to open output file {}", file.path))?;
        info!(sink = %sink.name(), path = %sink.path().display(), "file sink opened");
        sinks.push(Arc::new(sink));
    }

    let es = &config.sinks.elasticsearch;
    if es.enabled {
        match ElasticsearchSink::new(es.clone()) {
            Ok(sink) => {
                // Failure is logged by the sink and leaves it disabled
                let _ = sink.initialize().await;
                sinks.push(Arc::new(sink));
            }
            Err(e) => warn!(sink = "elasticsearch", error = %e, "failed to create sink"),
        }
    }

    Ok(sinks)
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
