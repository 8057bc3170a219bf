//! Muon - CosmicWatch detector ingester
//!
//! # Usage
//!
//! ```bash
//! # Ingest from the configured detectors (default)
//! muon
//! muon --config configs/muon.toml
//!
//! # Ad-hoc run against two detectors, file output only
//! muon serve --source det-a=/dev/ttyUSB0 --source det-b=/dev/ttyUSB1 --output run.txt
//!
//! # Replay a recorded session from stdin
//! muon serve --source replay=- < CW_data.raw
//!
//! # Validate a configuration without opening anything
//! muon check --config configs/muon.toml
//! ```

mod cmd;

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use muon_config::{LogConfig, LogFormat, LogOutput};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Muon - CosmicWatch detector ingester
#[derive(Parser, Debug)]
#[command(name = "muon")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest detector lines until interrupted
    Serve(cmd::serve::ServeArgs),

    /// Validate configuration and print the resolved sources and sinks
    Check(cmd::serve::ServeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Serve(args)) => {
            let config = cmd::load_config(cli.config.as_deref(), &args)?;
            let level = config.log.filter_directive(cli.log_level.as_deref());
            init_logging(&config.log, &level)?;
            cmd::serve::run(config).await
        }
        Some(Command::Check(args)) => {
            // Check doesn't need logging - just outputs to stdout
            let config = cmd::load_config(cli.config.as_deref(), &args)?;
            cmd::check::run(&config);
            Ok(())
        }
        // No subcommand = ingest with the configured sources
        None => {
            let args = cmd::serve::ServeArgs::default();
            let config = cmd::load_config(cli.config.as_deref(), &args)?;
            let level = config.log.filter_directive(cli.log_level.as_deref());
            init_logging(&config.log, &level)?;
            cmd::serve::run(config).await
        }
    }
}

/// Initialize the tracing subscriber for logging
fn init_logging(log: &LogConfig, level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let writer = match &log.output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogOutput::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {path}"))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
    };

    let layer = match log.format {
        LogFormat::Console => fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(log.output.is_stream())
            .with_writer(writer)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    Ok(())
}
