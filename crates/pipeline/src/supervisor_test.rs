//! Supervisor tests

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use muon_sinks::{FileSink, Sink};
use muon_sources::{
    ChannelSource, LineSource, SourceError, SourceMetrics, SourceMetricsHandle,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::{FanoutDispatcher, IngestionSupervisor, PipelineError, SourceState};

/// Source whose open always fails
struct UnpluggedSource {
    id: String,
    metrics: Arc<SourceMetrics>,
}

impl UnpluggedSource {
    fn boxed(id: &str) -> Box<dyn LineSource> {
        Box::new(Self {
            id: id.to_string(),
            metrics: Arc::new(SourceMetrics::new()),
        })
    }
}

#[async_trait]
impl LineSource for UnpluggedSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn open(&mut self) -> Result<(), SourceError> {
        self.metrics.error();
        Err(SourceError::open(
            &self.id,
            "/dev/ttyUSB9",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such device"),
        ))
    }

    async fn next_line(&mut self) -> Result<Option<String>, SourceError> {
        Err(SourceError::not_open(&self.id))
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        Ok(())
    }

    fn metrics_handle(&self) -> SourceMetricsHandle {
        SourceMetricsHandle::new(&self.id, Arc::clone(&self.metrics))
    }
}

fn line(seq: usize, name: &str) -> String {
    format!("{seq}\t{seq}.5\t0\t512\t23.1\t0.0021\t24.5\t101325\t0.01:0.02:0.98\t0.1:0.2:0.3\t{name}")
}

async fn file_sink(dir: &TempDir) -> Arc<FileSink> {
    Arc::new(
        FileSink::open_path(dir.path().join("events.txt"), false)
            .await
            .unwrap(),
    )
}

/// Poll until `done` holds, failing after five seconds
async fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !done() {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn records(contents: &str) -> Vec<&str> {
    contents
        .split("\n\n")
        .filter(|r| !r.is_empty())
        .collect()
}

#[tokio::test]
async fn test_no_sources() {
    let dispatcher = Arc::new(FanoutDispatcher::new(Vec::new()));
    let supervisor = IngestionSupervisor::new(dispatcher);

    let result = supervisor.run(CancellationToken::new()).await;
    assert!(matches!(result, Err(PipelineError::NoSources)));
}

#[tokio::test]
async fn test_sources_end_at_eof() {
    let dir = TempDir::new().unwrap();
    let sink = file_sink(&dir).await;
    let dispatcher = Arc::new(FanoutDispatcher::new(vec![sink.clone()]));
    let mut supervisor = IngestionSupervisor::new(dispatcher);

    const SOURCES: usize = 3;
    const LINES: usize = 40;

    let mut senders = Vec::new();
    for n in 0..SOURCES {
        let (source, tx) = ChannelSource::new(format!("det-{n}"));
        supervisor.add_source(Box::new(source));
        senders.push(tx);
    }
    assert_eq!(supervisor.source_count(), SOURCES);
    let handle = supervisor.handle();

    let feeders: Vec<_> = senders
        .into_iter()
        .enumerate()
        .map(|(n, tx)| {
            tokio::spawn(async move {
                for seq in 1..=LINES {
                    tx.send(line(seq, &format!("det-{n}"))).await.unwrap();
                }
            })
        })
        .collect();

    let summary = supervisor.run(CancellationToken::new()).await.unwrap();
    for feeder in feeders {
        feeder.await.unwrap();
    }

    assert_eq!(summary.lines_read(), (SOURCES * LINES) as u64);
    assert_eq!(summary.parse_errors(), 0);
    assert_eq!(summary.dispatch.events_seen, (SOURCES * LINES) as u64);
    assert!(summary.sources.iter().all(|s| s.state == SourceState::Closed));
    assert!(handle.states().iter().all(|(_, s)| *s == SourceState::Closed));

    // sinks closed exactly once, after every worker finished
    assert_eq!(sink.metrics_handle().snapshot().close_count, 1);
    assert!(!sink.is_open().await);

    let contents = std::fs::read_to_string(dir.path().join("events.txt")).unwrap();
    let records = records(&contents);
    assert_eq!(records.len(), SOURCES * LINES);
    for record in &records {
        // 11 device columns plus host time and date, never interleaved
        assert_eq!(record.split('\t').count(), 13, "{record:?}");
    }

    for n in 0..SOURCES {
        let name = format!("det-{n}");
        let seqs: Vec<usize> = records
            .iter()
            .filter(|r| r.split('\t').nth(10) == Some(name.as_str()))
            .map(|r| r.split('\t').next().unwrap().parse().unwrap())
            .collect();
        assert_eq!(seqs, (1..=LINES).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn test_cancel_releases_sources_and_closes_sinks() {
    let dir = TempDir::new().unwrap();
    let sink = file_sink(&dir).await;
    let dispatcher = Arc::new(FanoutDispatcher::new(vec![sink.clone()]));
    let mut supervisor = IngestionSupervisor::new(dispatcher)
        .with_shutdown_timeout(Duration::from_millis(500));

    let (a, tx_a) = ChannelSource::new("det-a");
    let (b, tx_b) = ChannelSource::new("det-b");
    let a_metrics = a.metrics_handle();
    let b_metrics = b.metrics_handle();
    supervisor.add_source(Box::new(a));
    supervisor.add_source(Box::new(b));
    let handle = supervisor.handle();

    let cancel = CancellationToken::new();
    let run = tokio::spawn(supervisor.run(cancel.clone()));

    for seq in 1..=5 {
        tx_a.send(line(seq, "det-a")).await.unwrap();
    }

    let sink_metrics = sink.metrics_handle();
    wait_until("delivery", || sink_metrics.snapshot().events_written == 5).await;
    wait_until("both sources reading", || {
        handle.states().iter().all(|(_, s)| *s == SourceState::Reading)
    })
    .await;

    // senders stay alive: only cancellation can end the workers
    cancel.cancel();
    let summary = run.await.unwrap().unwrap();

    assert_eq!(handle.state("det-a"), Some(SourceState::Closed));
    assert_eq!(handle.state("det-b"), Some(SourceState::Closed));
    assert_eq!(summary.sources[0].lines_read, 5);
    assert_eq!(summary.sources[1].lines_read, 0);

    assert_eq!(a_metrics.snapshot().closes, 1);
    assert_eq!(b_metrics.snapshot().closes, 1);
    assert_eq!(sink.metrics_handle().snapshot().close_count, 1);

    let contents = std::fs::read_to_string(dir.path().join("events.txt")).unwrap();
    assert_eq!(records(&contents).len(), 5);

    drop(tx_a);
    drop(tx_b);
}

#[tokio::test]
async fn test_bad_lines_counted_and_dropped() {
    let dir = TempDir::new().unwrap();
    let sink = file_sink(&dir).await;
    let dispatcher = Arc::new(FanoutDispatcher::new(vec![sink.clone()]));
    let mut supervisor = IngestionSupervisor::new(dispatcher);

    let (source, tx) = ChannelSource::new("det-a");
    supervisor.add_source(Box::new(source));

    tx.send("##########".into()).await.unwrap();
    tx.send(line(1, "det-a")).await.unwrap();
    tx.send("2\t3.0\t0\tNaNa\t1.0\t0.1".into()).await.unwrap();
    tx.send("3\t4.0".into()).await.unwrap();
    tx.send(line(4, "det-a")).await.unwrap();
    drop(tx);

    let summary = supervisor.run(CancellationToken::new()).await.unwrap();
    let source = &summary.sources[0];
    assert_eq!(source.lines_read, 5);
    assert_eq!(source.events_parsed, 2);
    assert_eq!(source.parse_errors, 3);
    assert_eq!(source.state, SourceState::Closed);
    assert!(source.error.is_none());

    assert_eq!(sink.metrics_handle().snapshot().events_written, 2);
}

#[tokio::test]
async fn test_failed_open_isolated() {
    let dir = TempDir::new().unwrap();
    let sink = file_sink(&dir).await;
    let dispatcher = Arc::new(FanoutDispatcher::new(vec![sink.clone()]));
    let mut supervisor = IngestionSupervisor::new(dispatcher);

    let (source, tx) = ChannelSource::new("det-a");
    supervisor.add_source(UnpluggedSource::boxed("det-missing"));
    supervisor.add_source(Box::new(source));
    let handle = supervisor.handle();

    tx.send(line(1, "det-a")).await.unwrap();
    drop(tx);

    let summary = supervisor.run(CancellationToken::new()).await.unwrap();

    let missing = &summary.sources[0];
    assert_eq!(missing.state, SourceState::Failed);
    assert!(missing.error.as_deref().unwrap().contains("/dev/ttyUSB9"));
    assert_eq!(handle.state("det-missing"), Some(SourceState::Failed));

    assert_eq!(summary.sources[1].state, SourceState::Closed);
    assert_eq!(summary.sources[1].events_parsed, 1);
    assert_eq!(sink.metrics_handle().snapshot().events_written, 1);
}

#[tokio::test]
async fn test_all_sources_failed() {
    let dir = TempDir::new().unwrap();
    let sink = file_sink(&dir).await;
    let dispatcher = Arc::new(FanoutDispatcher::new(vec![sink.clone()]));
    let mut supervisor = IngestionSupervisor::new(dispatcher);

    supervisor.add_source(UnpluggedSource::boxed("det-a"));
    supervisor.add_source(UnpluggedSource::boxed("det-b"));

    let result = supervisor.run(CancellationToken::new()).await;
    assert!(matches!(
        result,
        Err(PipelineError::NoSourcesOpened { attempted: 2 })
    ));

    // sinks are released even when nothing was read
    assert_eq!(sink.metrics_handle().snapshot().close_count, 1);
}

#[test]
fn test_state_display() {
    assert_eq!(SourceState::Reading.to_string(), "reading");
    assert!(SourceState::Failed.is_terminal());
    assert!(SourceState::Closed.is_terminal());
    assert!(!SourceState::Closing.is_terminal());
}
