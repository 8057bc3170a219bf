use std::sync::Arc;

use muon_protocol::{Event, HostStamp, RecordParser, stamp_line};
use tempfile::TempDir;

use super::*;

fn event(line: &str) -> Event {
    RecordParser::parse_at(line, "det-a", 1_700_000_000_000).unwrap()
}

fn numbered(seq: u64) -> Event {
    event(&format!("{seq}\t1.5\t0\t512\t30.0\t0.003"))
}

// =============================================================================
// Rendering
// =============================================================================

#[test]
fn test_render_full_record() {
    let line = "5\t1700000000.123\t1\t2048\t150.5\t0.0001\t22.3\t101325\t0.01:0.02:1.00\t0.1:0.2:0.3\tDetA";
    assert_eq!(render_record(&event(line)), format!("{line}\n\n"));
}

#[test]
fn test_render_drops_empty_fields() {
    let stamp = HostStamp {
        time: "14:03:07.512000".into(),
        date: "17/10/2026".into(),
    };
    let stamped = stamp_line("7\t2.0\t0\t100\t10.0\t0.001", &stamp);

    assert_eq!(
        render_record(&event(&stamped)),
        "7\t2.0\t0\t100\t10.0\t0.001\t14:03:07.512000\t17/10/2026\n\n"
    );
}

// =============================================================================
// Opening
// =============================================================================

#[tokio::test]
async fn test_banner_written_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("CW_data.txt");

    let sink = FileSink::open_path(&path, true).await.unwrap();
    sink.close().await.unwrap();

    // reopening a non-empty file appends without a second banner
    let sink = FileSink::open_path(&path, true).await.unwrap();
    sink.deliver(&numbered(1)).await.unwrap();
    sink.close().await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with(BANNER));
    assert_eq!(contents.matches("CosmicWatch").count(), 1);
    assert!(contents.ends_with("1\t1.5\t0\t512\t30.0\t0.003\n\n"));
}

#[tokio::test]
async fn test_banner_disabled() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("CW_data.txt");

    let sink = FileSink::open_path(&path, false).await.unwrap();
    sink.deliver(&numbered(1)).await.unwrap();
    sink.close().await.unwrap();

    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "1\t1.5\t0\t512\t30.0\t0.003\n\n"
    );
}

#[tokio::test]
async fn test_open_from_config() {
    let dir = TempDir::new().unwrap();
    let config = FileSinkConfig {
        path: dir.path().join("run.txt").display().to_string(),
        ..Default::default()
    };

    let sink = FileSink::open(&config).await.unwrap();
    assert_eq!(sink.name(), "file");
    assert!(sink.is_open().await);
    assert_eq!(sink.path(), dir.path().join("run.txt"));
}

#[tokio::test]
async fn test_open_unwritable_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing").join("CW_data.txt");

    let result = FileSink::open_path(&path, true).await;
    assert!(matches!(result, Err(SinkError::Init(_))));
}

// =============================================================================
// Delivery
// =============================================================================

#[tokio::test]
async fn test_flush_on_tenth_sequence() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("CW_data.txt");
    let sink = FileSink::open_path(&path, false).await.unwrap();

    for seq in 1..=9 {
        sink.deliver(&numbered(seq)).await.unwrap();
    }
    assert_eq!(sink.metrics_handle().snapshot().flush_count, 0);

    sink.deliver(&numbered(10)).await.unwrap();
    assert_eq!(sink.metrics_handle().snapshot().flush_count, 1);

    // flushed data is visible without closing
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.matches("\n\n").count(), 10);
}

#[tokio::test]
async fn test_deliver_after_close_fails() {
    let dir = TempDir::new().unwrap();
    let sink = FileSink::open_path(dir.path().join("CW_data.txt"), false)
        .await
        .unwrap();

    sink.close().await.unwrap();
    let err = sink.deliver(&numbered(1)).await.unwrap_err();

    assert_eq!(err.kind(), crate::SinkErrorKind::Unavailable);
    assert_eq!(sink.metrics_handle().snapshot().write_errors, 1);
}

#[tokio::test]
async fn test_close_exactly_once() {
    let dir = TempDir::new().unwrap();
    let sink = FileSink::open_path(dir.path().join("CW_data.txt"), false)
        .await
        .unwrap();

    sink.close().await.unwrap();
    sink.close().await.unwrap();
    sink.close().await.unwrap();

    assert!(!sink.is_open().await);
    assert_eq!(sink.metrics_handle().snapshot().close_count, 1);
}

#[tokio::test]
async fn test_concurrent_writers_do_not_interleave() {
    const WORKERS: u64 = 8;
    const PER_WORKER: u64 = 200;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("CW_data.txt");
    let sink = Arc::new(FileSink::open_path(&path, false).await.unwrap());

    let mut handles = Vec::new();
    for worker in 0..WORKERS {
        let sink = Arc::clone(&sink);
        handles.push(tokio::spawn(async move {
            for seq in 1..=PER_WORKER {
                // Sensor columns left empty so the name lands in the name column
                let line = format!(
                    "{seq}\t{worker}.5\t0\t{worker}\t30.0\t0.003\t\t\t\t\tDet{worker}"
                );
                let event = RecordParser::parse_at(&line, "det", 0).unwrap();
                sink.deliver(&event).await.unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    sink.close().await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let records: Vec<&str> = contents.lines().filter(|l| !l.is_empty()).collect();
    assert_eq!(records.len() as u64, WORKERS * PER_WORKER);

    for record in records {
        let fields: Vec<&str> = record.split('\t').collect();
        assert_eq!(fields.len(), 7, "malformed record {record:?}");
        let worker = fields[3];
        assert_eq!(fields[6], format!("Det{worker}"));
        assert_eq!(fields[1], format!("{worker}.5"));
    }
}
