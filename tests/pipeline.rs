//! End-to-end tests of the batching pipeline against a recording transport.

mod common;

use common::RecordingTransport;
use loki_log_sink::{Level, Log, LogAdapter, LokiAdapter, LokiConfig};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn config(batch_size: usize, interval: Duration) -> LokiConfig {
    LokiConfig::new("http://loki.test/loki/api/v1/push")
        .with_batch_size(batch_size)
        .with_batch_interval(interval)
        .with_retry(3, Duration::from_secs(1))
}

#[tokio::test(start_paused = true)]
async fn size_threshold_flushes_without_waiting_for_interval() {
    let transport = Arc::new(RecordingTransport::new());
    let adapter =
        LokiAdapter::with_transport(config(5, Duration::from_secs(60)), transport.clone()).unwrap();

    for i in 0..5 {
        adapter.log(Log::new(Level::Info, format!("line {}", i)));
    }
    tokio::time::sleep(Duration::from_millis(1)).await;

    let delivered = transport.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].entry_count(), 5);
    assert_eq!(adapter.buffered(), 0);

    adapter.shutdown().await.unwrap();
    assert_eq!(transport.delivered().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn partial_batch_is_flushed_once_after_interval() {
    let transport = Arc::new(RecordingTransport::new());
    let interval = Duration::from_secs(5);
    let adapter = LokiAdapter::with_transport(config(5, interval), transport.clone()).unwrap();

    for i in 0..4 {
        adapter.log(Log::new(Level::Info, format!("line {}", i)));
    }
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(transport.delivered().is_empty());
    assert_eq!(adapter.buffered(), 4);

    tokio::time::sleep(interval).await;
    assert_eq!(transport.delivered().len(), 1);
    assert_eq!(transport.delivered()[0].entry_count(), 4);

    tokio::time::sleep(interval * 3).await;
    assert_eq!(transport.delivered().len(), 1);

    adapter.shutdown().await.unwrap();
    assert_eq!(adapter.stats().flushes, 1);
}

#[tokio::test]
async fn shutdown_delivers_entries_logged_just_before() {
    let transport = Arc::new(RecordingTransport::new());
    let adapter =
        LokiAdapter::with_transport(config(100, Duration::from_secs(60)), transport.clone())
            .unwrap();

    adapter.log(Log::new(Level::Info, "one"));
    adapter.log(Log::new(Level::Warn, "two"));
    adapter.log(Log::new(Level::Error, "three"));
    adapter.shutdown().await.unwrap();

    let mut lines = transport.lines();
    lines.sort();
    assert_eq!(lines, vec!["one", "three", "two"]);
    assert_eq!(adapter.stats().sent_entries, 3);
}

#[tokio::test]
async fn entries_are_grouped_by_label_set() {
    let transport = Arc::new(RecordingTransport::new());
    let adapter =
        LokiAdapter::with_transport(config(100, Duration::from_secs(60)), transport.clone())
            .unwrap();

    adapter.log(Log::new(Level::Info, "a1").with_field("user", "alice").with_field("shard", 1));
    adapter.log(Log::new(Level::Info, "b1").with_field("user", "bob").with_field("shard", 1));
    adapter.log(Log::new(Level::Info, "a2").with_field("shard", 1).with_field("user", "alice"));
    adapter.log(Log::new(Level::Error, "a3").with_field("user", "alice").with_field("shard", 1));
    adapter.shutdown().await.unwrap();

    let delivered = transport.delivered();
    assert_eq!(delivered.len(), 1);
    let streams = &delivered[0].streams;
    assert_eq!(streams.len(), 3);

    let alice_info = streams
        .iter()
        .find(|s| {
            s.stream.get("user").map(String::as_str) == Some("alice")
                && s.stream.get("level").map(String::as_str) == Some("info")
        })
        .unwrap();
    let lines: Vec<&str> = alice_info.values.iter().map(|v| v[1].as_str()).collect();
    assert_eq!(lines, vec!["a1", "a2"]);
    assert_eq!(alice_info.stream.get("shard").map(String::as_str), Some("1"));
    assert_eq!(alice_info.stream.get("job").map(String::as_str), Some("app_logs"));
}

#[tokio::test]
async fn disabled_or_filtered_records_never_reach_transport() {
    let transport = Arc::new(RecordingTransport::new());
    let adapter = LokiAdapter::with_transport(
        config(10, Duration::from_secs(60)).with_enabled(false),
        transport.clone(),
    )
    .unwrap();
    for _ in 0..50 {
        adapter.log(Log::new(Level::Fatal, "nope"));
    }
    adapter.shutdown().await.unwrap();
    assert_eq!(transport.attempt_count(), 0);
    assert_eq!(adapter.stats().filtered, 50);

    let transport = Arc::new(RecordingTransport::new());
    let adapter = LokiAdapter::with_transport(
        config(10, Duration::from_secs(60)).with_level(Level::Error),
        transport.clone(),
    )
    .unwrap();
    for _ in 0..50 {
        adapter.log(Log::new(Level::Warn, "below"));
    }
    adapter.shutdown().await.unwrap();
    assert_eq!(transport.attempt_count(), 0);
    assert_eq!(adapter.stats().filtered, 50);
}

#[tokio::test]
async fn overflow_drops_excess_without_blocking() {
    let transport = Arc::new(RecordingTransport::new());
    // Queue capacity is ten times the batch size.
    let adapter =
        LokiAdapter::with_transport(config(1, Duration::from_secs(60)), transport.clone()).unwrap();

    // The current-thread runtime cannot run the worker until we yield.
    for i in 0..100 {
        adapter.log(Log::new(Level::Info, format!("burst {}", i)));
    }
    let stats = adapter.stats();
    assert_eq!(stats.enqueued, 10);
    assert_eq!(stats.dropped, 90);

    adapter.shutdown().await.unwrap();
    assert_eq!(adapter.stats().sent_entries, 10);
    assert_eq!(transport.lines()[0], "burst 0");
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_with_growing_backoff() {
    let transport = Arc::new(RecordingTransport::with_script([500, 502, 204]));
    let adapter =
        LokiAdapter::with_transport(config(2, Duration::from_secs(60)), transport.clone()).unwrap();

    adapter.log(Log::new(Level::Info, "x"));
    adapter.log(Log::new(Level::Info, "y"));
    tokio::time::sleep(Duration::from_secs(10)).await;

    let times = transport.attempt_times();
    assert_eq!(times.len(), 3);
    assert_eq!(times[1] - times[0], Duration::from_secs(1));
    assert_eq!(times[2] - times[1], Duration::from_secs(2));

    let stats = adapter.stats();
    assert_eq!(stats.flushes, 1);
    assert_eq!(stats.failed_flushes, 0);
    assert_eq!(stats.sent_entries, 2);
    adapter.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_drop_the_batch() {
    let transport = Arc::new(RecordingTransport::with_script([500; 10]));
    let adapter = LokiAdapter::with_transport(
        config(1, Duration::from_secs(60)).with_retry(2, Duration::from_millis(100)),
        transport.clone(),
    )
    .unwrap();

    adapter.log(Log::new(Level::Error, "lost"));
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(transport.attempt_count(), 3);
    assert!(transport.delivered().is_empty());
    assert_eq!(adapter.stats().failed_flushes, 1);
    assert_eq!(adapter.buffered(), 0);

    adapter.log(Log::new(Level::Error, "next"));
    adapter.shutdown().await.unwrap();
    assert_eq!(transport.attempt_count(), 6);
}

#[tokio::test]
async fn structured_fields_stay_in_the_line() {
    let transport = Arc::new(RecordingTransport::new());
    let adapter =
        LokiAdapter::with_transport(config(100, Duration::from_secs(60)), transport.clone())
            .unwrap();

    adapter.log(
        Log::new(Level::Error, "request failed")
            .with_name("http")
            .with_error("timeout")
            .with_field("status", 504)
            .with_field("headers", json!({"x-id": "abc"})),
    );
    adapter.shutdown().await.unwrap();

    let delivered = transport.delivered();
    let stream = &delivered[0].streams[0];
    assert_eq!(
        stream.values[0][1],
        r#"[http]: request failed - Error: timeout | {"headers":{"x-id":"abc"}}"#
    );
    assert_eq!(stream.stream.get("status").map(String::as_str), Some("504"));
    assert_eq!(stream.stream.get("logger_name").map(String::as_str), Some("http"));
    assert!(stream.values[0][0].parse::<i64>().unwrap() > 0);
}
