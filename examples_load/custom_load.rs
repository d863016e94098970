use std::sync::Arc;
use std::time::Instant;
use tokio::time::Duration;
use tracing::error;

use loki_log_sink::init::{install, LayerOptions};
use loki_log_sink::{LokiAdapter, LokiConfig, NoopTransport};

#[tokio::main]
async fn main() {
    let config = LokiConfig::new("http://127.0.0.1:3100/loki/api/v1/push")
        .with_batch_size(5_000)
        .with_batch_interval(Duration::from_millis(200))
        .with_label("service", "custom_load");

    let adapter = LokiAdapter::with_transport(config, Arc::new(NoopTransport))
        .expect("build adapter");
    install(
        adapter.clone(),
        LayerOptions {
            enable_stdout: false,
            name_from_target: true,
        },
    )
    .expect("install subscriber");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, shard = i % 4, "custom load test error");
    }

    let elapsed = start.elapsed();
    println!("custom config: submitted {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    adapter.shutdown().await.expect("shutdown");
    let stats = adapter.stats();
    println!("enqueued {} dropped {} sent {}", stats.enqueued, stats.dropped, stats.sent_entries);
}
