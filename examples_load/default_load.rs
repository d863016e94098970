use std::sync::Arc;
use std::time::Instant;
use tracing::error;

use loki_log_sink::init::{install, LayerOptions};
use loki_log_sink::{LokiAdapter, LokiConfig, NoopTransport};

#[tokio::main]
async fn main() {
    let adapter = LokiAdapter::with_transport(
        LokiConfig::new("http://127.0.0.1:3100/loki/api/v1/push"),
        Arc::new(NoopTransport),
    )
    .expect("build adapter");
    install(
        adapter.clone(),
        LayerOptions {
            enable_stdout: false,
            ..LayerOptions::default()
        },
    )
    .expect("install subscriber");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "default load test error");
    }

    let elapsed = start.elapsed();
    println!("default config: submitted {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    adapter.shutdown().await.expect("shutdown");
    println!("{:?}", adapter.stats());
}
