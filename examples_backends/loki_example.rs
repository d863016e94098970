use tracing::{error, info, warn};

use loki_log_sink::env::{env_or, LOKI_SINK_URL_ENV};
use loki_log_sink::init::init_tracing;
use loki_log_sink::LokiConfig;

/// Ships a few events to a local Loki. Start one with
/// `docker run -p 3100:3100 grafana/loki` and query `{job="app_logs"}`.
#[tokio::main]
async fn main() {
    let url = env_or(LOKI_SINK_URL_ENV, "http://127.0.0.1:3100/loki/api/v1/push");
    let config = LokiConfig::new(url).with_label("service", "loki_example");

    let adapter = init_tracing(config).expect("init tracing");

    info!(user = "alice", "loki example started");
    warn!(retries = 2u64, "slow upstream");
    error!(payload = ?vec![1, 2, 3], "request rejected");

    adapter.shutdown().await.expect("shutdown");
}
