use std::sync::Arc;

use async_trait::async_trait;
use loki_log_sink::{Level, Log, LogAdapter, LokiAdapter, LokiConfig, Transport, TransportError};

/// Example of plugging in a custom transport by implementing the
/// `Transport` trait directly, e.g. to route pushes through a gateway
/// client this crate does not know about.
struct StdoutTransport;

#[async_trait]
impl Transport for StdoutTransport {
    async fn push(&self, body: Vec<u8>) -> Result<u16, TransportError> {
        println!("[stdout-transport] {}", String::from_utf8_lossy(&body));
        Ok(204)
    }
}

#[tokio::main]
async fn main() {
    let config = LokiConfig::new("http://unused.invalid/loki/api/v1/push");
    let adapter = LokiAdapter::with_transport(config, Arc::new(StdoutTransport))
        .expect("build adapter");

    adapter.log(Log::new(Level::Info, "custom transport example started").with_name("example"));
    adapter.log(
        Log::new(Level::Error, "simulated failure")
            .with_field("db", "my-custom-db")
            .with_error("disk full"),
    );

    adapter.shutdown().await.expect("shutdown");
}
