pub mod record;
pub mod config;
pub mod env;
pub mod format;
pub mod stream;
pub mod transport;
pub mod sender;
pub mod stats;
pub mod adapter;
pub mod layer;
pub mod init;

mod accumulator;

pub use adapter::{BuildError, LogAdapter, LokiAdapter, ShutdownError};
pub use config::{ConfigError, LokiConfig, MAX_BATCH_INTERVAL};
pub use layer::LokiLayer;
pub use record::{
    is_valid_label_name, sanitize_label_name, FieldValue, LabelSet, Level, Log, LogEntry,
};
pub use stats::StatsSnapshot;
pub use transport::{NoopTransport, Transport, TransportError};

#[cfg(feature = "http")]
pub use transport::HttpTransport;
