use crate::record::{is_valid_label_name, LabelSet, Level};
use std::time::Duration;

/// Configuration of a [`LokiAdapter`](crate::adapter::LokiAdapter).
///
/// Immutable once the adapter is built. [`LokiConfig::new`] fills in the
/// defaults used by most services; the `with_*` methods override them.
///
/// **Fields**
/// - `enabled`: when `false` every record is discarded before formatting.
/// - `level`: minimum severity forwarded to Loki.
/// - `url`: full push endpoint, e.g. `http://127.0.0.1:3100/loki/api/v1/push`.
/// - `labels`: static labels attached to every stream.
/// - `batch_size`: buffered entries that trigger an immediate flush. The
///   ingest queue holds ten times this many entries.
/// - `batch_interval`: maximum age of a non-empty buffer before a flush.
/// - `retry_count`: extra attempts after the first failed push.
/// - `retry_delay`: base delay of the linear backoff between attempts.
/// - `timeout`: per-request HTTP timeout.
/// - `tenant_id`: optional `X-Scope-OrgID` for multi-tenant deployments.
#[derive(Clone, Debug, PartialEq)]
pub struct LokiConfig {
    pub enabled: bool,
    pub level: Level,
    pub url: String,
    pub labels: LabelSet,
    pub batch_size: usize,
    pub batch_interval: Duration,
    pub retry_count: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
    pub tenant_id: Option<String>,
}

/// Multiplier between the batch size and the ingest queue capacity.
pub const QUEUE_CAPACITY_FACTOR: usize = 10;

/// Longest accepted batch interval.
pub const MAX_BATCH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("batch size must be greater than 0")]
    ZeroBatchSize,

    #[error("batch interval must be greater than 0")]
    ZeroBatchInterval,

    #[error("batch interval must not exceed {max:?}, got {got:?}")]
    BatchIntervalTooLong { max: Duration, got: Duration },

    #[error("invalid static label name: {0:?}")]
    InvalidLabelName(String),

    #[error("push url is empty")]
    EmptyUrl,

    #[error("push url must start with http:// or https://: {0}")]
    InvalidUrl(String),

    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },
}

impl LokiConfig {
    /// Default configuration pointing at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        let mut labels = LabelSet::new();
        labels.insert("job".to_string(), "app_logs".to_string());

        Self {
            enabled: true,
            level: Level::Debug,
            url: url.into(),
            labels,
            batch_size: 100,
            batch_interval: Duration::from_secs(5),
            retry_count: 3,
            retry_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(10),
            tenant_id: None,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Replace the static label set.
    pub fn with_labels<I, K, V>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.labels = labels.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_batch_interval(mut self, batch_interval: Duration) -> Self {
        self.batch_interval = batch_interval;
        self
    }

    pub fn with_retry(mut self, retry_count: u32, retry_delay: Duration) -> Self {
        self.retry_count = retry_count;
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Capacity of the ingest queue derived from the batch size.
    pub fn queue_capacity(&self) -> usize {
        self.batch_size.saturating_mul(QUEUE_CAPACITY_FACTOR)
    }

    /// Check the invariants the batching loop relies on.
    ///
    /// The URL is only checked when the adapter is enabled; a disabled
    /// adapter never talks to the network.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.batch_interval.is_zero() {
            return Err(ConfigError::ZeroBatchInterval);
        }
        if self.batch_interval > MAX_BATCH_INTERVAL {
            return Err(ConfigError::BatchIntervalTooLong {
                max: MAX_BATCH_INTERVAL,
                got: self.batch_interval,
            });
        }
        if let Some(name) = self.labels.keys().find(|k| !is_valid_label_name(k)) {
            return Err(ConfigError::InvalidLabelName(name.clone()));
        }
        if self.enabled {
            let url = self.url.trim();
            if url.is_empty() {
                return Err(ConfigError::EmptyUrl);
            }
            let lower = url.to_ascii_lowercase();
            if !(lower.starts_with("http://") || lower.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl(self.url.clone()));
            }
        }
        Ok(())
    }
}
