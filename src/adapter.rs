use crate::accumulator::{Accumulator, SharedBuffer};
use crate::config::{ConfigError, LokiConfig};
use crate::format::format_entry;
use crate::record::{Log, LogEntry};
use crate::sender::RetryPolicy;
use crate::stats::{AdapterStats, StatsSnapshot};
use crate::transport::{Transport, TransportError};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Capability handed to the logging facade: submit one record.
///
/// `log` is called from arbitrary threads, must never block and never
/// reports failure to the caller.
pub trait LogAdapter: Send + Sync {
    fn log(&self, record: Log);
}

#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("invalid loki config: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("the loki adapter must be created inside a tokio runtime")]
    NoRuntime,
}

#[derive(thiserror::Error, Debug)]
pub enum ShutdownError {
    #[error("loki adapter is already stopped")]
    AlreadyStopped,

    #[error("loki batch worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

enum Lifecycle {
    Running {
        shutdown: oneshot::Sender<()>,
        worker: JoinHandle<()>,
    },
    Stopped,
}

struct Inner {
    config: LokiConfig,
    queue: mpsc::Sender<LogEntry>,
    buffer: SharedBuffer,
    stats: Arc<AdapterStats>,
    lifecycle: Mutex<Lifecycle>,
}

/// Handle to a running Loki adapter.
///
/// Cloning is cheap and every clone feeds the same batching worker. Records
/// are formatted on the calling thread, pushed into a bounded queue and
/// shipped by a single background task; see [`LokiAdapter::shutdown`] for
/// the final drain.
#[derive(Clone)]
pub struct LokiAdapter {
    inner: Arc<Inner>,
}

impl LokiAdapter {
    /// Validate `config`, build the HTTP transport and start the worker.
    ///
    /// **Returns**
    /// - A running [`LokiAdapter`].
    /// - `Err(BuildError)` if the config is invalid, the HTTP client could
    ///   not be created or no Tokio runtime is available.
    #[cfg(feature = "http")]
    pub fn new(config: LokiConfig) -> Result<Self, BuildError> {
        config.validate()?;
        let transport = crate::transport::HttpTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Same as [`LokiAdapter::new`] but delivering through `transport`.
    pub fn with_transport(
        config: LokiConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, BuildError> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| BuildError::NoRuntime)?;

        let (tx, rx) = mpsc::channel::<LogEntry>(config.queue_capacity());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let buffer = SharedBuffer::new(config.batch_size);
        let stats = Arc::new(AdapterStats::default());

        let accumulator = Accumulator {
            buffer: buffer.clone(),
            transport,
            stats: Arc::clone(&stats),
            batch_size: config.batch_size,
            batch_interval: config.batch_interval,
            retry: RetryPolicy {
                retry_count: config.retry_count,
                retry_delay: config.retry_delay,
            },
        };
        let worker = runtime.spawn(accumulator.run(rx, shutdown_rx));

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                queue: tx,
                buffer,
                stats,
                lifecycle: Mutex::new(Lifecycle::Running {
                    shutdown: shutdown_tx,
                    worker,
                }),
            }),
        })
    }

    pub fn config(&self) -> &LokiConfig {
        &self.inner.config
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Entries currently held by the worker and not yet flushed.
    pub fn buffered(&self) -> usize {
        self.inner.buffer.len()
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lifecycle(), Lifecycle::Running { .. })
    }

    /// Stop the worker and wait for its final flush.
    ///
    /// Everything accepted by [`LogAdapter::log`] before this call is drained
    /// from the queue and sent, including retries. Afterwards the adapter
    /// silently drops new records. Stopping is irreversible; a second call
    /// returns [`ShutdownError::AlreadyStopped`].
    ///
    /// Only the first call waits. A call made while another shutdown is
    /// still flushing returns [`ShutdownError::AlreadyStopped`] right away,
    /// before the final batch has been delivered; hold on to the first
    /// call's future if completion matters.
    pub async fn shutdown(&self) -> Result<(), ShutdownError> {
        let previous = std::mem::replace(&mut *self.lifecycle(), Lifecycle::Stopped);
        match previous {
            Lifecycle::Running { shutdown, worker } => {
                // The worker may already have exited if every producer is gone.
                let _ = shutdown.send(());
                worker.await?;
                Ok(())
            }
            Lifecycle::Stopped => Err(ShutdownError::AlreadyStopped),
        }
    }

    fn lifecycle(&self) -> std::sync::MutexGuard<'_, Lifecycle> {
        self.inner.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LogAdapter for LokiAdapter {
    fn log(&self, record: Log) {
        let stats = &self.inner.stats;
        AdapterStats::incr(&stats.submitted);

        let Some(entry) = format_entry(&self.inner.config, record) else {
            AdapterStats::incr(&stats.filtered);
            return;
        };

        match self.inner.queue.try_send(entry) {
            Ok(()) => AdapterStats::incr(&stats.enqueued),
            Err(TrySendError::Full(entry)) => {
                AdapterStats::incr(&stats.dropped);
                tracing::warn!(line = %entry.line, "loki queue overflow, dropping log");
            }
            Err(TrySendError::Closed(_)) => AdapterStats::incr(&stats.dropped),
        }
    }
}

impl<T: LogAdapter + ?Sized> LogAdapter for Arc<T> {
    fn log(&self, record: Log) {
        (**self).log(record)
    }
}
