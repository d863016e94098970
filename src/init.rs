use crate::adapter::{BuildError, LokiAdapter};
#[cfg(feature = "http")]
use crate::config::LokiConfig;
use crate::layer::LokiLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Options for the subscriber installed by [`init_tracing_with_options`].
///
/// **Fields**
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   added next to the [`LokiLayer`] so events (including this crate's
///   own diagnostics) are also printed to the console.
/// - `name_from_target`: use the event target as the logger name, which
///   adds a `logger_name` label and a `[target]: ` line prefix.
#[derive(Clone, Debug)]
pub struct LayerOptions {
    pub enable_stdout: bool,
    pub name_from_target: bool,
}

impl Default for LayerOptions {
    fn default() -> Self {
        Self {
            enable_stdout: true,
            name_from_target: false,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Build a [`LokiAdapter`] from `config` and install it as part of the
/// global `tracing` subscriber.
///
/// **Returns**
/// - The adapter handle; call [`LokiAdapter::shutdown`] before the runtime
///   exits so buffered entries are delivered.
/// - `Err(InitError)` if the adapter could not be built or a global
///   subscriber was already set.
#[cfg(feature = "http")]
pub fn init_tracing_with_options(
    config: LokiConfig,
    options: LayerOptions,
) -> Result<LokiAdapter, InitError> {
    let adapter = LokiAdapter::new(config)?;
    install(adapter.clone(), options)?;
    Ok(adapter)
}

/// Initialize tracing with the default [`LayerOptions`].
///
/// This is the recommended entrypoint for typical microservices.
#[cfg(feature = "http")]
pub fn init_tracing(config: LokiConfig) -> Result<LokiAdapter, InitError> {
    init_tracing_with_options(config, LayerOptions::default())
}

/// Install an already built adapter as the global subscriber.
pub fn install(adapter: LokiAdapter, options: LayerOptions) -> Result<(), InitError> {
    let layer = LokiLayer::new(adapter).with_name_from_target(options.name_from_target);

    // The two branches produce different subscriber types.
    if options.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}
