//! Tracing setup for processes embedding the cache.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

use crate::config::LoggingConfig;

static LOG_RELOAD_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Install a global subscriber using the configured level.
pub fn init_tracing(config: &LoggingConfig) {
    init_tracing_with_level(&config.level);
}

/// Install a global subscriber. `RUST_LOG` wins over `level` when set.
///
/// Calling this more than once keeps the first subscriber.
pub fn init_tracing_with_level(level: &str) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(level));

    let (reload_layer, handle) = reload::Layer::new(filter);
    if LOG_RELOAD_HANDLE.set(handle).is_err() {
        return;
    }

    let _ = tracing_subscriber::registry()
        .with(reload_layer)
        .with(fmt::layer().with_target(true))
        .try_init();
}

/// Change the log level of a running process.
///
/// Returns `false` if tracing was not initialised through this module.
pub fn apply_logging_level(level: &str) -> bool {
    let Some(handle) = LOG_RELOAD_HANDLE.get() else {
        return false;
    };
    handle
        .modify(|filter| *filter = EnvFilter::new(level))
        .is_ok()
}
