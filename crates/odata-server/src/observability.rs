//! Tracing setup, trimmed from the teacher's `observability` module: a
//! reloadable `EnvFilter` so `odata-config`'s hot-reloaded `logging.level`
//! can change verbosity without a restart, no OpenTelemetry export.

use std::sync::OnceLock;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter};

static LOG_RELOAD_HANDLE: OnceLock<reload::Handle<EnvFilter, tracing_subscriber::Registry>> = OnceLock::new();

pub fn init_tracing(level: &str) {
    let base_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let (reload_layer, handle) = reload::Layer::new(base_filter);
    let _ = LOG_RELOAD_HANDLE.set(handle);

    let _ = tracing_subscriber::registry().with(reload_layer).with(fmt::layer()).try_init();
}

/// Applies a new logging level at runtime, called from the config watcher.
pub fn apply_logging_level(level: &str) {
    if let Some(handle) = LOG_RELOAD_HANDLE.get() {
        let _ = handle.modify(|filter| *filter = EnvFilter::new(level));
    }
}
