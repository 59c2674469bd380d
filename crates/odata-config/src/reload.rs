//! A lock-free, hot-reloadable [`OdataConfig`] handle, grounded on the
//! teacher's `config_watch::start_config_watcher` (debounced `notify` watcher
//! on a single file, reloading in a dedicated thread) with the swap mechanism
//! itself taken from its `reloadable::ReloadableSearchConfig` (`ArcSwap`
//! instead of `Arc<RwLock<_>>`, so readers never block on a writer).

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use notify::{recommended_watcher, Event, RecursiveMode, Watcher};
use tracing::{error, info, warn};

use crate::loader::load_config;
use crate::settings::OdataConfig;

const DEBOUNCE: Duration = Duration::from_millis(500);

type Listener = Box<dyn Fn(&OdataConfig) + Send + Sync>;

/// A shared, swappable [`OdataConfig`] snapshot. Cloning is cheap (an `Arc`
/// bump); every clone observes reloads performed through any other clone.
#[derive(Clone)]
pub struct ReloadableConfig {
    inner: Arc<ArcSwap<OdataConfig>>,
    listeners: Arc<Mutex<Vec<Listener>>>,
}

impl ReloadableConfig {
    pub fn new(config: OdataConfig) -> Self {
        Self { inner: Arc::new(ArcSwap::from_pointee(config)), listeners: Arc::new(Mutex::new(Vec::new())) }
    }

    /// Loads the initial configuration from `path` (or the default search
    /// path, see [`load_config`]) and wraps it.
    pub fn load(path: Option<&str>) -> crate::loader::Result<Self> {
        Ok(Self::new(load_config(path)?))
    }

    /// The current configuration snapshot.
    pub fn current(&self) -> Arc<OdataConfig> {
        self.inner.load_full()
    }

    /// Registers a callback run (on the watcher thread) after every
    /// successful reload, e.g. to re-apply a logging level without a
    /// restart. Not called for the initial load.
    pub fn on_reload<F>(&self, listener: F)
    where
        F: Fn(&OdataConfig) + Send + Sync + 'static,
    {
        self.listeners.lock().unwrap().push(Box::new(listener));
    }

    fn store(&self, config: OdataConfig) {
        for listener in self.listeners.lock().unwrap().iter() {
            listener(&config);
        }
        self.inner.store(Arc::new(config));
    }

    /// Starts a background thread watching `path` for changes, reloading and
    /// validating on each debounced change event and swapping in the result.
    /// A reload that fails to parse or validate is logged and discarded,
    /// leaving the previous snapshot in place. Returns `None` (and leaves the
    /// snapshot static) if `path` does not exist.
    pub fn watch(&self, path: impl Into<PathBuf>) -> Option<std::thread::JoinHandle<()>> {
        let path = path.into();
        if !path.exists() {
            warn!(?path, "config file does not exist; hot-reload watcher disabled");
            return None;
        }

        let handle = self.clone();
        Some(std::thread::spawn(move || run_watcher(path, handle)))
    }
}

fn run_watcher(path: PathBuf, handle: ReloadableConfig) {
    let last_reload = Arc::new(Mutex::new(Instant::now() - DEBOUNCE));
    let watch_path = path.clone();

    let mut watcher = match recommended_watcher(move |res: Result<Event, notify::Error>| {
        let event = match res {
            Ok(event) => event,
            Err(err) => {
                error!(%err, "config watch error");
                return;
            }
        };
        if !event.kind.is_modify() && !event.kind.is_create() {
            return;
        }
        let mut last = last_reload.lock().unwrap();
        let now = Instant::now();
        if now.duration_since(*last) < DEBOUNCE {
            return;
        }
        *last = now;
        reload_into(&watch_path, &handle);
    }) {
        Ok(watcher) => watcher,
        Err(err) => {
            error!(%err, "failed to start config watcher");
            return;
        }
    };

    if let Err(err) = watcher.watch(&path, RecursiveMode::NonRecursive) {
        error!(%err, "failed to watch config file");
        return;
    }

    loop {
        std::thread::park();
    }
}

fn reload_into(path: &Path, handle: &ReloadableConfig) {
    match load_config(path.to_str()) {
        Ok(config) => {
            info!(?path, "configuration reloaded");
            handle.store(config);
        }
        Err(err) => error!(%err, ?path, "configuration reload failed, keeping previous snapshot"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_reflects_the_wrapped_config() {
        let config = OdataConfig { dialect: "mysql".into(), ..Default::default() };
        let reloadable = ReloadableConfig::new(config);
        assert_eq!(reloadable.current().dialect, "mysql");
    }

    #[test]
    fn store_swaps_the_snapshot_for_all_clones() {
        let reloadable = ReloadableConfig::new(OdataConfig::default());
        let clone = reloadable.clone();
        reloadable.store(OdataConfig { dialect: "oracle".into(), ..Default::default() });
        assert_eq!(clone.current().dialect, "oracle");
    }

    #[test]
    fn watch_on_a_missing_path_is_a_no_op() {
        let reloadable = ReloadableConfig::new(OdataConfig::default());
        assert!(reloadable.watch("/nonexistent/odata.toml").is_none());
    }
}
