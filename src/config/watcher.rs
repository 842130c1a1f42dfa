//! Configuration file watcher for hot reload.
//!
//! The watcher is one of the resources released at shutdown: closing it
//! stops the file watch and ends the update stream.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ServiceConfig;
use crate::lifecycle::{CloseError, Closeable};

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    inner: Mutex<Option<RecommendedWatcher>>,
}

impl ConfigWatcher {
    /// Start watching `path` in a background thread.
    ///
    /// Returns the watcher and a receiver for validated configuration updates.
    /// The receiver ends once the watcher is closed.
    pub fn start(path: &Path) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<ServiceConfig>), notify::Error> {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let reload_path = path.to_path_buf();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading...");
                        match load_config(&reload_path) {
                            Ok(new_config) => {
                                let _ = update_tx.send(new_config);
                            }
                            Err(e) => {
                                tracing::error!(
                                    "Failed to reload config: {}. Keeping current configuration.",
                                    e
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok((
            Arc::new(Self {
                path: path.to_path_buf(),
                inner: Mutex::new(Some(watcher)),
            }),
            update_rx,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file is still being watched.
    pub fn is_watching(&self) -> bool {
        self.inner.lock().map(|w| w.is_some()).unwrap_or(false)
    }

    fn stop(&self) -> Result<(), CloseError> {
        let watcher = self
            .inner
            .lock()
            .map_err(|_| CloseError::new("config watcher lock poisoned"))?
            .take();
        if let Some(watcher) = watcher {
            // Dropping shuts down the notify event loop.
            drop(watcher);
            tracing::debug!(path = ?self.path, "Config watcher stopped");
        }
        Ok(())
    }
}

impl Closeable for ConfigWatcher {
    fn name(&self) -> &str {
        "config-watcher"
    }

    fn close(self: Arc<Self>) -> BoxFuture<'static, Result<(), CloseError>> {
        Box::pin(async move {
            tokio::task::spawn_blocking(move || self.stop())
                .await
                .map_err(|e| CloseError::new(format!("config watcher stop aborted: {}", e)))?
        })
    }
}
