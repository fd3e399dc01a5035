//! Configuration file watcher for hot reload of static routes.
//!
//! The parent directory is watched rather than the file itself: editors that
//! save by writing a temp file and renaming it would otherwise leave the
//! watch attached to a deleted inode.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::AppConfig;

/// Sends a freshly validated [`AppConfig`] whenever the file changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<AppConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<AppConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. Updates stop when the returned watcher is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file = self.path.clone();
        let tx = self.update_tx;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_reload_event(&event, &file) => match load_config(&file) {
                    Ok(config) => {
                        tracing::info!(path = ?file, routes = config.routes.len(), "Config reloaded");
                        let _ = tx.send(config);
                    }
                    Err(e) => {
                        tracing::error!(path = ?file, error = %e, "Config reload rejected, keeping current routes");
                    }
                },
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// True for create/modify events that touch `file`.
fn is_reload_event(event: &Event, file: &Path) -> bool {
    let relevant_kind = matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_));
    relevant_kind && event.paths.iter().any(|p| p.file_name() == file.file_name())
}
