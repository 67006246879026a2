//! Configuration file watcher for hot route registration.
//!
//! # Data Flow
//! ```text
//! notify event ──▶ events channel ──▶ reload task
//!                                       │ wait out the burst (debounce)
//!                                       │ read file, skip if unchanged
//!                                       │ parse + validate
//!                                       ▼
//!                                 RouterConfig (with epoch) ──▶ updates channel
//! ```
//!
//! Editors usually emit several events per save, so events are coalesced
//! before the file is read. A reload whose text matches the last accepted
//! one is dropped.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::loader::parse_config;
use crate::config::schema::RouterConfig;

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("file watcher failed: {0}")]
    Notify(#[from] notify::Error),

    #[error("config watcher needs a Tokio runtime")]
    NoRuntime,
}

/// Monitors a configuration file and emits every distinct, valid reload.
pub struct ConfigWatcher {
    path: PathBuf,
    debounce: Duration,
}

/// Keeps the watch alive; dropping it stops reloads.
pub struct WatchHandle {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl ConfigWatcher {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Quiet period that must pass after the last file event before reloading.
    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Start watching. Reloaded configs arrive on the returned receiver.
    pub fn spawn(self) -> Result<(WatchHandle, mpsc::UnboundedReceiver<RouterConfig>), WatchError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| WatchError::NoRuntime)?;
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    let _ = event_tx.send(());
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        let initial = std::fs::read_to_string(&self.path).ok();
        let task = runtime.spawn(reload_loop(
            self.path.clone(),
            self.debounce,
            initial,
            event_rx,
            update_tx,
        ));
        tracing::info!(path = ?self.path, debounce_ms = self.debounce.as_millis() as u64, "Config watcher started");

        Ok((
            WatchHandle {
                _watcher: watcher,
                task,
            },
            update_rx,
        ))
    }
}

async fn reload_loop(
    path: PathBuf,
    debounce: Duration,
    mut last: Option<String>,
    mut events: mpsc::UnboundedReceiver<()>,
    updates: mpsc::UnboundedSender<RouterConfig>,
) {
    let mut epoch = 0u64;
    while events.recv().await.is_some() {
        while let Ok(Some(())) = tokio::time::timeout(debounce, events.recv()).await {}

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::error!(path = ?path, error = %e, "Failed to read config, keeping current routes");
                continue;
            }
        };
        if last.as_deref() == Some(content.as_str()) {
            tracing::debug!(path = ?path, "Config unchanged, skipping reload");
            continue;
        }

        match parse_config(&content) {
            Ok(config) => {
                epoch += 1;
                last = Some(content);
                tracing::info!(path = ?path, epoch, routes = config.routes.len(), "Config reloaded");
                if updates.send(config).is_err() {
                    tracing::debug!("Config receiver dropped");
                    return;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to reload config, keeping current routes");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, routes: &[&str]) {
        let body: String = routes
            .iter()
            .map(|p| format!("[[routes]]\npath = \"{p}\"\n"))
            .collect();
        fs::write(path, body).unwrap();
    }

    #[tokio::test]
    async fn test_burst_is_coalesced_and_unchanged_text_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.toml");
        write(&path, &["/a"]);
        let initial = fs::read_to_string(&path).ok();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (update_tx, mut update_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(reload_loop(
            path.clone(),
            Duration::from_millis(10),
            initial,
            event_rx,
            update_tx,
        ));

        // Touch without changing the text.
        event_tx.send(()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(update_rx.try_recv().is_err());

        write(&path, &["/a", "/b"]);
        for _ in 0..3 {
            event_tx.send(()).unwrap();
        }
        let config = tokio::time::timeout(Duration::from_secs(2), update_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(config.routes.len(), 2);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(update_rx.try_recv().is_err());

        drop(event_tx);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_reload_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.toml");
        fs::write(&path, "[matching]\nmax_redirect_hops = 0\n").unwrap();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (update_tx, mut update_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(reload_loop(path, Duration::from_millis(5), None, event_rx, update_tx));

        event_tx.send(()).unwrap();
        drop(event_tx);
        task.await.unwrap();
        assert!(update_rx.recv().await.is_none());
    }

    #[test]
    fn test_spawn_outside_runtime() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            ConfigWatcher::new(file.path()).spawn(),
            Err(WatchError::NoRuntime)
        ));
    }
}
