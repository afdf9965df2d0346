//! File system watcher using notify-rs.

#![allow(clippy::used_underscore_binding)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind, Debouncer};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::events::{ChangeEvent, EventBatch};
use super::filter::GlobPattern;
use crate::error::WatcherError;
use crate::Result;

/// Registration side of a change notification source.
///
/// Implementations must tolerate being cleared and re-registered repeatedly;
/// the discovery engine rebuilds the full watch set on every root change.
pub trait WatchRegistry: Send {
    /// Drop every registered watch.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying source cannot be reset.
    fn clear_all(&mut self) -> Result<()>;

    /// Watch everything under `root` that may match `pattern`.
    ///
    /// # Errors
    ///
    /// Returns an error if the watch cannot be installed.
    fn register(&mut self, root: &Path, pattern: &GlobPattern) -> Result<()>;

    /// Watch for `root` itself appearing or disappearing.
    ///
    /// # Errors
    ///
    /// Returns an error if the watch cannot be installed.
    fn register_existence(&mut self, root: &Path) -> Result<()>;
}

/// Registry for discovery instances that never receive live events,
/// such as one-shot scans.
#[derive(Debug, Default)]
pub struct NoopRegistry;

impl WatchRegistry for NoopRegistry {
    fn clear_all(&mut self) -> Result<()> {
        Ok(())
    }

    fn register(&mut self, _root: &Path, _pattern: &GlobPattern) -> Result<()> {
        Ok(())
    }

    fn register_existence(&mut self, _root: &Path) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct WatchedRoot {
    root: PathBuf,
    pattern: GlobPattern,
}

/// Debounced notify watcher forwarding changes as [`ChangeEvent`]s.
pub struct NotifyWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
    watched: Arc<Mutex<Vec<WatchedRoot>>>,
    existence: Vec<PathBuf>,
}

impl NotifyWatcher {
    /// Create a watcher that sends debounced batches to `event_tx`.
    ///
    /// No paths are watched until [`WatchRegistry::register`] is called.
    ///
    /// # Errors
    ///
    /// Returns an error if the watcher cannot be created.
    pub fn new(debounce: Duration, event_tx: mpsc::Sender<ChangeEvent>) -> Result<Self> {
        let watched: Arc<Mutex<Vec<WatchedRoot>>> = Arc::new(Mutex::new(Vec::new()));
        let watched_clone = Arc::clone(&watched);

        let debouncer = new_debouncer(
            debounce,
            move |result: std::result::Result<
                Vec<notify_debouncer_mini::DebouncedEvent>,
                notify::Error,
            >| {
                match result {
                    Ok(events) => {
                        let mut batch = EventBatch::new();
                        for event in events {
                            if matches!(
                                event.kind,
                                DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous
                            ) {
                                batch.add(event.path);
                            }
                        }

                        let roots = watched_clone.lock().clone();
                        batch.retain(|p| is_forwarded(&roots, p));

                        if !batch.is_empty() {
                            tracing::trace!(paths = batch.len(), "Forwarding change batch");
                            if event_tx.blocking_send(batch.into_event()).is_err() {
                                tracing::debug!("Change receiver dropped, discarding batch");
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!("Watch error: {:?}", e);
                    }
                }
            },
        )
        .map_err(|e| WatcherError::watch_failed(Path::new("init"), e))?;

        Ok(Self {
            _debouncer: debouncer,
            watched,
            existence: Vec::new(),
        })
    }

    /// Roots currently watched recursively.
    #[must_use]
    pub fn watched_dirs(&self) -> Vec<PathBuf> {
        self.watched.lock().iter().map(|w| w.root.clone()).collect()
    }

    /// Parent directories watched for root existence.
    #[must_use]
    pub fn existence_dirs(&self) -> &[PathBuf] {
        &self.existence
    }
}

impl WatchRegistry for NotifyWatcher {
    fn clear_all(&mut self) -> Result<()> {
        let roots: Vec<WatchedRoot> = std::mem::take(&mut *self.watched.lock());
        let parents = std::mem::take(&mut self.existence);

        for path in roots.iter().map(|w| &w.root).chain(parents.iter()) {
            // A removed root is already gone from the OS watch table.
            if let Err(e) = self._debouncer.watcher().unwatch(path) {
                tracing::debug!(path = %path.display(), error = %e, "Unwatch failed");
            }
        }

        tracing::debug!(cleared = roots.len() + parents.len(), "Cleared all watches");
        Ok(())
    }

    fn register(&mut self, root: &Path, pattern: &GlobPattern) -> Result<()> {
        if !root.exists() {
            return Err(WatcherError::watch_failed(root, "directory does not exist").into());
        }

        if self.watched.lock().iter().any(|w| w.root == root) {
            return Ok(());
        }

        self._debouncer
            .watcher()
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| WatcherError::watch_failed(root, e))?;

        self.watched.lock().push(WatchedRoot {
            root: root.to_path_buf(),
            pattern: pattern.clone(),
        });
        tracing::info!(path = %root.display(), pattern = %pattern, "Watching directory");

        Ok(())
    }

    fn register_existence(&mut self, root: &Path) -> Result<()> {
        let Some(parent) = root.parent().filter(|p| p.is_dir()) else {
            tracing::debug!(path = %root.display(), "Root has no watchable parent");
            return Ok(());
        };

        if self.existence.iter().any(|p| p == parent) {
            return Ok(());
        }

        self._debouncer
            .watcher()
            .watch(parent, RecursiveMode::NonRecursive)
            .map_err(|e| WatcherError::watch_failed(parent, e))?;

        self.existence.push(parent.to_path_buf());
        tracing::debug!(path = %parent.display(), "Watching root parent for existence");

        Ok(())
    }
}

/// Decide whether a raw notification is worth reconciling.
///
/// Paths outside every root (siblings seen through an existence watch) are
/// dropped, as are existing files the root's pattern rejects. Directories and
/// vanished paths always pass; the engine classifies them.
fn is_forwarded(watched: &[WatchedRoot], path: &Path) -> bool {
    watched.iter().any(|w| {
        path.starts_with(&w.root) && (!path.is_file() || w.pattern.matches_in(&w.root, path))
    })
}
