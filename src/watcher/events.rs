//! Change events delivered to the discovery engine.

#![allow(clippy::missing_const_for_fn)]

use std::path::PathBuf;

/// Events consumed by the discovery event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// Files or directories were created, modified or deleted.
    PathsChanged(Vec<PathBuf>),
    /// Workspace roots were added or removed.
    RootsChanged {
        added: Vec<PathBuf>,
        removed: Vec<PathBuf>,
    },
}

impl ChangeEvent {
    /// Convenience constructor for a single changed path.
    #[must_use]
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::PathsChanged(vec![path.into()])
    }
}

/// Deduplicated batch of changed paths collected from one debounce window.
///
/// Whether a path was created, modified or deleted is deliberately not
/// recorded: the engine re-checks the filesystem when it reconciles.
#[derive(Debug, Default)]
pub struct EventBatch {
    paths: Vec<PathBuf>,
}

impl EventBatch {
    /// Create a new empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a path, ignoring duplicates.
    pub fn add(&mut self, path: PathBuf) {
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    /// Keep only paths matching `keep`.
    pub fn retain(&mut self, keep: impl FnMut(&PathBuf) -> bool) {
        self.paths.retain(keep);
    }

    /// Check if batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Number of distinct paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Convert into an event for the discovery loop.
    #[must_use]
    pub fn into_event(self) -> ChangeEvent {
        ChangeEvent::PathsChanged(self.paths)
    }
}
