//! Deduplicating buffer of paths awaiting reconciliation.

use std::collections::HashSet;
use std::path::PathBuf;

use parking_lot::Mutex;

/// Set of paths that changed since the last reconciliation pass.
///
/// Producers may add concurrently with a drain in progress; a path added while
/// draining is either yielded by that drain or left for the next one, never lost.
#[derive(Debug, Default)]
pub struct PendingChangeSet {
    paths: Mutex<HashSet<PathBuf>>,
}

impl PendingChangeSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a path. Returns `false` if it was already pending.
    pub fn add(&self, path: impl Into<PathBuf>) -> bool {
        self.paths.lock().insert(path.into())
    }

    /// Add many paths at once.
    pub fn extend(&self, paths: impl IntoIterator<Item = PathBuf>) {
        self.paths.lock().extend(paths);
    }

    /// Remove and return an arbitrary pending path.
    pub fn pop(&self) -> Option<PathBuf> {
        let mut paths = self.paths.lock();
        let next = paths.iter().next().cloned()?;
        paths.remove(&next);
        Some(next)
    }

    /// Lazily drain the set, removing each path as it is yielded.
    pub fn drain(&self) -> Drain<'_> {
        Drain { set: self }
    }

    /// Number of pending paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.lock().len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.lock().is_empty()
    }
}

/// Iterator returned by [`PendingChangeSet::drain`].
#[derive(Debug)]
pub struct Drain<'a> {
    set: &'a PendingChangeSet,
}

impl Iterator for Drain<'_> {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        self.set.pop()
    }
}
