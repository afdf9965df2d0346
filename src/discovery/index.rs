//! In-memory index of tracked paths.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;

/// A tracked file and its cached metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedEntry<T> {
    pub path: PathBuf,
    pub data: T,
}

/// Result of [`PathIndex::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// New entry appended.
    Added,
    /// Existing entry overwritten in place.
    Replaced,
    /// Existing entry kept; the overwrite policy declined.
    Unchanged,
}

/// Append-ordered entries with at most one entry per path.
///
/// Lookups go through a position map; removals re-index the entries after
/// the first removed one.
#[derive(Debug)]
pub struct PathIndex<T> {
    entries: Vec<TrackedEntry<T>>,
    positions: HashMap<PathBuf, usize>,
}

impl<T> Default for PathIndex<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<T> PathIndex<T> {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Metadata stored for exactly `path`.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&T> {
        self.positions.get(path).map(|&i| &self.entries[i].data)
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.positions.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedEntry<T>> {
        self.entries.iter()
    }

    /// Insert `data` for `path`, or overwrite the existing entry in place when
    /// `should_replace(new, old)` agrees.
    pub fn upsert(
        &mut self,
        path: PathBuf,
        data: T,
        should_replace: impl FnOnce(&T, &T) -> bool,
    ) -> Upsert {
        if let Some(&i) = self.positions.get(&path) {
            let entry = &mut self.entries[i];
            if should_replace(&data, &entry.data) {
                entry.data = data;
                return Upsert::Replaced;
            }
            return Upsert::Unchanged;
        }

        self.positions.insert(path.clone(), self.entries.len());
        self.entries.push(TrackedEntry { path, data });
        Upsert::Added
    }

    /// Remove every entry equal to or nested under `prefix`.
    ///
    /// Containment is per path component: removing `/a` drops `/a/b` but
    /// keeps `/ab`.
    pub fn remove_under(&mut self, prefix: &Path) -> usize {
        self.remove_where(|p| p.starts_with(prefix))
    }

    /// Remove entries nested under `dir` whose paths are not in `keep`.
    pub fn retain_under(&mut self, dir: &Path, keep: &HashSet<PathBuf>) -> usize {
        self.remove_where(|p| p.starts_with(dir) && !keep.contains(p))
    }

    /// Remove entries under `prefix` for which `doomed` holds.
    pub fn remove_under_where(&mut self, prefix: &Path, doomed: impl Fn(&Path) -> bool) -> usize {
        self.remove_where(|p| p.starts_with(prefix) && doomed(p))
    }

    /// Positions before the first removed entry are untouched, so only the
    /// tail is re-indexed.
    fn remove_where(&mut self, doomed: impl Fn(&Path) -> bool) -> usize {
        let Some(first) = self.entries.iter().position(|e| doomed(&e.path)) else {
            return 0;
        };

        let tail = self.entries.split_off(first);
        let mut removed = 0;
        for entry in tail {
            if doomed(&entry.path) {
                self.positions.remove(&entry.path);
                removed += 1;
            } else {
                self.positions.insert(entry.path.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
        removed
    }
}

impl<T: Clone> PathIndex<T> {
    /// Copy of every entry, in index order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<TrackedEntry<T>> {
        self.entries.clone()
    }
}
