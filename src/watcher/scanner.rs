//! Filesystem probing and subtree enumeration.
//!
//! Everything here is synchronous; the discovery engine calls into it through
//! `tokio::task::spawn_blocking`.

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use ignore::WalkBuilder;

use super::filter::{containing_root, GlobPattern};
use crate::error::WatcherError;
use crate::Result;

/// Read-only view of the filesystem used during reconciliation.
pub trait FileProbe: Send + Sync + Debug {
    /// Whether anything exists at `path`.
    fn path_exists(&self, path: &Path) -> bool;

    /// Whether `path` is an existing directory.
    fn is_directory(&self, path: &Path) -> bool;

    /// Whether `path` is `root` itself or nested beneath it.
    fn path_is_under_root(&self, root: &Path, path: &Path) -> bool {
        path.starts_with(root)
    }

    /// List files under `dir` matching `pattern`, each judged against the
    /// most specific of `roots` containing it. Never walks outside `dir`.
    ///
    /// Failures below `dir` do not abort the walk; they are collected in
    /// [`Listing::errors`].
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` itself cannot be read.
    fn list_files(&self, roots: &[PathBuf], dir: &Path, pattern: &GlobPattern) -> Result<Listing>;
}

/// Files found by [`FileProbe::list_files`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Matching files.
    pub files: Vec<PathBuf>,
    /// Walk errors below the listed directory. When non-empty, `files` may
    /// be missing entries from the parts that could not be read.
    pub errors: Vec<String>,
}

impl Listing {
    /// Whether every part of the subtree was read.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Scan statistics.
#[derive(Debug, Default)]
pub struct ScanStats {
    pub files_found: AtomicU64,
    pub files_matched: AtomicU64,
    pub errors: AtomicU64,
}

impl ScanStats {
    /// Create new stats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of current stats.
    #[must_use]
    pub fn snapshot(&self) -> ScanStatsSnapshot {
        ScanStatsSnapshot {
            files_found: self.files_found.load(Ordering::Relaxed),
            files_matched: self.files_matched.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of scan stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStatsSnapshot {
    pub files_found: u64,
    pub files_matched: u64,
    pub errors: u64,
}

/// [`FileProbe`] backed by the local filesystem.
#[derive(Debug, Default)]
pub struct LocalFs {
    stats: ScanStats,
}

impl LocalFs {
    /// Create a new local filesystem probe.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cumulative enumeration statistics.
    #[must_use]
    pub fn stats(&self) -> ScanStatsSnapshot {
        self.stats.snapshot()
    }
}

impl FileProbe for LocalFs {
    fn path_exists(&self, path: &Path) -> bool {
        // Dangling symlinks count as present; they are classified as files
        // and fail relevance or metadata later.
        path.symlink_metadata().is_ok()
    }

    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_files(&self, roots: &[PathBuf], dir: &Path, pattern: &GlobPattern) -> Result<Listing> {
        // Surface an unreadable scan root instead of returning an empty listing,
        // which the engine would treat as "every tracked file here is gone".
        std::fs::read_dir(dir).map_err(|e| WatcherError::scan_failed(dir, e))?;

        tracing::debug!(dir = %dir.display(), pattern = %pattern, "Enumerating subtree");

        let prune_roots = roots.to_vec();
        let prune_pattern = pattern.clone();
        let walker = WalkBuilder::new(dir)
            .standard_filters(false)
            .follow_links(false)
            .filter_entry(move |entry| {
                if entry.depth() == 0 || !entry.file_type().is_some_and(|t| t.is_dir()) {
                    return true;
                }
                let path = entry.path();
                containing_root(&prune_roots, path)
                    .and_then(|root| path.strip_prefix(root).ok())
                    .map_or(true, |rel| !prune_pattern.prunes_dir(rel))
            })
            .build();

        let mut listing = Listing::default();
        for entry in walker {
            match entry {
                Ok(entry) => {
                    if !entry.file_type().is_some_and(|t| t.is_file()) {
                        continue;
                    }
                    self.stats.files_found.fetch_add(1, Ordering::Relaxed);

                    if pattern.matches_among(roots, entry.path()) {
                        self.stats.files_matched.fetch_add(1, Ordering::Relaxed);
                        listing.files.push(entry.into_path());
                    }
                }
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "Error walking directory");
                    self.stats.errors.fetch_add(1, Ordering::Relaxed);
                    listing.errors.push(e.to_string());
                }
            }
        }

        Ok(listing)
    }
}
