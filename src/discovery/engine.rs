//! Reconciliation engine.
//!
//! A pass drains the pending set and brings the index in line with what is on
//! disk for each drained path:
//! - missing: drop the path and everything beneath it
//! - outside every active root: drop what beneath it no remaining root covers
//! - directory: enumerate the matching files beneath it, add or update each,
//!   and drop tracked entries beneath it that the listing no longer contains
//! - file: add or update it when relevant, drop it otherwise
//!
//! Files are always matched against the most specific root containing them.
//!
//! Passes are serialized per instance. Callers that request a pass while one
//! is running set a rerun flag and wait for the lock; the running holder picks
//! the flag up and runs once more, so a burst of requests costs at most one
//! extra pass.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::index::{PathIndex, TrackedEntry, Upsert};
use super::pending::PendingChangeSet;
use super::policy::PathPolicy;
use super::signal::{ChangeEmitter, IndexSubscription};
use super::stats::{DiscoveryStats, DiscoveryStatsSnapshot};
use crate::error::WatcherError;
use crate::watcher::{FileProbe, GlobPattern, Listing, LocalFs, NoopRegistry, WatchRegistry};
use crate::{Error, Result};

/// Totals for one `reconcile()` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Passes run by this call (0 when coalesced into another caller's pass).
    pub passes: usize,
    /// Pending paths reconciled.
    pub paths: usize,
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    /// Files whose metadata could not be computed.
    pub failed: usize,
}

impl PassReport {
    /// Whether the index was altered.
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.added + self.updated + self.removed > 0
    }

    fn absorb(&mut self, other: &Self) {
        self.passes += other.passes;
        self.paths += other.paths;
        self.added += other.added;
        self.updated += other.updated;
        self.removed += other.removed;
        self.failed += other.failed;
    }
}

/// What a pending path turned out to be.
enum Probed {
    Missing,
    OutsideRoots,
    Directory(Listing),
    File { root: PathBuf },
}

pub(super) struct Inner<P: PathPolicy> {
    pub(super) policy: Arc<P>,
    pub(super) pattern: GlobPattern,
    pub(super) probe: Arc<dyn FileProbe>,
    pub(super) roots: RwLock<Vec<PathBuf>>,
    pub(super) watches: Mutex<Box<dyn WatchRegistry>>,
    pub(super) pending: PendingChangeSet,
    pub(super) index: RwLock<PathIndex<P::Data>>,
    pub(super) emitter: ChangeEmitter,
    pub(super) stats: DiscoveryStats,
    pub(super) started: AtomicBool,
    pub(super) shutdown: CancellationToken,
    pass_lock: tokio::sync::Mutex<()>,
    rerun: AtomicBool,
    pass_counter: AtomicU64,
}

/// Incremental file discovery over a set of workspace roots.
///
/// Cloning is cheap; clones share the same index and pending set.
pub struct Discovery<P: PathPolicy> {
    pub(super) inner: Arc<Inner<P>>,
}

impl<P: PathPolicy> Clone for Discovery<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: PathPolicy> std::fmt::Debug for Discovery<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Discovery")
            .field("pattern", &self.inner.pattern)
            .field("roots", &*self.inner.roots.read())
            .field("tracked", &self.inner.index.read().len())
            .field("pending", &self.inner.pending.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Discovery`].
pub struct DiscoveryBuilder<P: PathPolicy> {
    policy: P,
    pattern: GlobPattern,
    roots: Vec<PathBuf>,
    watches: Box<dyn WatchRegistry>,
    probe: Arc<dyn FileProbe>,
}

impl<P: PathPolicy> DiscoveryBuilder<P> {
    /// Initial workspace roots.
    #[must_use]
    pub fn roots(mut self, roots: impl IntoIterator<Item = PathBuf>) -> Self {
        self.roots = roots.into_iter().collect();
        self
    }

    /// Change notification source. Defaults to [`NoopRegistry`].
    #[must_use]
    pub fn watches(mut self, watches: Box<dyn WatchRegistry>) -> Self {
        self.watches = watches;
        self
    }

    /// Filesystem probe. Defaults to [`LocalFs`].
    #[must_use]
    pub fn probe(mut self, probe: Arc<dyn FileProbe>) -> Self {
        self.probe = probe;
        self
    }

    #[must_use]
    pub fn build(self) -> Discovery<P> {
        let mut roots: Vec<PathBuf> = Vec::with_capacity(self.roots.len());
        for root in self.roots {
            if !roots.contains(&root) {
                roots.push(root);
            }
        }

        Discovery {
            inner: Arc::new(Inner {
                policy: Arc::new(self.policy),
                pattern: self.pattern,
                probe: self.probe,
                roots: RwLock::new(roots),
                watches: Mutex::new(self.watches),
                pending: PendingChangeSet::new(),
                index: RwLock::new(PathIndex::new()),
                emitter: ChangeEmitter::new(),
                stats: DiscoveryStats::new(),
                started: AtomicBool::new(false),
                shutdown: CancellationToken::new(),
                pass_lock: tokio::sync::Mutex::new(()),
                rerun: AtomicBool::new(false),
                pass_counter: AtomicU64::new(0),
            }),
        }
    }
}

impl<P: PathPolicy> Discovery<P> {
    /// Start building a discovery instance.
    pub fn builder(policy: P, pattern: GlobPattern) -> DiscoveryBuilder<P> {
        DiscoveryBuilder {
            policy,
            pattern,
            roots: Vec::new(),
            watches: Box::new(NoopRegistry),
            probe: Arc::new(LocalFs::new()),
        }
    }

    /// Snapshot of every tracked entry.
    #[must_use]
    pub fn get_tracked_paths(&self) -> Vec<TrackedEntry<P::Data>> {
        self.inner.index.read().snapshot()
    }

    /// Metadata tracked for exactly `path`.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<P::Data> {
        self.inner.index.read().get(path).cloned()
    }

    /// Number of tracked entries.
    #[must_use]
    pub fn tracked_len(&self) -> usize {
        self.inner.index.read().len()
    }

    /// Number of paths waiting for the next pass.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.inner.pending.len()
    }

    /// The glob used for watching and directory expansion.
    #[must_use]
    pub fn pattern(&self) -> &GlobPattern {
        &self.inner.pattern
    }

    /// Subscribe to "index changed" signals.
    #[must_use]
    pub fn subscribe(&self) -> IndexSubscription {
        self.inner.emitter.subscribe()
    }

    /// Number of passes so far that changed the index.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.emitter.generation()
    }

    #[must_use]
    pub fn stats(&self) -> DiscoveryStatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Queue a path for the next pass without running one.
    pub fn notify_path(&self, path: impl Into<PathBuf>) {
        self.inner.pending.add(path);
    }

    /// Queue changed paths and reconcile.
    ///
    /// # Errors
    ///
    /// See [`Discovery::reconcile`].
    pub async fn paths_changed(
        &self,
        paths: impl IntoIterator<Item = PathBuf>,
    ) -> Result<PassReport> {
        self.inner.pending.extend(paths);
        self.reconcile().await
    }

    /// Run reconciliation until everything pending at call time is processed.
    ///
    /// If a pass is already running this waits for it, then for follow-up
    /// passes until no caller has requested another; under a steady stream
    /// of requests that can be several passes. After
    /// [`Discovery::shutdown`] no new pass starts and an empty report is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns the first subtree enumeration failure. The pass still runs
    /// to completion and signals any change before the error is returned;
    /// per-file metadata failures are only counted in the report.
    pub async fn reconcile(&self) -> Result<PassReport> {
        let inner = &self.inner;
        if inner.shutdown.is_cancelled() {
            tracing::debug!("Discovery shut down, skipping reconciliation");
            return Ok(PassReport::default());
        }

        inner.rerun.store(true, Ordering::SeqCst);
        let _guard = inner.pass_lock.lock().await;

        let mut report = PassReport::default();
        let mut first_error = None;
        while inner.rerun.swap(false, Ordering::SeqCst) {
            let (pass, error) = self.run_pass().await;
            report.absorb(&pass);
            if first_error.is_none() {
                first_error = error;
            }
        }

        first_error.map_or(Ok(report), Err)
    }

    async fn run_pass(&self) -> (PassReport, Option<Error>) {
        let inner = &self.inner;
        let pass = inner.pass_counter.fetch_add(1, Ordering::Relaxed) + 1;

        async move {
            let work: Vec<PathBuf> = inner.pending.drain().collect();
            let mut report = PassReport {
                passes: 1,
                paths: work.len(),
                ..PassReport::default()
            };
            let mut first_error = None;

            for path in work {
                if let Err(e) = self.reconcile_path(&path, &mut report).await {
                    tracing::error!(path = %path.display(), error = %e, "Reconciliation failed");
                    inner.stats.scan_errors.fetch_add(1, Ordering::Relaxed);
                    first_error.get_or_insert(e);
                }
            }

            inner.stats.passes.fetch_add(1, Ordering::Relaxed);
            inner
                .stats
                .paths_reconciled
                .fetch_add(report.paths as u64, Ordering::Relaxed);

            if report.changed() {
                inner.emitter.emit();
                tracing::info!(
                    added = report.added,
                    updated = report.updated,
                    removed = report.removed,
                    failed = report.failed,
                    tracked = inner.index.read().len(),
                    "Index changed"
                );
            } else if report.paths > 0 {
                tracing::debug!(paths = report.paths, "Pass made no changes");
            }

            (report, first_error)
        }
        .instrument(tracing::info_span!("reconcile", pass))
        .await
    }

    async fn reconcile_path(&self, path: &Path, report: &mut PassReport) -> Result<()> {
        match self.probe_path(path).await? {
            Probed::Missing => {
                let removed = self.inner.index.write().remove_under(path);
                if removed > 0 {
                    tracing::debug!(path = %path.display(), removed, "Removed tracked paths");
                }
                self.count_removed(report, removed);
            }
            Probed::OutsideRoots => {
                // A removed root may still contain active ones.
                let roots = self.roots();
                let probe = &self.inner.probe;
                let removed = self.inner.index.write().remove_under_where(path, |p| {
                    !roots.iter().any(|root| probe.path_is_under_root(root, p))
                });
                if removed > 0 {
                    tracing::debug!(path = %path.display(), removed, "Dropped paths outside roots");
                }
                self.count_removed(report, removed);
            }
            Probed::Directory(listing) => {
                let complete = listing.is_complete();
                let mut keep = HashSet::with_capacity(listing.files.len());
                for file in listing.files {
                    if self.inner.policy.is_relevant(&file) {
                        self.add_or_update(&file, report).await;
                        keep.insert(file);
                    }
                }

                // Unreadable parts of the subtree keep their last known entries.
                if !complete {
                    let reason = listing.errors.join("; ");
                    return Err(WatcherError::scan_failed(path, reason).into());
                }

                // Entries under the directory that vanished without their own
                // event are reconciled here.
                let removed = self.inner.index.write().retain_under(path, &keep);
                if removed > 0 {
                    tracing::debug!(dir = %path.display(), removed, "Dropped entries missing from listing");
                }
                self.count_removed(report, removed);
            }
            Probed::File { root } => {
                if self.inner.pattern.matches_in(&root, path) && self.inner.policy.is_relevant(path) {
                    self.add_or_update(path, report).await;
                } else {
                    let removed = self.inner.index.write().remove_under(path);
                    self.count_removed(report, removed);
                }
            }
        }
        Ok(())
    }

    /// Classify `path` on a blocking thread, listing it if it is a directory.
    async fn probe_path(&self, path: &Path) -> Result<Probed> {
        let root = self.root_for(path);
        let probe = Arc::clone(&self.inner.probe);
        let pattern = self.inner.pattern.clone();
        let roots = self.roots();
        let target = path.to_path_buf();

        blocking(move || {
            if !probe.path_exists(&target) {
                return Ok(Probed::Missing);
            }
            let Some(root) = root else {
                return Ok(Probed::OutsideRoots);
            };
            if !probe.is_directory(&target) {
                return Ok(Probed::File { root });
            }
            match probe.list_files(&roots, &target, &pattern) {
                Ok(listing) => Ok(Probed::Directory(listing)),
                // Deleted between the two checks.
                Err(_) if !probe.path_exists(&target) => Ok(Probed::Missing),
                Err(e) => Err(e),
            }
        })
        .await?
    }

    /// Most specific active root containing `path`.
    fn root_for(&self, path: &Path) -> Option<PathBuf> {
        let probe = &self.inner.probe;
        self.inner
            .roots
            .read()
            .iter()
            .filter(|root| probe.path_is_under_root(root, path))
            .max_by_key(|root| root.components().count())
            .cloned()
    }

    async fn add_or_update(&self, path: &Path, report: &mut PassReport) {
        let policy = Arc::clone(&self.inner.policy);
        let target = path.to_path_buf();

        let data = match blocking(move || policy.compute_metadata(&target)).await {
            Ok(Ok(data)) => data,
            Ok(Err(e)) | Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Metadata computation failed");
                self.inner
                    .stats
                    .metadata_failures
                    .fetch_add(1, Ordering::Relaxed);
                report.failed += 1;
                return;
            }
        };

        let policy = &self.inner.policy;
        let outcome = self
            .inner
            .index
            .write()
            .upsert(path.to_path_buf(), data, |new, old| policy.should_replace(new, old));

        match outcome {
            Upsert::Added => {
                report.added += 1;
                self.inner.stats.entries_added.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(path = %path.display(), "Tracking new path");
            }
            Upsert::Replaced => {
                report.updated += 1;
                self.inner.stats.entries_updated.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(path = %path.display(), "Updated tracked path");
            }
            Upsert::Unchanged => {}
        }
    }

    fn count_removed(&self, report: &mut PassReport, removed: usize) {
        report.removed += removed;
        self.inner
            .stats
            .entries_removed
            .fetch_add(removed as u64, Ordering::Relaxed);
    }
}

/// Run blocking filesystem work off the async runtime.
async fn blocking<F, R>(f: F) -> Result<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::internal(format!("blocking task failed: {e}")))
}
