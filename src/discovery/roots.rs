//! Workspace roots, watch registration and the initial scan.

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use super::engine::{Discovery, PassReport};
use super::policy::PathPolicy;
use crate::{Error, Result};

impl<P: PathPolicy> Discovery<P> {
    /// Currently active workspace roots.
    #[must_use]
    pub fn roots(&self) -> Vec<PathBuf> {
        self.inner.roots.read().clone()
    }

    /// Scan every root and start watching. Must be called exactly once.
    ///
    /// The roots are queued as ordinary pending paths, so the initial scan
    /// runs through the same directory-expansion code as later updates.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no roots or if refresh already ran.
    /// Watch registration and enumeration failures are returned after the
    /// scan has run, so the index holds whatever could be read.
    pub async fn initial_refresh(&self) -> Result<PassReport> {
        let roots = self.roots();
        if roots.is_empty() {
            return Err(Error::config("no workspace roots configured"));
        }
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(Error::internal("initial refresh already performed"));
        }

        tracing::info!(
            roots = roots.len(),
            pattern = %self.inner.pattern,
            "Starting initial scan"
        );

        self.inner.pending.extend(roots);
        let watched = self.register_watches();

        let report = self.reconcile().await;
        tracing::info!(
            tracked = self.tracked_len(),
            failed = report.as_ref().map_or(0, |r| r.failed),
            "Initial scan complete"
        );
        watched?;
        report
    }

    /// Apply a workspace root change and reconcile.
    ///
    /// Only the changed root paths themselves are queued: an added root is
    /// expanded like a new directory, a removed one is dropped like a deleted
    /// directory. Watches are rebuilt from the full active root set.
    ///
    /// # Errors
    ///
    /// Returns the first watch registration or enumeration failure, after
    /// the reconciliation has run.
    pub async fn roots_changed(
        &self,
        added: Vec<PathBuf>,
        removed: Vec<PathBuf>,
    ) -> Result<PassReport> {
        self.apply_root_change(added, removed);
        let watched = self.register_watches();
        let report = self.reconcile().await;
        watched?;
        report
    }

    /// Update the root list and queue the changed roots.
    pub(super) fn apply_root_change(&self, added: Vec<PathBuf>, removed: Vec<PathBuf>) {
        {
            let mut roots = self.inner.roots.write();
            roots.retain(|r| !removed.contains(r));
            for root in &added {
                if !roots.contains(root) {
                    roots.push(root.clone());
                }
            }
        }

        tracing::info!(
            added = added.len(),
            removed = removed.len(),
            "Workspace roots changed"
        );
        self.inner.pending.extend(added.into_iter().chain(removed));
    }

    /// Drop every watch and register one per active root.
    pub(super) fn register_watches(&self) -> Result<()> {
        let roots = self.roots();
        let pattern = &self.inner.pattern;
        let mut watches = self.inner.watches.lock();
        watches.clear_all()?;

        let mut first_error = None;
        for root in &roots {
            let registered = watches
                .register(root, pattern)
                .and_then(|()| watches.register_existence(root));
            if let Err(e) = registered {
                tracing::warn!(root = %root.display(), error = %e, "Failed to watch root");
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::DigestPolicy;
    use crate::watcher::GlobPattern;
    use std::fs;
    use tempfile::TempDir;

    fn discovery(roots: Vec<PathBuf>) -> Discovery<DigestPolicy> {
        Discovery::builder(DigestPolicy::default(), GlobPattern::include("*.txt").unwrap())
            .roots(roots)
            .build()
    }

    #[tokio::test]
    async fn test_initial_refresh_requires_roots() {
        let d = discovery(Vec::new());
        let err = d.initial_refresh().await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_initial_refresh_runs_once() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "a").unwrap();

        let d = discovery(vec![tmp.path().to_path_buf()]);
        let report = d.initial_refresh().await.unwrap();
        assert_eq!(report.added, 1);

        let err = d.initial_refresh().await.unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[tokio::test]
    async fn test_builder_dedups_roots() {
        let d = discovery(vec![PathBuf::from("/ws"), PathBuf::from("/ws")]);
        assert_eq!(d.roots(), vec![PathBuf::from("/ws")]);
    }

    #[tokio::test]
    async fn test_add_and_remove_root() {
        let tmp = TempDir::new().unwrap();
        let one = tmp.path().join("one");
        let two = tmp.path().join("two");
        fs::create_dir(&one).unwrap();
        fs::create_dir(&two).unwrap();
        fs::write(one.join("a.txt"), "a").unwrap();
        fs::write(two.join("b.txt"), "b").unwrap();

        let d = discovery(vec![one.clone()]);
        d.initial_refresh().await.unwrap();
        assert_eq!(d.tracked_len(), 1);

        let report = d.roots_changed(vec![two.clone()], Vec::new()).await.unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(d.roots(), vec![one.clone(), two.clone()]);

        // Still on disk, but no longer a root.
        let report = d.roots_changed(Vec::new(), vec![one.clone()]).await.unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(d.roots(), vec![two.clone()]);
        assert!(d.get(&two.join("b.txt")).is_some());
        assert!(d.get(&one.join("a.txt")).is_none());
    }

    #[tokio::test]
    async fn test_removing_outer_root_keeps_inner_entries() {
        let tmp = TempDir::new().unwrap();
        let outer = tmp.path().join("ws");
        let inner = outer.join("inner");
        fs::create_dir_all(&inner).unwrap();
        fs::write(outer.join("top.txt"), "t").unwrap();
        fs::write(inner.join("a.txt"), "a").unwrap();

        let d = discovery(vec![outer.clone(), inner.clone()]);
        d.initial_refresh().await.unwrap();
        assert_eq!(d.tracked_len(), 2);

        let report = d.roots_changed(Vec::new(), vec![outer.clone()]).await.unwrap();

        assert_eq!(report.removed, 1);
        assert_eq!(d.roots(), vec![inner.clone()]);
        assert!(d.get(&outer.join("top.txt")).is_none());
        assert!(d.get(&inner.join("a.txt")).is_some());
    }

    #[tokio::test]
    async fn test_nested_roots_agree_on_matches() {
        let tmp = TempDir::new().unwrap();
        let outer = tmp.path().join("ws");
        let inner = outer.join("inner");
        fs::create_dir_all(&inner).unwrap();
        fs::create_dir_all(outer.join("other")).unwrap();
        fs::write(outer.join("a.txt"), "a").unwrap();
        fs::write(inner.join("a.txt"), "a").unwrap();
        fs::write(outer.join("other/a.txt"), "a").unwrap();

        // "a.txt" names a file directly under whichever root holds it.
        let d = Discovery::builder(DigestPolicy::default(), GlobPattern::include("a.txt").unwrap())
            .roots([outer.clone(), inner.clone()])
            .build();
        d.initial_refresh().await.unwrap();

        let expected = vec![outer.join("a.txt"), inner.join("a.txt")];
        let tracked = |d: &Discovery<DigestPolicy>| {
            let mut paths: Vec<PathBuf> = d.get_tracked_paths().into_iter().map(|e| e.path).collect();
            paths.sort();
            paths
        };
        assert_eq!(tracked(&d), expected);

        // Reaching the same files through other events changes nothing.
        for path in [inner.join("a.txt"), outer.clone(), inner.clone(), outer.join("other/a.txt")] {
            let report = d.paths_changed([path]).await.unwrap();
            assert!(!report.changed());
        }
        assert_eq!(tracked(&d), expected);
    }

    #[tokio::test]
    async fn test_removing_nested_root_keeps_outer_entries() {
        let tmp = TempDir::new().unwrap();
        let outer = tmp.path().to_path_buf();
        let inner = outer.join("inner");
        fs::create_dir(&inner).unwrap();
        fs::write(inner.join("a.txt"), "a").unwrap();

        let d = discovery(vec![outer, inner.clone()]);
        d.initial_refresh().await.unwrap();
        assert_eq!(d.tracked_len(), 1);

        let report = d.roots_changed(Vec::new(), vec![inner.clone()]).await.unwrap();
        assert!(!report.changed());
        assert!(d.get(&inner.join("a.txt")).is_some());
    }
}
