//! Discovery statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by reconciliation passes.
#[derive(Debug, Default)]
pub struct DiscoveryStats {
    pub passes: AtomicU64,
    pub paths_reconciled: AtomicU64,
    pub entries_added: AtomicU64,
    pub entries_updated: AtomicU64,
    pub entries_removed: AtomicU64,
    pub metadata_failures: AtomicU64,
    pub scan_errors: AtomicU64,
}

impl DiscoveryStats {
    /// Create new stats tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get snapshot of current stats.
    #[must_use]
    pub fn snapshot(&self) -> DiscoveryStatsSnapshot {
        DiscoveryStatsSnapshot {
            passes: self.passes.load(Ordering::Relaxed),
            paths_reconciled: self.paths_reconciled.load(Ordering::Relaxed),
            entries_added: self.entries_added.load(Ordering::Relaxed),
            entries_updated: self.entries_updated.load(Ordering::Relaxed),
            entries_removed: self.entries_removed.load(Ordering::Relaxed),
            metadata_failures: self.metadata_failures.load(Ordering::Relaxed),
            scan_errors: self.scan_errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of discovery stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryStatsSnapshot {
    pub passes: u64,
    pub paths_reconciled: u64,
    pub entries_added: u64,
    pub entries_updated: u64,
    pub entries_removed: u64,
    pub metadata_failures: u64,
    pub scan_errors: u64,
}
