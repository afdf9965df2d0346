//! Change notification source and filesystem access.
//!
//! This module provides:
//! - Glob matching for tracked paths
//! - Subtree enumeration and existence probes
//! - Directory watching using notify-rs

mod events;
mod filter;
mod scanner;
#[allow(clippy::module_inception)]
mod watcher;

pub use events::{ChangeEvent, EventBatch};
pub use filter::{containing_root, GlobPattern};
pub use scanner::{FileProbe, Listing, LocalFs, ScanStats, ScanStatsSnapshot};
pub use watcher::{NoopRegistry, NotifyWatcher, WatchRegistry};
