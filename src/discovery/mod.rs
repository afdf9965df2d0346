//! Incremental discovery of workspace files.
//!
//! Change notifications only ever land in the pending set; the index is
//! mutated exclusively by reconciliation passes, which run one at a time.

mod engine;
mod index;
mod pending;
mod policy;
mod roots;
mod service;
mod signal;
mod stats;

pub use engine::{Discovery, DiscoveryBuilder, PassReport};
pub use index::{PathIndex, TrackedEntry, Upsert};
pub use pending::{Drain, PendingChangeSet};
pub use policy::{DigestPolicy, FileDigest, PathPolicy};
pub use signal::IndexSubscription;
pub use stats::{DiscoveryStats, DiscoveryStatsSnapshot};
