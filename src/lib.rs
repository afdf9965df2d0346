//! pathscout
//!
//! Incrementally discovers the files in a multi-root workspace that match a
//! glob and a caller-supplied policy, and keeps an in-memory index of them
//! (plus per-file metadata) current as the filesystem changes.
//!
//! ```no_run
//! use pathscout::discovery::{DigestPolicy, Discovery};
//! use pathscout::watcher::{GlobPattern, NotifyWatcher};
//! use std::path::PathBuf;
//! use std::time::Duration;
//!
//! # async fn demo() -> pathscout::Result<()> {
//! let (tx, rx) = tokio::sync::mpsc::channel(100);
//! let watcher = NotifyWatcher::new(Duration::from_millis(500), tx)?;
//!
//! let discovery = Discovery::builder(DigestPolicy::default(), GlobPattern::include("**/*.rs")?)
//!     .roots([PathBuf::from("/path/to/workspace")])
//!     .watches(Box::new(watcher))
//!     .build();
//!
//! discovery.initial_refresh().await?;
//! let _loop = discovery.spawn(rx);
//!
//! let mut changes = discovery.subscribe();
//! while changes.changed().await {
//!     println!("{} files tracked", discovery.tracked_len());
//! }
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod discovery;
pub mod error;
pub mod observability;
pub mod watcher;

pub use config::Config;
pub use error::{Error, Result};
