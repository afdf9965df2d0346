//! pathscout - incremental workspace file discovery
//!
//! Entry point for the `pathscout` command-line tool.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use pathscout::discovery::{DigestPolicy, Discovery, FileDigest};
use pathscout::observability::init_tracing;
use pathscout::watcher::NotifyWatcher;
use pathscout::Config;
use tokio::sync::mpsc;

/// Track the files of a workspace that match a glob, and keep tracking them
/// as they change.
#[derive(Parser, Debug)]
#[command(name = "pathscout")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "PATHSCOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Workspace roots to track
    #[arg(short, long, env = "PATHSCOUT_ROOTS", value_delimiter = ',')]
    root: Vec<PathBuf>,

    /// Glob selecting tracked files, relative to each root
    #[arg(short, long, env = "PATHSCOUT_PATTERN")]
    pattern: Option<String>,

    /// Globs to exclude
    #[arg(short, long, env = "PATHSCOUT_EXCLUDE", value_delimiter = ',')]
    exclude: Vec<String>,

    /// Debounce window for filesystem events, in milliseconds
    #[arg(long, env = "PATHSCOUT_DEBOUNCE_MS")]
    debounce_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "PATHSCOUT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging output
    #[arg(long, env = "PATHSCOUT_LOG_JSON")]
    log_json: bool,

    /// Largest file to hash, in bytes
    #[arg(long, env = "PATHSCOUT_MAX_BYTES", default_value = "16777216")]
    max_bytes: u64,

    /// Scan once, print the tracked set and exit
    #[arg(long)]
    once: bool,

    /// Print tracked entries as JSON instead of one path per line
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// Merge CLI flags over the config file (or defaults).
    fn into_config(self) -> anyhow::Result<(Config, Options)> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => Config::default(),
        };

        if !self.root.is_empty() {
            config.roots = self.root;
        }
        if let Some(pattern) = self.pattern {
            config.pattern = pattern;
        }
        if !self.exclude.is_empty() {
            config.exclude = self.exclude;
        }
        if let Some(debounce_ms) = self.debounce_ms {
            config.debounce_ms = debounce_ms;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        config.log_json |= self.log_json;

        let options = Options {
            max_bytes: self.max_bytes,
            once: self.once,
            json: self.json,
        };
        Ok((config, options))
    }
}

#[derive(Debug)]
struct Options {
    max_bytes: u64,
    once: bool,
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, options) = Cli::parse().into_config()?;

    init_tracing(&config.log_level, config.log_json);

    tracing::info!("pathscout v{} starting...", env!("CARGO_PKG_VERSION"));
    tracing::debug!(?config, "Configuration loaded");

    config.validate()?;
    let pattern = config.glob_pattern()?;
    let policy = DigestPolicy::new(options.max_bytes);

    if options.once {
        let discovery = Discovery::builder(policy, pattern)
            .roots(config.roots.clone())
            .build();
        discovery.initial_refresh().await?;
        print_tracked(&discovery, options.json)?;
        return Ok(());
    }

    let (event_tx, event_rx) = mpsc::channel(100);
    let watcher = NotifyWatcher::new(config.debounce(), event_tx)?;
    let discovery = Discovery::builder(policy, pattern)
        .roots(config.roots.clone())
        .watches(Box::new(watcher))
        .build();

    discovery.initial_refresh().await?;
    print_tracked(&discovery, options.json)?;

    let event_loop = discovery.spawn(event_rx);
    let mut changes = discovery.subscribe();

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("listening for Ctrl-C")?;
                tracing::info!("Interrupt received, shutting down");
                break;
            }
            alive = changes.changed() => {
                if !alive {
                    break;
                }
                let stats = discovery.stats();
                tracing::info!(
                    tracked = discovery.tracked_len(),
                    generation = changes.generation(),
                    passes = stats.passes,
                    "Tracked set updated"
                );
                if options.json {
                    print_tracked(&discovery, true)?;
                }
            }
        }
    }

    discovery.shutdown();
    event_loop.await.context("joining event loop")?;
    Ok(())
}

fn print_tracked(discovery: &Discovery<DigestPolicy>, json: bool) -> anyhow::Result<()> {
    let mut entries = discovery.get_tracked_paths();
    entries.sort_by(|a, b| a.path.cmp(&b.path));

    if json {
        println!("{}", serde_json::to_string(&entries)?);
    } else {
        for entry in &entries {
            let FileDigest { hash, size } = &entry.data;
            println!("{}\t{size}\t{}", &hash[..12], entry.path.display());
        }
    }
    Ok(())
}
