//! Configuration management for pathscout.
//!
//! Supports configuration from:
//! - Command-line arguments (highest priority)
//! - Environment variables
//! - Configuration file (lowest priority)

mod settings;

pub use settings::Config;
