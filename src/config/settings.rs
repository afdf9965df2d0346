//! Configuration settings and validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::watcher::GlobPattern;
use crate::{Error, Result};

/// Default debounce window for file events, in milliseconds.
const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Main configuration for a discovery instance.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Workspace roots to track.
    pub roots: Vec<PathBuf>,

    /// Glob used for both watch registration and directory expansion.
    pub pattern: String,

    /// Globs excluded from the tracked set.
    pub exclude: Vec<String>,

    /// Debounce window for filesystem events.
    pub debounce_ms: u64,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines.
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            pattern: "**/*".to_string(),
            exclude: Vec::new(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl Config {
    /// Create a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file.
    ///
    /// Missing keys fall back to their defaults. The result is not validated;
    /// callers merge CLI overrides first and then call [`Config::validate`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| Error::config(format!("invalid config file {}: {e}", path.display())))
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.roots.is_empty() {
            return Err(Error::config("at least one workspace root is required"));
        }

        if self.roots.iter().any(|r| r.as_os_str().is_empty()) {
            return Err(Error::config("workspace roots cannot be empty paths"));
        }

        if self.pattern.trim().is_empty() {
            return Err(Error::config("pattern cannot be empty"));
        }

        // Compiles every glob, surfacing the first bad one.
        self.glob_pattern()?;

        if !(10..=60_000).contains(&self.debounce_ms) {
            return Err(Error::config(format!(
                "debounce_ms must be between 10 and 60000, got {}",
                self.debounce_ms
            )));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }

    /// Compile the configured include/exclude globs.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob is malformed.
    pub fn glob_pattern(&self) -> Result<GlobPattern> {
        GlobPattern::new(&self.pattern, &self.exclude)
    }

    /// Debounce window as a `Duration`.
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn valid() -> Config {
        Config {
            roots: vec![PathBuf::from("/ws")],
            pattern: "*.txt".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.roots.is_empty());
        assert_eq!(config.pattern, "**/*");
        assert_eq!(config.debounce(), Duration::from_millis(500));
        // No roots yet.
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_no_roots() {
        let config = Config {
            roots: Vec::new(),
            ..valid()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("workspace root"));
    }

    #[test]
    fn test_validate_empty_pattern() {
        let config = Config {
            pattern: "  ".to_string(),
            ..valid()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pattern"));
    }

    #[test]
    fn test_validate_bad_exclude_glob() {
        let config = Config {
            exclude: vec!["src/[".to_string()],
            ..valid()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("src/["));
    }

    #[test]
    fn test_validate_debounce_bounds() {
        let config = Config {
            debounce_ms: 0,
            ..valid()
        };
        assert!(config.validate().is_err());

        let config = Config {
            debounce_ms: 120_000,
            ..valid()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_level_case_insensitive() {
        for level in ["TRACE", "Debug", "INFO", "Warn", "ERROR"] {
            let config = Config {
                log_level: level.to_string(),
                ..valid()
            };
            assert!(
                config.validate().is_ok(),
                "Level '{level}' should be valid (case insensitive)"
            );
        }
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let config = Config {
            log_level: "loud".to_string(),
            ..valid()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log level"));
    }

    #[test]
    fn test_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pathscout.toml");
        std::fs::write(
            &path,
            "roots = [\"/ws\", \"/other\"]\npattern = \"**/*.rs\"\ndebounce_ms = 250\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.roots.len(), 2);
        assert_eq!(config.pattern, "**/*.rs");
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_rejects_unknown_keys() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pathscout.toml");
        std::fs::write(&path, "roots = [\"/ws\"]\nport = 8080\n").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_file_missing() {
        let err = Config::from_file("/nonexistent/pathscout.toml").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
