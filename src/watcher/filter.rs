//! Glob pattern matching for tracked paths.
//!
//! Patterns are matched against the path relative to the workspace root that
//! contains it, so `*.txt` matches `sub/b.txt` and `src/**/*.rs` only matches
//! sources under the root's own `src` directory.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::{Error, Result};

/// Directory names that are never descended into or tracked.
const DEFAULT_IGNORED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "target",
    "__pycache__",
    ".venv",
];

/// Compiled include/exclude globs.
#[derive(Clone)]
pub struct GlobPattern {
    raw: String,
    include: GlobSet,
    exclude: GlobSet,
}

impl fmt::Debug for GlobPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobPattern")
            .field("raw", &self.raw)
            .field("excludes", &self.exclude.len())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for GlobPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl GlobPattern {
    /// Compile an include glob plus any number of exclude globs.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first malformed glob.
    pub fn new(include: &str, exclude: &[String]) -> Result<Self> {
        let include_set = build_set(std::iter::once(include))?;
        let exclude_set = build_set(exclude.iter().map(String::as_str))?;

        Ok(Self {
            raw: include.to_string(),
            include: include_set,
            exclude: exclude_set,
        })
    }

    /// Compile a single include glob with no excludes.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the glob is malformed.
    pub fn include(include: &str) -> Result<Self> {
        Self::new(include, &[])
    }

    /// The include glob as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Check a path relative to its workspace root.
    #[must_use]
    pub fn matches(&self, rel_path: &Path) -> bool {
        if has_ignored_component(rel_path) {
            return false;
        }
        self.include.is_match(rel_path) && !self.exclude.is_match(rel_path)
    }

    /// Check an absolute path against the root that contains it.
    ///
    /// Returns `false` when `path` is not under `root`.
    #[must_use]
    pub fn matches_in(&self, root: &Path, path: &Path) -> bool {
        path.strip_prefix(root)
            .is_ok_and(|rel| !rel.as_os_str().is_empty() && self.matches(rel))
    }

    /// Check an absolute path against the most specific of `roots` that
    /// contains it.
    ///
    /// With nested roots this gives every file one answer, whichever root's
    /// subtree it was reached through.
    #[must_use]
    pub fn matches_among(&self, roots: &[PathBuf], path: &Path) -> bool {
        containing_root(roots, path).is_some_and(|root| self.matches_in(root, path))
    }

    /// Whether a directory (relative to its root) should be skipped entirely
    /// during enumeration.
    #[must_use]
    pub fn prunes_dir(&self, rel_dir: &Path) -> bool {
        has_ignored_component(rel_dir) || self.exclude.is_match(rel_dir)
    }
}

/// Most specific entry of `roots` that `path` equals or lies beneath.
#[must_use]
pub fn containing_root<'a>(roots: &'a [PathBuf], path: &Path) -> Option<&'a Path> {
    roots
        .iter()
        .filter(|root| path.starts_with(root))
        .max_by_key(|root| root.components().count())
        .map(PathBuf::as_path)
}

fn build_set<'a>(globs: impl Iterator<Item = &'a str>) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for glob in globs {
        let compiled = Glob::new(glob)
            .map_err(|e| Error::config(format!("invalid glob '{glob}': {e}")))?;
        builder.add(compiled);
    }
    builder
        .build()
        .map_err(|e| Error::config(format!("failed to build glob set: {e}")))
}

fn has_ignored_component(path: &Path) -> bool {
    path.components().any(|c| match c {
        Component::Normal(name) => name
            .to_str()
            .is_some_and(|n| DEFAULT_IGNORED_DIRS.contains(&n)),
        _ => false,
    })
}
