//! Caller-supplied relevance and metadata policy.

use std::io::Read;
use std::path::Path;

use blake3::Hasher;
use serde::Serialize;

use crate::error::WatcherError;
use crate::Result;

/// Decides which files are tracked and what data is kept for each.
///
/// The engine is generic over this trait; it is passed in by value and shared
/// across blocking worker threads, so implementations must be `Send + Sync`.
pub trait PathPolicy: Send + Sync + 'static {
    /// Metadata cached per tracked path.
    type Data: Clone + Send + Sync + 'static;

    /// Cheap predicate run for every candidate file, including every file
    /// found under an expanded directory.
    fn is_relevant(&self, path: &Path) -> bool;

    /// Compute the metadata for a file. Runs on a blocking thread.
    ///
    /// # Errors
    ///
    /// A failure leaves the path unindexed (or stale) until a later event
    /// retries it; it never aborts the reconciliation pass.
    fn compute_metadata(&self, path: &Path) -> Result<Self::Data>;

    /// Whether freshly computed data replaces the currently stored data.
    /// Must be side-effect free.
    fn should_replace(&self, new: &Self::Data, old: &Self::Data) -> bool;
}

/// Content digest of a tracked file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDigest {
    /// blake3 hash of the file contents, hex encoded.
    pub hash: String,
    /// Size in bytes.
    pub size: u64,
}

/// Tracks every matching file with a blake3 digest of its contents.
#[derive(Debug, Clone)]
pub struct DigestPolicy {
    max_bytes: u64,
}

impl Default for DigestPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 16 * 1024 * 1024,
        }
    }
}

impl DigestPolicy {
    /// Create a policy that refuses to hash files larger than `max_bytes`.
    #[must_use]
    pub const fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }
}

impl PathPolicy for DigestPolicy {
    type Data = FileDigest;

    fn is_relevant(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| !name.ends_with('~') && name != ".DS_Store")
    }

    fn compute_metadata(&self, path: &Path) -> Result<FileDigest> {
        let mut file = std::fs::File::open(path)?;
        let size = file.metadata()?.len();
        if size > self.max_bytes {
            return Err(WatcherError::process_failed(
                path,
                format!("file is {size} bytes, limit is {}", self.max_bytes),
            )
            .into());
        }

        let mut hasher = Hasher::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }

        Ok(FileDigest {
            hash: hasher.finalize().to_hex().to_string(),
            size,
        })
    }

    fn should_replace(&self, new: &FileDigest, old: &FileDigest) -> bool {
        new.hash != old.hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_digest_is_stable() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.txt");
        let b = tmp.path().join("b.txt");
        fs::write(&a, "hello").unwrap();
        fs::write(&b, "world").unwrap();

        let policy = DigestPolicy::default();
        let d1 = policy.compute_metadata(&a).unwrap();
        let d2 = policy.compute_metadata(&a).unwrap();
        let d3 = policy.compute_metadata(&b).unwrap();

        assert_eq!(d1, d2);
        assert_ne!(d1.hash, d3.hash);
        assert_eq!(d1.hash.len(), 64); // blake3 hex is 64 chars
        assert_eq!(d1.size, 5);
    }

    #[test]
    fn test_should_replace_only_on_content_change() {
        let policy = DigestPolicy::default();
        let old = FileDigest {
            hash: "aa".to_string(),
            size: 1,
        };
        let same = FileDigest {
            hash: "aa".to_string(),
            size: 2,
        };
        let changed = FileDigest {
            hash: "bb".to_string(),
            size: 1,
        };

        assert!(!policy.should_replace(&same, &old));
        assert!(policy.should_replace(&changed, &old));
    }

    #[test]
    fn test_oversized_file_fails() {
        let tmp = TempDir::new().unwrap();
        let big = tmp.path().join("big.bin");
        fs::write(&big, vec![0u8; 32]).unwrap();

        let err = DigestPolicy::new(16).compute_metadata(&big).unwrap_err();
        assert!(err.to_string().contains("limit is 16"));
    }

    #[test]
    fn test_missing_file_fails() {
        let policy = DigestPolicy::default();
        assert!(policy.compute_metadata(Path::new("/nonexistent/file")).is_err());
    }

    #[test]
    fn test_relevance_skips_editor_droppings() {
        let policy = DigestPolicy::default();
        assert!(policy.is_relevant(Path::new("/ws/notes.txt")));
        assert!(!policy.is_relevant(Path::new("/ws/notes.txt~")));
        assert!(!policy.is_relevant(Path::new("/ws/.DS_Store")));
    }
}
