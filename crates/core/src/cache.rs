//! Persistence for [`ProvenanceSummary`] between runs.
//!
//! The summary is stored as a single JSON document. A document that is
//! missing, unreadable or of the wrong shape loads as `None`; callers then
//! fall back to a crawl.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::errors::CacheError;
use crate::models::ProvenanceSummary;

/// Where the provenance summary lives between runs.
pub trait CacheStore: Send {
    /// The stored summary, or `None` if absent or unusable.
    fn load(&self) -> Option<ProvenanceSummary>;

    /// Replace the stored summary. Last writer wins.
    fn save(&self, summary: &ProvenanceSummary) -> Result<(), CacheError>;

    /// Remove the stored summary.
    fn clear(&self) -> Result<(), CacheError>;
}

/// A cached summary is fresh when it was computed at the repository's
/// current HEAD and for the same repository path.
pub fn is_fresh(cached: &ProvenanceSummary, live_head: &str, live_path: &str) -> bool {
    !cached.head_commit.is_empty() && cached.head_commit == live_head && cached.path == live_path
}

/// Whether a fresh cached summary may replace the working one.
///
/// Only a strictly earlier first-commit date (in whole seconds) wins;
/// otherwise the working summary may already know as much, and a crawl runs.
pub fn accepts_cached(cached: &ProvenanceSummary, working: &ProvenanceSummary) -> bool {
    cached.first_date_secs() < working.first_date_secs()
}

// ---------------------------------------------------------------------------
// JSON file store
// ---------------------------------------------------------------------------

/// [`CacheStore`] backed by a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileCache {
    path: PathBuf,
}

impl JsonFileCache {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Resolve `path` against the working directory when it is relative.
    pub fn in_working_dir<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if path.is_absolute() {
            return Self::new(path);
        }
        match std::env::current_dir() {
            Ok(cwd) => Self::new(cwd.join(path)),
            Err(_) => Self::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> CacheError {
        CacheError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl CacheStore for JsonFileCache {
    fn load(&self) -> Option<ProvenanceSummary> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no provenance cache");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable provenance cache");
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring malformed provenance cache");
                None
            }
        }
    }

    fn save(&self, summary: &ProvenanceSummary) -> Result<(), CacheError> {
        let json = serde_json::to_string_pretty(summary)?;
        std::fs::write(&self.path, json).map_err(|e| self.io_error(e))?;
        debug!(path = %self.path.display(), authors = summary.authors.len(), "wrote provenance cache");
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "removed provenance cache");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// [`CacheStore`] that keeps the summary in memory.
#[derive(Debug, Default)]
pub struct MemoryCache {
    slot: Mutex<Option<ProvenanceSummary>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(summary: ProvenanceSummary) -> Self {
        Self {
            slot: Mutex::new(Some(summary)),
        }
    }
}

impl CacheStore for MemoryCache {
    fn load(&self) -> Option<ProvenanceSummary> {
        self.slot.lock().ok().and_then(|s| s.clone())
    }

    fn save(&self, summary: &ProvenanceSummary) -> Result<(), CacheError> {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(summary.clone());
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
        Ok(())
    }
}

impl<T: CacheStore + Sync> CacheStore for std::sync::Arc<T> {
    fn load(&self) -> Option<ProvenanceSummary> {
        (**self).load()
    }

    fn save(&self, summary: &ProvenanceSummary) -> Result<(), CacheError> {
        (**self).save(summary)
    }

    fn clear(&self) -> Result<(), CacheError> {
        (**self).clear()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::AuthorIdentity;

    fn summary(head: &str, path: &str, first: i64) -> ProvenanceSummary {
        let mut s = ProvenanceSummary::empty(path, Utc.timestamp_opt(first, 0).unwrap());
        s.head_commit = head.into();
        s.authors.insert(AuthorIdentity::new("Alice", "alice@example.com"));
        s
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonFileCache::new(dir.path().join("cache.json"));
        let stored = summary("abc", "/repo", 1_600_000_000);

        cache.save(&stored).unwrap();
        assert_eq!(cache.load(), Some(stored));
    }

    #[test]
    fn test_missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonFileCache::new(dir.path().join("absent.json"));
        assert!(cache.load().is_none());
    }

    #[test]
    fn test_corrupt_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(JsonFileCache::new(&path).load().is_none());

        std::fs::write(&path, r#"{"path": "/repo", "headrev": 7}"#).unwrap();
        assert!(JsonFileCache::new(&path).load().is_none());
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonFileCache::new(dir.path().join("cache.json"));
        cache.save(&summary("abc", "/repo", 1)).unwrap();
        cache.clear().unwrap();
        assert!(!cache.path().exists());
        cache.clear().unwrap();
    }

    #[test]
    fn test_freshness_requires_head_and_path() {
        let cached = summary("H1", "/repo", 1_500_000_000);
        assert!(is_fresh(&cached, "H1", "/repo"));
        assert!(!is_fresh(&cached, "H2", "/repo"));
        assert!(!is_fresh(&cached, "H1", "/elsewhere"));
        assert!(!is_fresh(&summary("", "/repo", 1), "", "/repo"));
    }

    #[test]
    fn test_only_strictly_earlier_cached_date_accepted() {
        let cached = summary("H1", "/repo", 1_500_000_000);
        assert!(accepts_cached(&cached, &summary("H1", "/repo", 1_500_000_001)));
        assert!(!accepts_cached(&cached, &summary("H1", "/repo", 1_500_000_000)));
        assert!(!accepts_cached(&cached, &summary("H1", "/repo", 1_400_000_000)));
    }

    #[test]
    fn test_memory_cache() {
        let cache = MemoryCache::new();
        assert!(cache.load().is_none());
        cache.save(&summary("H", "/r", 1)).unwrap();
        assert_eq!(cache.load().unwrap().head_commit, "H");
        cache.clear().unwrap();
        assert!(cache.load().is_none());
    }
}
