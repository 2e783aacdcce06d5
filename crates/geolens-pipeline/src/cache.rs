//! Content-addressed prediction cache
//!
//! Results are keyed by the SHA-256 hash of the raw image bytes, so the
//! same photo never pays for a second full pipeline run within the TTL
//! window. Entries are JSON files; expiry is lazy, checked on read.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use geolens_core::models::PredictionResult;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Hex SHA-256 digest of the image bytes, used as the cache key
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    created_at: DateTime<Utc>,
    result: PredictionResult,
}

/// File-backed TTL cache for completed predictions
#[derive(Debug, Clone)]
pub struct ResultCache {
    dir: PathBuf,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self { dir: dir.into(), ttl }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Look up a cached result. Expired or unreadable entries are purged
    /// and reported as misses.
    pub fn get(&self, key: &str) -> Option<PredictionResult> {
        let path = self.entry_path(key);
        let raw = fs::read_to_string(&path).ok()?;

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "purging unreadable cache entry");
                let _ = fs::remove_file(&path);
                return None;
            }
        };

        if Utc::now() - entry.created_at > self.ttl {
            debug!(key, "cache entry expired");
            let _ = fs::remove_file(&path);
            return None;
        }

        debug!(key, "cache hit");
        Some(entry.result)
    }

    /// Store a result. Failures are logged and swallowed; the cache is
    /// best-effort and never fails a prediction.
    pub fn put(&self, key: &str, result: &PredictionResult) {
        let entry = CacheEntry {
            created_at: Utc::now(),
            result: result.clone(),
        };

        if let Err(e) = self.write_entry(key, &entry) {
            warn!(key, error = %e, "failed to write cache entry");
        }
    }

    fn write_entry(&self, key: &str, entry: &CacheEntry) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.entry_path(key);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_string(entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    #[cfg(test)]
    fn backdate(&self, key: &str, age: Duration) {
        let path = self.entry_path(key);
        let raw = fs::read_to_string(&path).unwrap();
        let mut entry: CacheEntry = serde_json::from_str(&raw).unwrap();
        entry.created_at = Utc::now() - age;
        fs::write(&path, serde_json::to_string(&entry).unwrap()).unwrap();
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geolens_core::models::{BestPrediction, GeoPoint, PredictionMethod};

    fn sample_result() -> PredictionResult {
        let mut result = PredictionResult::empty();
        result.best = Some(BestPrediction {
            point: GeoPoint::new(38.7223, -9.1393),
            method: PredictionMethod::Coarse,
            snapped: false,
            cluster_size: None,
            similarity: None,
            coarse_confidence: Some(0.85),
        });
        result.confidence = 0.68;
        result
    }

    #[test]
    fn test_content_hash_is_stable_and_distinct() {
        let a = content_hash(b"image-bytes");
        let b = content_hash(b"image-bytes");
        let c = content_hash(b"other-bytes");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::new(dir.path(), Duration::hours(24));

        let key = content_hash(b"photo");
        assert!(cache.get(&key).is_none());

        cache.put(&key, &sample_result());
        let hit = cache.get(&key).expect("cache hit");
        assert_eq!(hit.confidence, 0.68);
        assert_eq!(hit.best.unwrap().coarse_confidence, Some(0.85));
    }

    #[test]
    fn test_expired_entry_is_purged() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::new(dir.path(), Duration::hours(24));

        let key = content_hash(b"photo");
        cache.put(&key, &sample_result());
        cache.backdate(&key, Duration::hours(25));

        assert!(cache.get(&key).is_none());
        // The stale file was removed, not just skipped
        assert!(!dir.path().join(format!("{}.json", key)).exists());
    }

    #[test]
    fn test_corrupt_entry_is_treated_as_miss_and_purged() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::new(dir.path(), Duration::hours(24));

        let key = content_hash(b"photo");
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(dir.path().join(format!("{}.json", key)), "{not json").unwrap();

        assert!(cache.get(&key).is_none());
        assert!(!dir.path().join(format!("{}.json", key)).exists());
    }
}
