//! In-memory cache implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::{Cache, CacheBucket};

/// A stored value with its expiry deadline.
#[derive(Debug)]
struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// Entries keyed by `(bucket, key)`.
type Entries = HashMap<(String, String), Entry>;

/// Process-wide in-memory [`Cache`].
///
/// Cloning a `MemoryCache` (or opening the same bucket twice) yields handles
/// over the same storage, so every conversion in the process observes the
/// same cache and lock entries. Expired entries are purged lazily on access.
#[derive(Clone, Debug, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<Entries>>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries across all buckets.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .unwrap()
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    /// Whether the cache holds no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache for MemoryCache {
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket> {
        Box::new(MemoryCacheBucket {
            name: name.to_owned(),
            entries: Arc::clone(&self.entries),
        })
    }
}

/// A single bucket view into a [`MemoryCache`].
struct MemoryCacheBucket {
    name: String,
    entries: Arc<RwLock<Entries>>,
}

impl MemoryCacheBucket {
    fn slot(&self, key: &str) -> (String, String) {
        (self.name.clone(), key.to_owned())
    }
}

impl CacheBucket for MemoryCacheBucket {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let slot = self.slot(key);
        {
            let entries = self.entries.read().unwrap();
            match entries.get(&slot) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: drop it so the map does not grow without bound
        let mut entries = self.entries.write().unwrap();
        if entries
            .get(&slot)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            entries.remove(&slot);
        }
        None
    }

    fn put(&self, key: &str, value: &[u8], ttl: Duration) {
        let entry = Entry {
            value: value.to_vec(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().unwrap().insert(self.slot(key), entry);
    }

    fn forget(&self, key: &str) {
        self.entries.write().unwrap().remove(&self.slot(key));
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_memory_bucket_put_and_get() {
        let cache = MemoryCache::new();
        let bucket = cache.bucket("amp_img");

        bucket.put("key", b"[800,450]", MINUTE);
        assert_eq!(bucket.get("key"), Some(b"[800,450]".to_vec()));
    }

    #[test]
    fn test_memory_bucket_overwrite() {
        let cache = MemoryCache::new();
        let bucket = cache.bucket("amp_img");

        bucket.put("key", b"first", MINUTE);
        bucket.put("key", b"second", MINUTE);
        assert_eq!(bucket.get("key"), Some(b"second".to_vec()));
    }

    #[test]
    fn test_memory_bucket_forget() {
        let cache = MemoryCache::new();
        let bucket = cache.bucket("amp_lock");

        bucket.put("key", b"1", MINUTE);
        bucket.forget("key");
        assert_eq!(bucket.get("key"), None);

        // Forgetting twice is fine
        bucket.forget("key");
    }

    #[test]
    fn test_memory_bucket_expiry() {
        let cache = MemoryCache::new();
        let bucket = cache.bucket("amp_lock");

        bucket.put("key", b"1", Duration::from_millis(10));
        thread::sleep(Duration::from_millis(30));

        assert_eq!(bucket.get("key"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_memory_buckets_are_isolated() {
        let cache = MemoryCache::new();
        let images = cache.bucket("amp_img");
        let locks = cache.bucket("amp_lock");

        images.put("hash", b"dims", MINUTE);
        assert_eq!(locks.get("hash"), None);

        locks.put("hash", b"1", MINUTE);
        assert_eq!(images.get("hash"), Some(b"dims".to_vec()));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_memory_handles_share_storage() {
        let cache = MemoryCache::new();
        let clone = cache.clone();

        cache.bucket("amp_img").put("key", b"shared", MINUTE);
        assert_eq!(clone.bucket("amp_img").get("key"), Some(b"shared".to_vec()));
    }

    #[test]
    fn test_memory_cache_across_threads() {
        let cache = MemoryCache::new();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cache = cache.clone();
                thread::spawn(move || {
                    cache
                        .bucket("amp_img")
                        .put(&format!("key-{i}"), b"v", MINUTE);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 4);
    }
}
