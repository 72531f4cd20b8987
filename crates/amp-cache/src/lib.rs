//! Cache store abstraction for Amped.
//!
//! This crate provides the key-value store consumed by the dimension resolver.
//! Two traits form the core API:
//!
//! - [`Cache`]: Factory for named cache buckets (namespaces)
//! - [`CacheBucket`]: Key-value store with per-entry time-to-live
//!
//! # Implementations
//!
//! - [`NullCache`] / [`NullCacheBucket`]: No-op implementations (always miss)
//! - [`MemoryCache`]: Process-wide in-memory store, shared by all handles
//! - [`FileCache`]: File-based store shared between processes
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use amp_cache::{Cache, MemoryCache};
//!
//! let cache = MemoryCache::new();
//! let bucket = cache.bucket("amp_img");
//! bucket.put("key", b"value", Duration::from_secs(60));
//! assert_eq!(bucket.get("key"), Some(b"value".to_vec()));
//! bucket.forget("key");
//! assert_eq!(bucket.get("key"), None);
//! ```

mod ext;
mod file;
mod memory;

use std::time::Duration;

pub use ext::CacheBucketExt;
pub use file::FileCache;
pub use memory::MemoryCache;

/// A named partition within a [`Cache`].
///
/// Each bucket stores key-value pairs that expire after the time-to-live
/// given on [`put`](Self::put). Expired entries behave exactly like absent
/// ones.
///
/// Access is read-check-then-write; implementations make no attempt at
/// transactions across calls.
pub trait CacheBucket: Send + Sync {
    /// Retrieve a live value.
    ///
    /// Returns `None` when the key is absent or its entry has expired.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store a value, overwriting any existing entry for the same key.
    ///
    /// # Arguments
    ///
    /// * `key` - Cache key (must be usable as a file name)
    /// * `value` - Raw bytes to cache
    /// * `ttl` - Time after which the entry is treated as absent
    fn put(&self, key: &str, value: &[u8], ttl: Duration);

    /// Remove an entry. Removing an absent key is not an error.
    fn forget(&self, key: &str);
}

/// Factory for named cache [`CacheBucket`]s.
///
/// Buckets with different names are logically isolated from each other.
/// Calling `bucket` repeatedly with the same name returns handles that share
/// the same underlying storage.
pub trait Cache: Send + Sync {
    /// Open or create a named bucket.
    ///
    /// # Arguments
    ///
    /// * `name` - Bucket name (e.g., "`amp_img`", "`amp_lock`")
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket>;
}

/// No-op [`CacheBucket`] that never stores or retrieves data.
pub struct NullCacheBucket;

impl CacheBucket for NullCacheBucket {
    fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    fn put(&self, _key: &str, _value: &[u8], _ttl: Duration) {}

    fn forget(&self, _key: &str) {}
}

/// No-op [`Cache`] that always returns [`NullCacheBucket`]s.
///
/// Use when caching is disabled. Note that a resolver backed by this cache
/// cannot deduplicate concurrent fetches, since lock entries are discarded too.
pub struct NullCache;

impl Cache for NullCache {
    fn bucket(&self, _name: &str) -> Box<dyn CacheBucket> {
        Box::new(NullCacheBucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_cache_always_misses() {
        let cache = NullCache;
        let bucket = cache.bucket("amp_img");

        assert_eq!(bucket.get("key"), None);

        bucket.put("key", b"hello", Duration::from_secs(60));
        assert_eq!(bucket.get("key"), None);

        bucket.forget("key");
        assert_eq!(bucket.get("key"), None);
    }
}
