//! Extension trait for [`CacheBucket`] with typed convenience methods.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::CacheBucket;

/// Typed convenience methods for [`CacheBucket`].
///
/// Implemented as default methods on an extension trait so that
/// [`CacheBucket`] stays object-safe and serde-free while callers still get
/// typed access via a blanket impl.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use amp_cache::{Cache, CacheBucketExt, MemoryCache};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct Size { width: u32, height: u32 }
///
/// let cache = MemoryCache::new();
/// let bucket = cache.bucket("amp_img");
///
/// bucket.put_json("logo", &Size { width: 800, height: 450 }, Duration::from_secs(60));
/// let size: Option<Size> = bucket.get_json("logo");
/// assert_eq!(size, Some(Size { width: 800, height: 450 }));
/// ```
pub trait CacheBucketExt: CacheBucket {
    /// Retrieve a JSON-deserialized value from the cache.
    ///
    /// Returns `None` on cache miss, expiry, or deserialization failure.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = self.get(key)?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Store a value as JSON in the cache.
    ///
    /// Silently does nothing if serialization fails.
    fn put_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        if let Ok(bytes) = serde_json::to_vec(value) {
            self.put(key, &bytes, ttl);
        }
    }
}

impl<B: CacheBucket + ?Sized> CacheBucketExt for B {}
