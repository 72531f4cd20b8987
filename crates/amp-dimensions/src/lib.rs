//! Remote image dimension resolution for Amped.
//!
//! AMP components need explicit `width`/`height`. When the source markup
//! omits them, [`DimensionResolver`] looks them up remotely:
//!
//! 1. [`UrlNormalizer`] turns each URL into an absolute one (or rejects it).
//! 2. The `amp_img` cache bucket is consulted, keyed by [`url_hash`].
//! 3. URLs without a cache entry take a short-lived entry in the `amp_lock`
//!    bucket. URLs whose lock is already held resolve to `None` immediately.
//! 4. Locked URLs are fetched as one batch through a [`DimensionFetcher`].
//! 5. Results (including failures) are cached and every lock is released.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use amp_cache::MemoryCache;
//! use amp_dimensions::{
//!     DimensionFetcher, DimensionResolver, Dimensions, FetchError, Scheme, UrlNormalizer,
//! };
//!
//! struct Fixed;
//!
//! impl DimensionFetcher for Fixed {
//!     fn fetch_batch(&self, urls: &[String]) -> HashMap<String, Result<Dimensions, FetchError>> {
//!         urls.iter()
//!             .map(|url| (url.clone(), Ok(Dimensions::new(800, 450))))
//!             .collect()
//!     }
//! }
//!
//! let resolver = DimensionResolver::new(
//!     &MemoryCache::new(),
//!     Arc::new(Fixed),
//!     UrlNormalizer::new("https://example.com").unwrap(),
//! );
//! let sizes = resolver.resolve(["/hero.jpg", "data:image/png;base64,AAAA"], Scheme::Https);
//!
//! assert_eq!(sizes["/hero.jpg"], Some(Dimensions::new(800, 450)));
//! assert_eq!(sizes["data:image/png;base64,AAAA"], None);
//! ```

mod error;
mod fetch;
mod normalize;
mod probe;
mod resolver;

pub use error::{FetchError, ResolverError};
pub use fetch::{DEFAULT_MAX_PROBE_BYTES, DEFAULT_TIMEOUT, DimensionFetcher, HttpFetcher};
pub use normalize::{Scheme, UrlNormalizer};
pub use probe::probe_dimensions;
pub use resolver::{
    DEFAULT_CACHE_TTL, DEFAULT_FAILURE_TTL, DEFAULT_LOCK_TTL, DimensionResolver, IMAGE_BUCKET,
    LOCK_BUCKET, url_hash,
};

use serde::{Deserialize, Serialize};

/// Pixel dimensions of a remote resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create a new width/height pair.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}
