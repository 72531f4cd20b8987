//! Cached, deduplicated dimension resolution.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use amp_cache::{Cache, CacheBucket, CacheBucketExt};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{DimensionFetcher, Dimensions, ResolverError, Scheme, UrlNormalizer};

/// Bucket holding resolved dimensions and failure markers.
pub const IMAGE_BUCKET: &str = "amp_img";

/// Bucket holding in-flight fetch locks.
pub const LOCK_BUCKET: &str = "amp_lock";

/// Default lifetime of resolved dimensions (30 days).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Default lifetime of failure markers (30 days).
pub const DEFAULT_FAILURE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Default lifetime of a lock left behind by a crashed fetch.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(60);

const FAILED_MARKER: &str = "failed";

/// Value stored in [`IMAGE_BUCKET`]: `{"width":W,"height":H}` or `"failed"`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum CacheEntry {
    Size(Dimensions),
    Marker(String),
}

impl CacheEntry {
    fn failed() -> Self {
        Self::Marker(FAILED_MARKER.to_owned())
    }

    fn dimensions(&self) -> Option<Dimensions> {
        match self {
            Self::Size(dims) => Some(*dims),
            Self::Marker(_) => None,
        }
    }
}

/// Cache key for a normalized URL: hex-encoded SHA-256.
///
/// The same key is used in both buckets.
#[must_use]
pub fn url_hash(normalized: &str) -> String {
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// Resolves remote image dimensions through a shared cache.
///
/// The resolver never waits for another resolver: when a fetch for a URL is
/// already in flight (its lock entry exists), the URL resolves to `None` for
/// this call and picks up the cached result on a later one. Two callers that
/// both observe "no lock" before either writes may fetch the same URL twice;
/// that race is accepted.
pub struct DimensionResolver {
    images: Box<dyn CacheBucket>,
    locks: Box<dyn CacheBucket>,
    fetcher: Arc<dyn DimensionFetcher>,
    normalizer: UrlNormalizer,
    cache_ttl: Duration,
    failure_ttl: Duration,
    lock_ttl: Duration,
}

impl DimensionResolver {
    /// Create a resolver over `cache` with the default TTLs.
    pub fn new(
        cache: &dyn Cache,
        fetcher: Arc<dyn DimensionFetcher>,
        normalizer: UrlNormalizer,
    ) -> Self {
        Self {
            images: cache.bucket(IMAGE_BUCKET),
            locks: cache.bucket(LOCK_BUCKET),
            fetcher,
            normalizer,
            cache_ttl: DEFAULT_CACHE_TTL,
            failure_ttl: DEFAULT_FAILURE_TTL,
            lock_ttl: DEFAULT_LOCK_TTL,
        }
    }

    /// Override the entry lifetimes.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::InvalidTtl`] unless `lock_ttl` is strictly
    /// shorter than both cache TTLs.
    pub fn with_ttls(
        mut self,
        cache_ttl: Duration,
        failure_ttl: Duration,
        lock_ttl: Duration,
    ) -> Result<Self, ResolverError> {
        let shortest = cache_ttl.min(failure_ttl);
        if lock_ttl >= shortest {
            return Err(ResolverError::InvalidTtl {
                lock: lock_ttl,
                cache: shortest,
            });
        }
        self.cache_ttl = cache_ttl;
        self.failure_ttl = failure_ttl;
        self.lock_ttl = lock_ttl;
        Ok(self)
    }

    /// The URL normalizer used by this resolver.
    #[must_use]
    pub fn normalizer(&self) -> &UrlNormalizer {
        &self.normalizer
    }

    /// Resolve a single URL.
    pub fn resolve_one(&self, url: &str, scheme: Scheme) -> Option<Dimensions> {
        self.resolve([url], scheme).remove(url).flatten()
    }

    /// Resolve every URL in `urls`.
    ///
    /// The result holds one entry per distinct input URL (keyed by the URL as
    /// given, not its normalized form). `None` means the URL is
    /// unresolvable, failed within the failure TTL, or is being fetched by
    /// another caller right now.
    pub fn resolve<I, S>(&self, urls: I, scheme: Scheme) -> BTreeMap<String, Option<Dimensions>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut results = BTreeMap::new();
        // normalized URL -> original spellings
        let mut pending: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for url in urls {
            let url = url.as_ref();
            if results.contains_key(url) {
                continue;
            }
            match self.normalizer.normalize(url, scheme) {
                Some(normalized) => {
                    let originals = pending.entry(normalized).or_default();
                    if !originals.iter().any(|o| o == url) {
                        originals.push(url.to_owned());
                    }
                }
                None => {
                    tracing::debug!(url, "unresolvable image URL");
                    results.insert(url.to_owned(), None);
                }
            }
        }

        let mut to_fetch = Vec::new();
        let mut resolved: HashMap<String, Option<Dimensions>> = HashMap::new();

        for normalized in pending.keys() {
            let key = url_hash(normalized);
            if let Some(entry) = self.images.get_json::<CacheEntry>(&key) {
                tracing::debug!(url = %normalized, "dimension cache hit");
                resolved.insert(normalized.clone(), entry.dimensions());
                continue;
            }
            if self.locks.get(&key).is_some() {
                tracing::debug!(url = %normalized, "fetch already in flight, skipping");
                resolved.insert(normalized.clone(), None);
                continue;
            }
            self.locks.put(&key, b"1", self.lock_ttl);
            to_fetch.push(normalized.clone());
        }

        if !to_fetch.is_empty() {
            resolved.extend(self.fetch_and_store(&to_fetch));
        }

        for (normalized, originals) in pending {
            let dims = resolved.get(&normalized).copied().flatten();
            for original in originals {
                results.insert(original, dims);
            }
        }
        results
    }

    /// Fetch locked URLs, cache every outcome, and release every lock.
    fn fetch_and_store(&self, urls: &[String]) -> HashMap<String, Option<Dimensions>> {
        tracing::debug!(count = urls.len(), "fetching image dimensions");
        let mut fetched = self.fetcher.fetch_batch(urls);

        urls.iter()
            .map(|url| {
                let key = url_hash(url);
                let dims = match fetched.remove(url) {
                    Some(Ok(dims)) => {
                        self.images
                            .put_json(&key, &CacheEntry::Size(dims), self.cache_ttl);
                        Some(dims)
                    }
                    Some(Err(e)) => {
                        tracing::warn!(url = %url, "failed to fetch image dimensions: {e}");
                        self.images
                            .put_json(&key, &CacheEntry::failed(), self.failure_ttl);
                        None
                    }
                    None => {
                        tracing::warn!(url = %url, "fetcher returned no result");
                        self.images
                            .put_json(&key, &CacheEntry::failed(), self.failure_ttl);
                        None
                    }
                };
                self.locks.forget(&key);
                (url.clone(), dims)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, mpsc};
    use std::thread;

    use amp_cache::MemoryCache;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::FetchError;

    const HERO: Dimensions = Dimensions::new(800, 450);

    /// Answers every URL with a fixed outcome and counts batches and URLs.
    struct FakeFetcher {
        outcome: Option<Dimensions>,
        batches: AtomicUsize,
        urls: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        fn ok(dims: Dimensions) -> Arc<Self> {
            Arc::new(Self {
                outcome: Some(dims),
                batches: AtomicUsize::new(0),
                urls: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                outcome: None,
                batches: AtomicUsize::new(0),
                urls: Mutex::new(Vec::new()),
            })
        }

        fn batches(&self) -> usize {
            self.batches.load(Ordering::SeqCst)
        }
    }

    impl DimensionFetcher for FakeFetcher {
        fn fetch_batch(&self, urls: &[String]) -> HashMap<String, Result<Dimensions, FetchError>> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().extend(urls.iter().cloned());
            urls.iter()
                .map(|url| (url.clone(), self.outcome.ok_or(FetchError::UnknownFormat)))
                .collect()
        }
    }

    /// Blocks inside the fetch until the test releases it.
    struct GatedFetcher {
        started: mpsc::Sender<()>,
        release: Mutex<mpsc::Receiver<()>>,
        calls: AtomicUsize,
    }

    impl DimensionFetcher for GatedFetcher {
        fn fetch_batch(&self, urls: &[String]) -> HashMap<String, Result<Dimensions, FetchError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.started.send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
            urls.iter().map(|url| (url.clone(), Ok(HERO))).collect()
        }
    }

    fn normalizer() -> UrlNormalizer {
        UrlNormalizer::new("https://example.com").unwrap()
    }

    #[test]
    fn test_resolve_fetches_and_caches() {
        let cache = MemoryCache::new();
        let fetcher = FakeFetcher::ok(HERO);
        let resolver = DimensionResolver::new(&cache, fetcher.clone(), normalizer());

        assert_eq!(resolver.resolve_one("/hero.jpg", Scheme::Https), Some(HERO));
        assert_eq!(resolver.resolve_one("/hero.jpg", Scheme::Https), Some(HERO));
        assert_eq!(fetcher.batches(), 1);

        let stored = cache
            .bucket(IMAGE_BUCKET)
            .get(&url_hash("https://example.com/hero.jpg"))
            .unwrap();
        assert_eq!(stored, br#"{"width":800,"height":450}"#.to_vec());
    }

    #[test]
    fn test_resolve_batches_all_misses_in_one_fetch() {
        let cache = MemoryCache::new();
        let fetcher = FakeFetcher::ok(HERO);
        let resolver = DimensionResolver::new(&cache, fetcher.clone(), normalizer());

        let results = resolver.resolve(
            ["/a.png", "//cdn.example.org/b.png", "https://example.com/a.png"],
            Scheme::Http,
        );

        assert_eq!(fetcher.batches(), 1);
        let mut urls = fetcher.urls.lock().unwrap().clone();
        urls.sort();
        assert_eq!(
            urls,
            vec![
                "http://cdn.example.org/b.png".to_owned(),
                "https://example.com/a.png".to_owned(),
            ]
        );
        // Keyed by the original spelling, duplicates share one fetch
        assert_eq!(results.len(), 3);
        assert_eq!(results["/a.png"], Some(HERO));
        assert_eq!(results["https://example.com/a.png"], Some(HERO));
        assert_eq!(results["//cdn.example.org/b.png"], Some(HERO));
    }

    #[test]
    fn test_data_uri_never_fetches() {
        let cache = MemoryCache::new();
        let fetcher = FakeFetcher::ok(HERO);
        let resolver = DimensionResolver::new(&cache, fetcher.clone(), normalizer());

        let results = resolver.resolve(["data:image/png;base64,AAAA", ""], Scheme::Https);

        assert_eq!(results["data:image/png;base64,AAAA"], None);
        assert_eq!(results[""], None);
        assert_eq!(fetcher.batches(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_failures_are_cached() {
        let cache = MemoryCache::new();
        let fetcher = FakeFetcher::failing();
        let resolver = DimensionResolver::new(&cache, fetcher.clone(), normalizer());

        for _ in 0..3 {
            assert_eq!(resolver.resolve_one("/broken.png", Scheme::Https), None);
        }
        assert_eq!(fetcher.batches(), 1);

        let stored = cache
            .bucket(IMAGE_BUCKET)
            .get(&url_hash("https://example.com/broken.png"))
            .unwrap();
        assert_eq!(stored, br#""failed""#.to_vec());
    }

    #[test]
    fn test_lock_released_after_success_and_failure() {
        let cache = MemoryCache::new();
        let ok = DimensionResolver::new(&cache, FakeFetcher::ok(HERO), normalizer());
        let failing = DimensionResolver::new(&cache, FakeFetcher::failing(), normalizer());

        ok.resolve_one("/ok.png", Scheme::Https);
        failing.resolve_one("/bad.png", Scheme::Https);

        let locks = cache.bucket(LOCK_BUCKET);
        assert_eq!(locks.get(&url_hash("https://example.com/ok.png")), None);
        assert_eq!(locks.get(&url_hash("https://example.com/bad.png")), None);
    }

    #[test]
    fn test_existing_lock_skips_without_waiting() {
        let cache = MemoryCache::new();
        let fetcher = FakeFetcher::ok(HERO);
        let resolver = DimensionResolver::new(&cache, fetcher.clone(), normalizer());

        // Another process is fetching this URL
        cache.bucket(LOCK_BUCKET).put(
            &url_hash("https://example.com/busy.png"),
            b"1",
            Duration::from_secs(60),
        );

        assert_eq!(resolver.resolve_one("/busy.png", Scheme::Https), None);
        assert_eq!(fetcher.batches(), 0);
    }

    #[test]
    fn test_stale_lock_expires() {
        let cache = MemoryCache::new();
        let fetcher = FakeFetcher::ok(HERO);
        let resolver = DimensionResolver::new(&cache, fetcher.clone(), normalizer());

        // Lock left behind by a crashed fetch
        cache.bucket(LOCK_BUCKET).put(
            &url_hash("https://example.com/a.png"),
            b"1",
            Duration::from_millis(10),
        );
        thread::sleep(Duration::from_millis(30));

        assert_eq!(resolver.resolve_one("/a.png", Scheme::Https), Some(HERO));
        assert_eq!(fetcher.batches(), 1);
    }

    #[test]
    fn test_concurrent_resolution_fetches_once() {
        let cache = MemoryCache::new();
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let fetcher = Arc::new(GatedFetcher {
            started: started_tx,
            release: Mutex::new(release_rx),
            calls: AtomicUsize::new(0),
        });
        let resolver = Arc::new(DimensionResolver::new(&cache, fetcher.clone(), normalizer()));

        let winner = {
            let resolver = Arc::clone(&resolver);
            thread::spawn(move || resolver.resolve_one("/hero.jpg", Scheme::Https))
        };

        // The winner holds the lock and is blocked inside the fetch
        started_rx.recv().unwrap();
        assert_eq!(resolver.resolve_one("/hero.jpg", Scheme::Https), None);

        release_tx.send(()).unwrap();
        assert_eq!(winner.join().unwrap(), Some(HERO));

        // The winner's result is now cached
        assert_eq!(resolver.resolve_one("/hero.jpg", Scheme::Https), Some(HERO));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lock_ttl_must_be_shorter_than_cache_ttls() {
        let cache = MemoryCache::new();
        let build = || DimensionResolver::new(&cache, FakeFetcher::ok(HERO), normalizer());

        assert!(
            build()
                .with_ttls(Duration::from_secs(600), Duration::from_secs(600), Duration::from_secs(60))
                .is_ok()
        );
        let err = build()
            .with_ttls(Duration::from_secs(600), Duration::from_secs(60), Duration::from_secs(60))
            .err()
            .unwrap();
        assert_eq!(
            err,
            ResolverError::InvalidTtl {
                lock: Duration::from_secs(60),
                cache: Duration::from_secs(60),
            }
        );
    }

    #[test]
    fn test_url_hash_is_stable_hex() {
        let hash = url_hash("https://example.com/a.png");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, url_hash("https://example.com/a.png"));
        assert_ne!(hash, url_hash("https://example.com/b.png"));
    }
}
