//! Error types for dimension resolution.

use std::time::Duration;

/// Failure fetching or probing a single remote resource.
///
/// These never abort a conversion: the resolver caches them as a failure
/// marker and reports the URL as unresolved.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    #[error("request failed: {0}")]
    Http(#[from] ureq::Error),

    /// The server answered with a non-success status.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(#[from] std::io::Error),

    /// The leading bytes did not match any known image format.
    #[error("unrecognized image format")]
    UnknownFormat,
}

/// Invalid resolver configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolverError {
    /// The lock TTL must be strictly shorter than the cache TTLs so that a
    /// crashed fetch cannot outlive the entries it protects.
    #[error("lock TTL ({lock:?}) must be shorter than cache TTL ({cache:?})")]
    InvalidTtl {
        /// Configured lock TTL.
        lock: Duration,
        /// The shorter of the success and failure cache TTLs.
        cache: Duration,
    },

    /// The base origin is not an absolute http(s) URL.
    #[error("invalid base origin '{0}': expected an absolute http(s) URL")]
    InvalidOrigin(String),
}
