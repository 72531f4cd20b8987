//! Remote fetching of image headers.

use std::collections::HashMap;
use std::io::Read;
use std::time::Duration;

use rayon::prelude::*;
use ureq::Agent;

use crate::{Dimensions, FetchError, probe_dimensions};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of body bytes read per image.
pub const DEFAULT_MAX_PROBE_BYTES: u64 = 64 * 1024;

/// Fetches the dimensions of a batch of absolute URLs.
///
/// Implementations must return an entry for every requested URL. A missing
/// entry is treated as a failure by the resolver.
pub trait DimensionFetcher: Send + Sync {
    /// Fetch all `urls` in one batch.
    fn fetch_batch(&self, urls: &[String]) -> HashMap<String, Result<Dimensions, FetchError>>;
}

/// [`DimensionFetcher`] over HTTP(S).
///
/// Requests run in parallel on the rayon pool. Each request carries the
/// configured `User-Agent`, is bounded by a global timeout, and reads at most
/// `max_probe_bytes` of the body. TLS certificates are always verified.
pub struct HttpFetcher {
    agent: Agent,
    user_agent: String,
    max_probe_bytes: u64,
}

impl HttpFetcher {
    /// Create a fetcher identifying itself as `user_agent`.
    #[must_use]
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self::with_options(user_agent, DEFAULT_TIMEOUT, DEFAULT_MAX_PROBE_BYTES)
    }

    /// Create a fetcher with an explicit timeout and probe size.
    #[must_use]
    pub fn with_options(user_agent: impl Into<String>, timeout: Duration, max_probe_bytes: u64) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            user_agent: user_agent.into(),
            max_probe_bytes,
        }
    }

    fn fetch_one(&self, url: &str) -> Result<Dimensions, FetchError> {
        let response = self
            .agent
            .get(url)
            .header("User-Agent", &self.user_agent)
            .call()
            .map_err(|e| match e {
                ureq::Error::StatusCode(status) => FetchError::Status(status),
                other => FetchError::Http(other),
            })?;

        let mut head = Vec::new();
        response
            .into_body()
            .into_reader()
            .take(self.max_probe_bytes)
            .read_to_end(&mut head)?;

        probe_dimensions(&head).ok_or(FetchError::UnknownFormat)
    }
}

impl DimensionFetcher for HttpFetcher {
    fn fetch_batch(&self, urls: &[String]) -> HashMap<String, Result<Dimensions, FetchError>> {
        urls.par_iter()
            .map(|url| (url.clone(), self.fetch_one(url)))
            .collect()
    }
}
