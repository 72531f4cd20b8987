//! URL normalization.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::ResolverError;

/// Transport scheme of the request being converted.
///
/// Used to expand scheme-relative URLs (`//cdn.example.com/a.png`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Plain HTTP.
    Http,
    /// HTTPS.
    #[default]
    Https,
}

impl Scheme {
    /// Scheme name without the trailing colon.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Turns the URLs found in markup into absolute fetchable URLs.
#[derive(Clone, Debug)]
pub struct UrlNormalizer {
    base: Url,
}

impl UrlNormalizer {
    /// Create a normalizer that resolves relative URLs against `base_origin`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::InvalidOrigin`] when `base_origin` is not an
    /// absolute http(s) URL.
    pub fn new(base_origin: &str) -> Result<Self, ResolverError> {
        let base = Url::parse(base_origin)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
            .ok_or_else(|| ResolverError::InvalidOrigin(base_origin.to_owned()))?;
        Ok(Self { base })
    }

    /// The configured base origin, without a trailing slash.
    #[must_use]
    pub fn base_origin(&self) -> String {
        self.base.origin().ascii_serialization()
    }

    /// Normalize `raw` for fetching.
    ///
    /// Returns `None` for URLs that can never be resolved: empty strings,
    /// `data:` URIs and absolute URLs with a non-http(s) scheme.
    /// Scheme-relative URLs take `scheme`; root- and path-relative URLs are
    /// joined onto the base origin. Fragments are dropped.
    #[must_use]
    pub fn normalize(&self, raw: &str, scheme: Scheme) -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() || raw.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("data:")) {
            return None;
        }

        let mut url = if let Some(rest) = raw.strip_prefix("//") {
            Url::parse(&format!("{scheme}://{rest}")).ok()?
        } else {
            match Url::parse(raw) {
                Ok(url) => url,
                Err(url::ParseError::RelativeUrlWithoutBase) => self.base.join(raw).ok()?,
                Err(_) => return None,
            }
        };

        if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
            return None;
        }
        url.set_fragment(None);
        Some(url.into())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn normalizer() -> UrlNormalizer {
        UrlNormalizer::new("https://example.com").unwrap()
    }

    #[test]
    fn test_scheme_relative_uses_request_scheme() {
        let n = normalizer();
        assert_eq!(
            n.normalize("//cdn.example.org/a.png", Scheme::Http),
            Some("http://cdn.example.org/a.png".to_owned())
        );
        assert_eq!(
            n.normalize("//cdn.example.org/a.png", Scheme::Https),
            Some("https://cdn.example.org/a.png".to_owned())
        );
    }

    #[test]
    fn test_root_relative_uses_base_origin() {
        assert_eq!(
            normalizer().normalize("/uploads/a.png?v=2", Scheme::Http),
            Some("https://example.com/uploads/a.png?v=2".to_owned())
        );
    }

    #[test]
    fn test_path_relative_uses_base_origin() {
        assert_eq!(
            normalizer().normalize("uploads/a.png", Scheme::Https),
            Some("https://example.com/uploads/a.png".to_owned())
        );
    }

    #[test]
    fn test_absolute_url_is_kept() {
        assert_eq!(
            normalizer().normalize("http://other.org/a.png", Scheme::Https),
            Some("http://other.org/a.png".to_owned())
        );
    }

    #[test]
    fn test_fragment_is_dropped() {
        assert_eq!(
            normalizer().normalize("/a.svg#icon", Scheme::Https),
            Some("https://example.com/a.svg".to_owned())
        );
    }

    #[test]
    fn test_unresolvable_urls() {
        let n = normalizer();
        assert_eq!(n.normalize("", Scheme::Https), None);
        assert_eq!(n.normalize("   ", Scheme::Https), None);
        assert_eq!(n.normalize("data:image/png;base64,AAAA", Scheme::Https), None);
        assert_eq!(n.normalize("DATA:image/gif;base64,R0lG", Scheme::Https), None);
        assert_eq!(n.normalize("javascript:alert(1)", Scheme::Https), None);
        assert_eq!(n.normalize("mailto:a@example.com", Scheme::Https), None);
    }

    #[test]
    fn test_invalid_base_origin() {
        assert!(matches!(
            UrlNormalizer::new("example.com"),
            Err(ResolverError::InvalidOrigin(_))
        ));
        assert!(UrlNormalizer::new("ftp://example.com").is_err());
    }

    #[test]
    fn test_base_origin_strips_path() {
        let n = UrlNormalizer::new("https://example.com/blog/").unwrap();
        assert_eq!(n.base_origin(), "https://example.com");
    }
}
