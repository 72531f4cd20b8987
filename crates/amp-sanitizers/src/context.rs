//! Shared services available to sanitizer stages.

use std::sync::Arc;

use amp_dimensions::{DimensionResolver, Scheme};

/// Collaborators handed to stages when a pipeline is built.
///
/// Stages that need remote image sizes (image, video posters) resolve them
/// through [`resolver`](Self::resolver). Without a resolver every lookup is
/// treated as unresolved and stages fall back to their default layouts.
///
/// # Example
///
/// ```
/// use amp_dimensions::Scheme;
/// use amp_sanitizers::SanitizeContext;
///
/// let ctx = SanitizeContext::new().with_scheme(Scheme::Http);
/// assert!(ctx.resolver.is_none());
/// assert_eq!(ctx.scheme, Scheme::Http);
/// ```
#[derive(Clone, Default)]
pub struct SanitizeContext {
    /// Remote dimension resolver, if lookups are enabled.
    pub resolver: Option<Arc<DimensionResolver>>,
    /// Transport scheme of the current request.
    pub scheme: Scheme,
}

impl SanitizeContext {
    /// Create a context without a resolver, for HTTPS requests.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dimension resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<DimensionResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Set the request scheme.
    #[must_use]
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }
}
