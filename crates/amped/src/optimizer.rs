//! Post-render optimizer boundary.

/// Error reported by an [`Optimizer`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct OptimizeError(pub String);

/// Transforms a complete AMP page after rendering.
///
/// Implementations are opaque to Amped: the facade only forwards the page
/// and falls back to the unoptimized HTML when optimization fails.
///
/// Closures `Fn(&str) -> Result<String, OptimizeError>` implement this trait.
///
/// # Example
///
/// ```
/// use amped::{OptimizeError, Optimizer};
///
/// let trim = |html: &str| -> Result<String, OptimizeError> { Ok(html.trim().to_owned()) };
/// assert_eq!(trim.optimize("  <p>x</p> ").unwrap(), "<p>x</p>");
/// ```
pub trait Optimizer: Send + Sync {
    /// Optimize a full HTML page.
    fn optimize(&self, html: &str) -> Result<String, OptimizeError>;
}

impl<F> Optimizer for F
where
    F: Fn(&str) -> Result<String, OptimizeError> + Send + Sync,
{
    fn optimize(&self, html: &str) -> Result<String, OptimizeError> {
        self(html)
    }
}
