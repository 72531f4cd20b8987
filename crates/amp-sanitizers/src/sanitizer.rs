//! The sanitizer stage trait.

use amp_dom::Document;

use crate::{Args, SanitizeError};

/// One ordered unit of document mutation.
///
/// A stage selects candidate nodes, visits them in reverse document order,
/// and swaps in AMP replacements at the original position. Reverse order
/// keeps a replacement from disturbing candidates not yet visited.
///
/// # Thread Safety
///
/// Stages implement `Send` only (not `Sync`): every conversion builds its own
/// pipeline and the document is never shared.
///
/// # Example
///
/// ```
/// use amp_dom::Document;
/// use amp_sanitizers::{Args, Pipeline, SanitizeError, Sanitizer};
///
/// struct DropMarquee;
///
/// impl Sanitizer for DropMarquee {
///     fn name(&self) -> &'static str { "drop_marquee" }
///
///     fn sanitize(&mut self, doc: &mut Document, _args: &Args) -> Result<usize, SanitizeError> {
///         let found = doc.elements_by_tag("marquee");
///         for &id in found.iter().rev() {
///             doc.detach(id);
///         }
///         Ok(found.len())
///     }
/// }
///
/// let mut doc = Document::parse("<p>a</p><marquee>b</marquee>");
/// let report = Pipeline::new().with_stage(DropMarquee, Args::new()).run(&mut doc);
///
/// assert_eq!(doc.to_html(), "<p>a</p>");
/// assert_eq!(report.converted("drop_marquee"), Some(1));
/// ```
pub trait Sanitizer: Send {
    /// Stage identifier (e.g., "image", "facebook").
    fn name(&self) -> &'static str;

    /// Mutate `doc` in place, returning how many elements were converted.
    ///
    /// Per-node problems are logged and skipped inside the stage. An `Err`
    /// means the stage could not continue at all.
    fn sanitize(&mut self, doc: &mut Document, args: &Args) -> Result<usize, SanitizeError>;

    /// Stylesheet rules collected during [`sanitize`](Self::sanitize).
    ///
    /// Override this method if your stage moves inline CSS out of the
    /// document.
    fn styles(&self) -> &[String] {
        &[]
    }
}
