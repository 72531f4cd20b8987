//! Author script removal.

use amp_dom::{Document, NodeId};

use super::convert_each;
use crate::{Args, SanitizeError, Sanitizer};

const AMP_CDN: &str = "https://cdn.ampproject.org/";

/// Removes `script` elements AMP pages may not carry.
///
/// JSON-LD blocks and AMP runtime/component scripts survive; everything else
/// is removed along with its content.
#[derive(Debug, Default)]
pub struct ScriptSanitizer;

impl ScriptSanitizer {
    /// Create the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Sanitizer for ScriptSanitizer {
    fn name(&self) -> &'static str {
        "script"
    }

    fn sanitize(&mut self, doc: &mut Document, _args: &Args) -> Result<usize, SanitizeError> {
        let scripts = doc.elements_by_tag("script");
        Ok(convert_each(self.name(), doc, &scripts, |doc, script| {
            if is_allowed_script(doc, script) {
                return Ok(false);
            }
            doc.detach(script);
            Ok(true)
        }))
    }
}

/// Whether `script` may stay in an AMP document.
pub(crate) fn is_allowed_script(doc: &Document, script: NodeId) -> bool {
    let is_json_ld = doc
        .attr(script, "type")
        .is_some_and(|t| t.trim().eq_ignore_ascii_case("application/ld+json"));
    let is_component = doc.has_attr(script, "custom-element")
        || doc.has_attr(script, "custom-template");
    let from_amp_cdn = doc
        .attr(script, "src")
        .is_some_and(|src| src.trim().starts_with(AMP_CDN));
    is_json_ld || ((is_component || doc.has_attr(script, "async")) && from_amp_cdn)
}
