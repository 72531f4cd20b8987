//! `audio` to `amp-audio` conversion.

use amp_dom::{Document, NodeId};

use super::{candidates_outside_noscript, convert_each, media_noscript, move_children_with_fallback};
use crate::{Args, SanitizeError, Sanitizer};

/// Converts `audio` elements to `amp-audio`.
///
/// Attributes are copied as they are. Players without a width fill the
/// available space.
#[derive(Debug, Default)]
pub struct AudioSanitizer;

impl AudioSanitizer {
    /// Create the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Sanitizer for AudioSanitizer {
    fn name(&self) -> &'static str {
        "audio"
    }

    fn sanitize(&mut self, doc: &mut Document, _args: &Args) -> Result<usize, SanitizeError> {
        let candidates = candidates_outside_noscript(doc, "audio");
        Ok(convert_each(self.name(), doc, &candidates, convert_audio))
    }
}

fn convert_audio(doc: &mut Document, audio: NodeId) -> Result<bool, SanitizeError> {
    let noscript = media_noscript(doc, audio)?;

    let mut attrs = doc.attrs(audio).cloned().unwrap_or_default();
    if !attrs.contains("width") {
        attrs.set("width", "auto");
    }

    let amp_audio = doc.create_element("amp-audio", attrs);
    move_children_with_fallback(doc, audio, amp_audio)?;
    doc.append_child(amp_audio, noscript)?;
    doc.replace(audio, amp_audio)?;
    Ok(true)
}
