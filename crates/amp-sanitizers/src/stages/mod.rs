//! Built-in sanitizer stages and the helpers they share.

mod allowlist;
mod audio;
mod block;
mod facebook;
mod gallery;
mod iframe;
mod image;
mod script;
mod style;
mod tag_and_attribute;
mod video;

pub use audio::AudioSanitizer;
pub use block::BlockSanitizer;
pub use facebook::FacebookSanitizer;
pub use gallery::GallerySanitizer;
pub use iframe::IframeSanitizer;
pub use image::ImageSanitizer;
pub use script::ScriptSanitizer;
pub use style::StyleSanitizer;
pub use tag_and_attribute::TagAndAttributeSanitizer;
pub use video::VideoSanitizer;

use amp_dom::{Attributes, Document, NodeId};

use crate::SanitizeError;

/// Height used when a media element has no usable height.
pub(crate) const DEFAULT_FALLBACK_HEIGHT: u32 = 400;

/// Visit `candidates` in reverse document order, converting each one.
///
/// `convert` returns `Ok(true)` for a converted node and `Ok(false)` for a
/// node that did not qualify. Errors are logged and the node is skipped.
/// Candidates detached by an earlier conversion are not visited.
pub(crate) fn convert_each<F>(
    stage: &'static str,
    doc: &mut Document,
    candidates: &[NodeId],
    mut convert: F,
) -> usize
where
    F: FnMut(&mut Document, NodeId) -> Result<bool, SanitizeError>,
{
    let mut converted = 0;
    for &id in candidates.iter().rev() {
        if !doc.is_attached(id) {
            continue;
        }
        match convert(doc, id) {
            Ok(true) => converted += 1,
            Ok(false) => {}
            Err(e) => tracing::warn!(stage, node = %id, "skipping element: {e}"),
        }
    }
    converted
}

/// Attached elements named `tag` that do not sit inside a `noscript`.
pub(crate) fn candidates_outside_noscript(doc: &Document, tag: &str) -> Vec<NodeId> {
    doc.elements_by_tag(tag)
        .into_iter()
        .filter(|&id| !doc.has_ancestor_tag(id, "noscript"))
        .collect()
}

/// Parse a width/height attribute as whole CSS pixels.
///
/// Accepts `480`, `480px` and `480.4`; rejects `auto`, `100%` and zero.
pub(crate) fn parse_dimension(value: &str) -> Option<u32> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value).trim();
    let parsed: f64 = number.parse().ok()?;
    if !parsed.is_finite() || parsed < 1.0 || parsed > f64::from(u32::MAX) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some(parsed.round() as u32)
}

/// Numeric dimension attribute `name` on `id`.
pub(crate) fn dimension_attr(doc: &Document, id: NodeId, name: &str) -> Option<u32> {
    doc.attr(id, name).and_then(parse_dimension)
}

/// Width/height/layout for a media element.
///
/// Both dimensions numeric gives a responsive layout; otherwise the element
/// fills the available width at a fixed height.
pub(crate) fn media_layout(
    width: Option<u32>,
    height: Option<u32>,
    fallback_height: u32,
) -> [(&'static str, String); 3] {
    match (width, height) {
        (Some(width), Some(height)) => [
            ("width", width.to_string()),
            ("height", height.to_string()),
            ("layout", "responsive".to_owned()),
        ],
        (_, height) => [
            ("height", height.unwrap_or(fallback_height).to_string()),
            ("layout", "fixed-height".to_owned()),
            ("width", "auto".to_owned()),
        ],
    }
}

/// Copy of the attributes of `id`, minus those named in `skip`.
pub(crate) fn attrs_without(doc: &Document, id: NodeId, skip: &[&str]) -> Attributes {
    doc.attrs(id)
        .map(|attrs| {
            attrs
                .iter()
                .filter(|(name, _)| !skip.contains(name))
                .collect()
        })
        .unwrap_or_default()
}

/// Move every child of `from` under `to`, keeping order.
///
/// The first direct `a` child is marked as the fallback link.
pub(crate) fn move_children_with_fallback(
    doc: &mut Document,
    from: NodeId,
    to: NodeId,
) -> Result<(), SanitizeError> {
    let mut fallback_marked = false;
    for child in doc.children(from).to_vec() {
        doc.detach(child);
        if !fallback_marked && doc.is_tag(child, "a") {
            doc.set_attr(child, "fallback", "");
            fallback_marked = true;
        }
        doc.append_child(to, child)?;
    }
    Ok(())
}

/// Build the `<noscript>` copy of a media element for non-AMP renderers.
///
/// The copy keeps the element's own attributes except `src` and its text
/// content, without the `source`, `track` and fallback `a` children that
/// move to the AMP component.
pub(crate) fn media_noscript(doc: &mut Document, original: NodeId) -> Result<NodeId, SanitizeError> {
    let copy = doc.deep_clone(original);
    doc.remove_attr(copy, "src");
    let moved: Vec<NodeId> = doc
        .children(copy)
        .iter()
        .copied()
        .filter(|&child| {
            doc.is_tag(child, "source") || doc.is_tag(child, "track") || doc.is_tag(child, "a")
        })
        .collect();
    for child in moved {
        doc.detach(child);
    }
    let noscript = doc.create_element("noscript", Attributes::new());
    doc.append_child(noscript, copy)?;
    Ok(noscript)
}
