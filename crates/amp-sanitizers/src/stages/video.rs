//! `video` to `amp-video` conversion.

use std::collections::BTreeMap;
use std::sync::Arc;

use amp_dimensions::{DimensionResolver, Dimensions, Scheme};
use amp_dom::{Document, NodeId};

use super::{
    DEFAULT_FALLBACK_HEIGHT, attrs_without, candidates_outside_noscript, convert_each,
    dimension_attr, media_layout, media_noscript, move_children_with_fallback,
};
use crate::{Args, SanitizeContext, SanitizeError, Sanitizer};

/// Boolean attributes normalized to the empty string.
const BOOLEAN_ATTRS: &[&str] = &["controls", "autoplay", "loop", "muted", "playsinline"];

/// Converts `video` elements to `amp-video`.
///
/// Videos with a numeric width and height get a responsive layout. Others
/// fill the available width at their own height, or at `fallback_height`
/// (default 400). When a video has no size of its own, its poster image is
/// measured instead.
pub struct VideoSanitizer {
    resolver: Option<Arc<DimensionResolver>>,
    scheme: Scheme,
}

impl VideoSanitizer {
    /// Create the stage with the context's resolver.
    #[must_use]
    pub fn new(ctx: &SanitizeContext) -> Self {
        Self {
            resolver: ctx.resolver.clone(),
            scheme: ctx.scheme,
        }
    }

    /// Measure the posters of every video that lacks a width or height,
    /// in one resolver call.
    fn resolve_posters(&self, doc: &Document, videos: &[NodeId]) -> BTreeMap<String, Option<Dimensions>> {
        let Some(resolver) = &self.resolver else {
            return BTreeMap::new();
        };
        let posters: Vec<&str> = videos
            .iter()
            .filter(|&&video| {
                dimension_attr(doc, video, "width").is_none()
                    || dimension_attr(doc, video, "height").is_none()
            })
            .filter_map(|&video| doc.attr(video, "poster"))
            .map(str::trim)
            .filter(|poster| !poster.is_empty())
            .collect();
        if posters.is_empty() {
            return BTreeMap::new();
        }
        resolver.resolve(posters, self.scheme)
    }
}

impl Sanitizer for VideoSanitizer {
    fn name(&self) -> &'static str {
        "video"
    }

    fn sanitize(&mut self, doc: &mut Document, args: &Args) -> Result<usize, SanitizeError> {
        let fallback_height = args
            .get_u32("fallback_height")
            .unwrap_or(DEFAULT_FALLBACK_HEIGHT);
        let videos = candidates_outside_noscript(doc, "video");
        let posters = self.resolve_posters(doc, &videos);

        Ok(convert_each(self.name(), doc, &videos, |doc, video| {
            let (width, height) = video_size(doc, video, &posters);
            convert_video(doc, video, width, height, fallback_height)
        }))
    }
}

/// The video's own size, or its measured poster's when either side is missing.
fn video_size(
    doc: &Document,
    video: NodeId,
    posters: &BTreeMap<String, Option<Dimensions>>,
) -> (Option<u32>, Option<u32>) {
    let width = dimension_attr(doc, video, "width");
    let height = dimension_attr(doc, video, "height");
    if width.is_some() && height.is_some() {
        return (width, height);
    }
    let measured = doc
        .attr(video, "poster")
        .and_then(|poster| posters.get(poster.trim()).copied().flatten());
    match measured {
        Some(dims) => (Some(dims.width), Some(dims.height)),
        None => (width, height),
    }
}

fn convert_video(
    doc: &mut Document,
    video: NodeId,
    width: Option<u32>,
    height: Option<u32>,
    fallback_height: u32,
) -> Result<bool, SanitizeError> {
    let noscript = media_noscript(doc, video)?;

    let mut attrs = attrs_without(doc, video, &["width", "height"]);
    for name in BOOLEAN_ATTRS {
        if attrs.contains(name) {
            attrs.set(*name, "");
        }
    }
    attrs.extend(media_layout(width, height, fallback_height));

    let amp_video = doc.create_element("amp-video", attrs);
    move_children_with_fallback(doc, video, amp_video)?;
    doc.append_child(amp_video, noscript)?;
    doc.replace(video, amp_video)?;
    Ok(true)
}
