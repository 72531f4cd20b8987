//! `img` to `amp-img` conversion.

use std::collections::BTreeMap;
use std::sync::Arc;

use amp_dimensions::{DimensionResolver, Dimensions, Scheme};
use amp_dom::{Attributes, Document, NodeId};

use super::{DEFAULT_FALLBACK_HEIGHT, attrs_without, candidates_outside_noscript, convert_each, dimension_attr};
use crate::{Args, SanitizeContext, SanitizeError, Sanitizer};

/// Attributes `amp-img` does not accept.
const DROPPED_ATTRS: &[&str] = &["sizes", "loading", "decoding"];

/// Converts `img` elements to `amp-img`.
///
/// Images without both a width and a height are measured through the
/// dimension resolver in one batch per run. The original `img` is kept in a
/// `noscript` child for renderers without AMP runtime.
///
/// Arguments:
/// - `align_wide_support`: `alignwide`/`alignfull` images get a responsive
///   layout instead of an intrinsic one.
pub struct ImageSanitizer {
    resolver: Option<Arc<DimensionResolver>>,
    scheme: Scheme,
}

impl ImageSanitizer {
    /// Create the stage with the context's resolver.
    #[must_use]
    pub fn new(ctx: &SanitizeContext) -> Self {
        Self {
            resolver: ctx.resolver.clone(),
            scheme: ctx.scheme,
        }
    }

    fn resolve_missing(&self, doc: &Document, images: &[NodeId]) -> BTreeMap<String, Option<Dimensions>> {
        let Some(resolver) = &self.resolver else {
            return BTreeMap::new();
        };
        let urls: Vec<&str> = images
            .iter()
            .filter(|&&img| {
                dimension_attr(doc, img, "width").is_none()
                    || dimension_attr(doc, img, "height").is_none()
            })
            .filter_map(|&img| doc.attr(img, "src"))
            .map(str::trim)
            .filter(|src| !src.is_empty())
            .collect();
        if urls.is_empty() {
            return BTreeMap::new();
        }
        resolver.resolve(urls, self.scheme)
    }
}

impl Sanitizer for ImageSanitizer {
    fn name(&self) -> &'static str {
        "image"
    }

    fn sanitize(&mut self, doc: &mut Document, args: &Args) -> Result<usize, SanitizeError> {
        let align_wide = args.get_bool("align_wide_support");
        let images = candidates_outside_noscript(doc, "img");
        let resolved = self.resolve_missing(doc, &images);

        Ok(convert_each(self.name(), doc, &images, |doc, img| {
            convert_image(doc, img, &resolved, align_wide)
        }))
    }
}

fn convert_image(
    doc: &mut Document,
    img: NodeId,
    resolved: &BTreeMap<String, Option<Dimensions>>,
    align_wide: bool,
) -> Result<bool, SanitizeError> {
    let Some(src) = doc.attr(img, "src").map(str::trim).filter(|s| !s.is_empty()) else {
        // Nothing to show without a source
        doc.detach(img);
        return Ok(false);
    };

    let width = dimension_attr(doc, img, "width");
    let height = dimension_attr(doc, img, "height");
    let size = match (width, height) {
        (Some(w), Some(h)) => Some((w, h)),
        _ => resolved
            .get(src)
            .copied()
            .flatten()
            .map(|dims| complete_size(width, height, dims)),
    };

    let mut attrs = attrs_without(doc, img, DROPPED_ATTRS);
    let class = match size {
        Some((w, h)) => {
            attrs.set("width", w.to_string());
            attrs.set("height", h.to_string());
            let wide = doc.has_class(img, "alignwide") || doc.has_class(img, "alignfull");
            let layout = if align_wide && wide { "responsive" } else { "intrinsic" };
            attrs.set("layout", layout);
            "amp-enforced-sizes"
        }
        None => {
            attrs.set("width", "auto");
            attrs.set("height", height.unwrap_or(DEFAULT_FALLBACK_HEIGHT).to_string());
            attrs.set("layout", "fixed-height");
            "amp-wp-unknown-size"
        }
    };

    let original = doc.deep_clone(img);
    if let Some((w, h)) = size {
        doc.set_attr(original, "width", w.to_string());
        doc.set_attr(original, "height", h.to_string());
    }
    let noscript = doc.create_element("noscript", Attributes::new());
    doc.append_child(noscript, original)?;

    let amp_img = doc.create_element("amp-img", attrs);
    doc.add_class(amp_img, class);
    doc.append_child(amp_img, noscript)?;
    doc.replace(img, amp_img)?;
    Ok(true)
}

/// Fill in a missing side from the measured aspect ratio.
fn complete_size(width: Option<u32>, height: Option<u32>, measured: Dimensions) -> (u32, u32) {
    match (width, height) {
        (Some(w), None) => (w, scale(measured.height, w, measured.width)),
        (None, Some(h)) => (scale(measured.width, h, measured.height), h),
        _ => (measured.width, measured.height),
    }
}

/// `value * numerator / denominator`, at least 1.
fn scale(value: u32, numerator: u32, denominator: u32) -> u32 {
    let scaled = u64::from(value) * u64::from(numerator) / u64::from(denominator.max(1));
    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use amp_cache::MemoryCache;
    use amp_dimensions::{DimensionFetcher, FetchError, UrlNormalizer};
    use pretty_assertions::assert_eq;

    use super::*;

    const PICSUM: &str = "https://picsum.photos/seed/picsum/800/450";

    struct Fixed(HashMap<String, Dimensions>);

    impl DimensionFetcher for Fixed {
        fn fetch_batch(&self, urls: &[String]) -> HashMap<String, Result<Dimensions, FetchError>> {
            urls.iter()
                .map(|url| {
                    let result = self.0.get(url).copied().ok_or(FetchError::UnknownFormat);
                    (url.clone(), result)
                })
                .collect()
        }
    }

    fn context() -> SanitizeContext {
        let fetcher = Fixed(HashMap::from([
            (PICSUM.to_owned(), Dimensions::new(800, 450)),
            ("https://example.com/wide.jpg".to_owned(), Dimensions::new(1600, 900)),
        ]));
        let resolver = DimensionResolver::new(
            &MemoryCache::new(),
            Arc::new(fetcher),
            UrlNormalizer::new("https://example.com").unwrap(),
        );
        SanitizeContext::new().with_resolver(Arc::new(resolver))
    }

    fn run(html: &str, ctx: &SanitizeContext, args: &Args) -> String {
        let mut doc = Document::parse(html);
        ImageSanitizer::new(ctx).sanitize(&mut doc, args).unwrap();
        doc.to_html()
    }

    #[test]
    fn test_missing_size_is_resolved() {
        let html = format!(
            r#"<img class="alignnone wp-image-18 size-full" src="{PICSUM}" alt="" srcset="a.jpg 443w, b.jpg 138w" sizes="(max-width: 443px) 100vw, 443px">"#
        );
        assert_eq!(
            run(&html, &context(), &Args::new()),
            format!(
                r#"<amp-img class="alignnone wp-image-18 size-full amp-enforced-sizes" src="{PICSUM}" alt="" srcset="a.jpg 443w, b.jpg 138w" width="800" height="450" layout="intrinsic"><noscript><img class="alignnone wp-image-18 size-full" src="{PICSUM}" alt="" srcset="a.jpg 443w, b.jpg 138w" sizes="(max-width: 443px) 100vw, 443px" width="800" height="450"></noscript></amp-img>"#
            )
        );
    }

    #[test]
    fn test_explicit_size_is_kept() {
        let html = r#"<img src="/a.png" width="300" height="200" alt="a">"#;
        assert_eq!(
            run(html, &SanitizeContext::new(), &Args::new()),
            r#"<amp-img src="/a.png" width="300" height="200" alt="a" layout="intrinsic" class="amp-enforced-sizes"><noscript><img src="/a.png" width="300" height="200" alt="a"></noscript></amp-img>"#
        );
    }

    #[test]
    fn test_unresolved_size_falls_back_to_fixed_height() {
        let html = r#"<img src="https://example.com/missing.png">"#;
        assert_eq!(
            run(html, &context(), &Args::new()),
            r#"<amp-img src="https://example.com/missing.png" width="auto" height="400" layout="fixed-height" class="amp-wp-unknown-size"><noscript><img src="https://example.com/missing.png"></noscript></amp-img>"#
        );
    }

    #[test]
    fn test_one_side_is_scaled_from_measurement() {
        let html = r#"<img src="/wide.jpg" width="800">"#;
        let out = run(html, &context(), &Args::new());
        assert!(out.starts_with(r#"<amp-img src="/wide.jpg" width="800" height="450" layout="intrinsic""#), "{out}");
    }

    #[test]
    fn test_align_wide_support() {
        let html = r#"<img class="alignwide" src="/a.png" width="1600" height="900">"#;
        let ctx = SanitizeContext::new();

        let out = run(html, &ctx, &Args::new().with("align_wide_support", true));
        assert!(out.contains(r#"layout="responsive""#), "{out}");

        let out = run(html, &ctx, &Args::new());
        assert!(out.contains(r#"layout="intrinsic""#), "{out}");
    }

    #[test]
    fn test_image_without_src_is_removed() {
        assert_eq!(
            run(r#"<p>a<img alt="x">b</p>"#, &SanitizeContext::new(), &Args::new()),
            "<p>ab</p>"
        );
    }

    #[test]
    fn test_noscript_images_are_left_alone() {
        let html = r#"<noscript><img src="/a.png"></noscript>"#;
        assert_eq!(run(html, &SanitizeContext::new(), &Args::new()), html);
    }

    #[test]
    fn test_scale() {
        assert_eq!(scale(900, 800, 1600), 450);
        assert_eq!(scale(1, 1, 1000), 1);
        assert_eq!(scale(5, 5, 0), 25);
    }
}
