//! Gallery blocks to `amp-carousel`.

use amp_dom::{Attributes, Document, NodeId};

use super::{convert_each, dimension_attr};
use crate::{Args, SanitizeError, Sanitizer};

const GALLERY_CLASS: &str = "wp-block-gallery";
const DEFAULT_WIDTH: u32 = 600;
const DEFAULT_HEIGHT: u32 = 480;

/// Converts gallery blocks to slide carousels.
///
/// Works on `amp-img` elements, so it must run after the image stage.
/// Galleries are converted when `carousel_required` is set or the gallery
/// itself carries `data-amp-carousel="true"`.
#[derive(Debug, Default)]
pub struct GallerySanitizer;

impl GallerySanitizer {
    /// Create the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Sanitizer for GallerySanitizer {
    fn name(&self) -> &'static str {
        "gallery"
    }

    fn sanitize(&mut self, doc: &mut Document, args: &Args) -> Result<usize, SanitizeError> {
        let carousel_required = args.get_bool("carousel_required");
        let galleries: Vec<NodeId> = doc
            .elements()
            .into_iter()
            .filter(|&id| doc.has_class(id, GALLERY_CLASS))
            .collect();

        Ok(convert_each(self.name(), doc, &galleries, |doc, gallery| {
            let opted_in = doc.attr(gallery, "data-amp-carousel") == Some("true");
            if !(carousel_required || opted_in) {
                return Ok(false);
            }
            convert_gallery(doc, gallery)
        }))
    }
}

fn convert_gallery(doc: &mut Document, gallery: NodeId) -> Result<bool, SanitizeError> {
    let images: Vec<NodeId> = doc
        .descendants(gallery)
        .into_iter()
        .filter(|&id| doc.is_tag(id, "amp-img") && !doc.has_ancestor_tag(id, "noscript"))
        .collect();
    if images.is_empty() {
        return Ok(false);
    }

    let max_dim = |name: &str| {
        images
            .iter()
            .filter_map(|&img| dimension_attr(doc, img, name))
            .max()
    };
    let width = max_dim("width").unwrap_or(DEFAULT_WIDTH);
    let height = max_dim("height").unwrap_or(DEFAULT_HEIGHT);

    let carousel = doc.create_element(
        "amp-carousel",
        Attributes::from_iter([
            ("type", "slides".to_owned()),
            ("layout", "responsive".to_owned()),
            ("width", width.to_string()),
            ("height", height.to_string()),
        ]),
    );
    for img in images {
        doc.detach(img);
        doc.append_child(carousel, img)?;
    }
    doc.replace(gallery, carousel)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::stages::ImageSanitizer;
    use crate::{Pipeline, SanitizeContext};

    const GALLERY: &str = r#"<figure class="wp-block-gallery" data-amp-carousel="true"><ul><li><img src="/a.jpg" width="800" height="600"></li><li><img src="/b.jpg" width="640" height="700"></li></ul></figure>"#;

    #[test]
    fn test_gallery_after_image_becomes_carousel() {
        let mut doc = Document::parse(GALLERY);
        let report = Pipeline::new()
            .with_stage(ImageSanitizer::new(&SanitizeContext::new()), Args::new())
            .with_stage(GallerySanitizer::new(), Args::new())
            .run(&mut doc);

        assert_eq!(report.converted("gallery"), Some(1));
        let out = doc.to_html();
        assert!(
            out.starts_with(r#"<amp-carousel type="slides" layout="responsive" width="800" height="700"><amp-img src="/a.jpg""#),
            "{out}"
        );
        assert_eq!(doc.elements_by_tag("amp-img").len(), 2);
        assert!(doc.elements_by_tag("figure").is_empty());
    }

    #[test]
    fn test_gallery_before_image_does_nothing() {
        let mut doc = Document::parse(GALLERY);
        let report = Pipeline::new()
            .with_stage(GallerySanitizer::new(), Args::new())
            .with_stage(ImageSanitizer::new(&SanitizeContext::new()), Args::new())
            .run(&mut doc);

        assert_eq!(report.converted("gallery"), Some(0));
        assert!(doc.elements_by_tag("amp-carousel").is_empty());
        assert_eq!(doc.elements_by_tag("figure").len(), 1);
    }

    #[test]
    fn test_gallery_needs_opt_in() {
        let html = r#"<ul class="wp-block-gallery"><li><amp-img src="/a.jpg"></amp-img></li></ul>"#;

        let mut doc = Document::parse(html);
        GallerySanitizer::new().sanitize(&mut doc, &Args::new()).unwrap();
        assert_eq!(doc.to_html(), html);

        let mut doc = Document::parse(html);
        let converted = GallerySanitizer::new()
            .sanitize(&mut doc, &Args::new().with("carousel_required", true))
            .unwrap();
        assert_eq!(converted, 1);
        assert_eq!(
            doc.to_html(),
            r#"<amp-carousel type="slides" layout="responsive" width="600" height="480"><amp-img src="/a.jpg"></amp-img></amp-carousel>"#
        );
    }
}
