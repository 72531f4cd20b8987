//! Aspect ratios for embed blocks.

use std::sync::LazyLock;

use amp_dom::{Document, NodeId};
use regex::Regex;

use super::convert_each;
use crate::{Args, SanitizeError, Sanitizer};

static ASPECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)wp-embed-aspect-(\d+)-(\d+)(?:\s|$)").unwrap());

/// Applies the aspect ratio of `figure.wp-block-embed` blocks to the AMP
/// component inside them.
///
/// The block editor records the ratio as a `wp-embed-aspect-W-H` class. The
/// first `amp-*` descendant gets `width=W height=H layout="responsive"`,
/// so this stage runs after the media stages.
#[derive(Debug, Default)]
pub struct BlockSanitizer;

impl BlockSanitizer {
    /// Create the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Sanitizer for BlockSanitizer {
    fn name(&self) -> &'static str {
        "block"
    }

    fn sanitize(&mut self, doc: &mut Document, _args: &Args) -> Result<usize, SanitizeError> {
        let figures: Vec<NodeId> = doc
            .elements_by_tag("figure")
            .into_iter()
            .filter(|&id| doc.has_class(id, "wp-block-embed"))
            .collect();
        Ok(convert_each(self.name(), doc, &figures, apply_aspect))
    }
}

fn apply_aspect(doc: &mut Document, figure: NodeId) -> Result<bool, SanitizeError> {
    let Some((width, height)) = doc.attr(figure, "class").and_then(aspect_ratio) else {
        return Ok(false);
    };
    let component = doc.descendants(figure).into_iter().find(|&id| {
        doc.tag(id).is_some_and(|tag| tag.starts_with("amp-")) && !doc.has_ancestor_tag(id, "noscript")
    });
    let Some(component) = component else {
        return Ok(false);
    };

    doc.set_attr(component, "width", width.to_string());
    doc.set_attr(component, "height", height.to_string());
    doc.set_attr(component, "layout", "responsive");
    Ok(true)
}

fn aspect_ratio(class: &str) -> Option<(u32, u32)> {
    let caps = ASPECT_RE.captures(class)?;
    let width = caps[1].parse().ok().filter(|&w: &u32| w > 0)?;
    let height = caps[2].parse().ok().filter(|&h: &u32| h > 0)?;
    Some((width, height))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_aspect_ratio() {
        assert_eq!(aspect_ratio("wp-block-embed wp-embed-aspect-16-9"), Some((16, 9)));
        assert_eq!(aspect_ratio("wp-embed-aspect-4-3 is-type-video"), Some((4, 3)));
        assert_eq!(aspect_ratio("wp-embed-aspect-0-9"), None);
        assert_eq!(aspect_ratio("xwp-embed-aspect-16-9"), None);
        assert_eq!(aspect_ratio("wp-block-embed"), None);
    }

    #[test]
    fn test_component_gets_ratio() {
        let html = r#"<figure class="wp-block-embed wp-embed-aspect-16-9"><div class="wp-block-embed__wrapper"><amp-iframe src="https://example.com" height="400" layout="fixed-height" width="auto"></amp-iframe></div></figure>"#;
        let mut doc = Document::parse(html);
        let converted = BlockSanitizer::new().sanitize(&mut doc, &Args::new()).unwrap();

        assert_eq!(converted, 1);
        assert_eq!(
            doc.to_html(),
            r#"<figure class="wp-block-embed wp-embed-aspect-16-9"><div class="wp-block-embed__wrapper"><amp-iframe src="https://example.com" height="9" layout="responsive" width="16"></amp-iframe></div></figure>"#
        );
    }

    #[test]
    fn test_block_without_component_is_untouched() {
        let html = r#"<figure class="wp-block-embed wp-embed-aspect-16-9"><iframe src="x"></iframe></figure>"#;
        let mut doc = Document::parse(html);
        let converted = BlockSanitizer::new().sanitize(&mut doc, &Args::new()).unwrap();
        assert_eq!(converted, 0);
        assert_eq!(doc.to_html(), html);
    }
}
