//! Facebook embed conversion.
//!
//! Facebook's JS SDK markup is a `div` carrying a marker class (`fb-post`,
//! `fb-video`, ...) and a `data-href`. Each one becomes an `amp-facebook*`
//! component with the same `data-*` configuration.

use amp_dom::{Attributes, Document, NodeId};

use super::convert_each;
use crate::{Args, SanitizeError, Sanitizer};

/// Marker substrings in priority order. First match wins.
const EMBED_TYPES: &[(&str, EmbedType)] = &[
    ("fb-post", EmbedType::Post),
    ("fb-video", EmbedType::Video),
    ("fb-page", EmbedType::Page),
    ("fb-like", EmbedType::Like),
    ("fb-comments", EmbedType::Comments),
    ("fb-comment-embed", EmbedType::Comment),
];

/// Class marking the SDK's no-JS fallback content.
const FALLBACK_CLASS: &str = "fb-xfbml-parse-ignore";

const DEFAULT_WIDTH: u32 = 600;
const DEFAULT_HEIGHT: u32 = 400;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EmbedType {
    Post,
    Video,
    Page,
    Like,
    Comments,
    Comment,
}

impl EmbedType {
    fn detect(class: &str) -> Option<Self> {
        EMBED_TYPES
            .iter()
            .find(|(marker, _)| class.contains(marker))
            .map(|&(_, embed)| embed)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Video => "video",
            Self::Page => "page",
            Self::Like => "like",
            Self::Comments => "comments",
            Self::Comment => "comment",
        }
    }

    /// Target tag, and whether the type must be passed as `data-embed-as`.
    fn component(self) -> (&'static str, bool) {
        match self {
            Self::Page => ("amp-facebook-page", false),
            Self::Like => ("amp-facebook-like", false),
            Self::Comments => ("amp-facebook-comments", false),
            Self::Post | Self::Video | Self::Comment => ("amp-facebook", true),
        }
    }
}

/// Converts Facebook SDK embeds to `amp-facebook*` components.
///
/// Arguments:
/// - `width`, `height`: used when the embed has no `data-width`/`data-height`
///   (defaults 600x400).
#[derive(Debug, Default)]
pub struct FacebookSanitizer {
    did_convert: bool,
}

impl FacebookSanitizer {
    /// Create the stage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the last run converted at least one embed.
    #[must_use]
    pub fn did_convert(&self) -> bool {
        self.did_convert
    }
}

impl Sanitizer for FacebookSanitizer {
    fn name(&self) -> &'static str {
        "facebook"
    }

    fn sanitize(&mut self, doc: &mut Document, args: &Args) -> Result<usize, SanitizeError> {
        let default_width = args
            .get_str("width")
            .unwrap_or_else(|| DEFAULT_WIDTH.to_string());
        let default_height = args
            .get_str("height")
            .unwrap_or_else(|| DEFAULT_HEIGHT.to_string());

        let candidates = doc.elements_by_tag("div");
        let converted = convert_each(self.name(), doc, &candidates, |doc, div| {
            convert_embed(doc, div, &default_width, &default_height)
        });

        self.did_convert = converted > 0;
        Ok(converted)
    }
}

fn convert_embed(
    doc: &mut Document,
    div: NodeId,
    default_width: &str,
    default_height: &str,
) -> Result<bool, SanitizeError> {
    let (Some(class), Some(_)) = (doc.attr(div, "class"), doc.attr(div, "data-href")) else {
        return Ok(false);
    };
    let Some(embed) = EmbedType::detect(class) else {
        return Ok(false);
    };

    let mut attrs = Attributes::new();
    let width = doc.attr(div, "data-width").unwrap_or(default_width).to_owned();
    let height = doc.attr(div, "data-height").unwrap_or(default_height).to_owned();
    if width == "100%" || width == "auto" {
        attrs.set("layout", "fixed-height");
        attrs.set("width", "auto");
    } else {
        attrs.set("layout", "responsive");
        attrs.set("width", width);
    }
    attrs.set("height", height);

    if let Some(source) = doc.attrs(div) {
        attrs.extend(source.iter().filter(|(name, _)| {
            name.starts_with("data-") && *name != "data-width" && *name != "data-height"
        }));
    }

    let (tag, embed_as) = embed.component();
    if embed_as {
        attrs.set("data-embed-as", embed.as_str());
    }

    let fallback = doc
        .element_children(div)
        .find(|&child| doc.attr(child, "class").is_some_and(|c| c.contains(FALLBACK_CLASS)));
    if let Some(fallback) = fallback {
        doc.detach(fallback);
        doc.set_attr(fallback, "fallback", "");
    }

    let component = doc.create_element(tag, attrs);
    doc.replace(div, component)?;
    if let Some(fallback) = fallback {
        doc.append_child(component, fallback)?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const VIDEO_HREF: &str = "https://www.facebook.com/KOMONews/videos/225376735289463/";

    fn run(html: &str, args: &Args) -> (String, usize) {
        let mut doc = Document::parse(html);
        let converted = FacebookSanitizer::new().sanitize(&mut doc, args).unwrap();
        (doc.to_html(), converted)
    }

    fn config_args() -> Args {
        Args::new().with("width", 600).with("height", 380)
    }

    #[test]
    fn test_video_with_explicit_size() {
        let html = format!(
            r#"<div class="fb-video" data-href="{VIDEO_HREF}" data-width="480" data-height="270" data-show-captions="false"></div>"#
        );
        let (out, converted) = run(&html, &config_args());
        assert_eq!(
            out,
            format!(
                r#"<amp-facebook layout="responsive" width="480" height="270" data-href="{VIDEO_HREF}" data-show-captions="false" data-embed-as="video"></amp-facebook>"#
            )
        );
        assert_eq!(converted, 1);
    }

    #[test]
    fn test_auto_width_switches_to_fixed_height() {
        let html = format!(
            r#"<div class="fb-video" data-href="{VIDEO_HREF}" data-width="auto" data-height="360" data-show-captions="false"></div>"#
        );
        let (out, _) = run(&html, &config_args());
        assert_eq!(
            out,
            format!(
                r#"<amp-facebook layout="fixed-height" width="auto" height="360" data-href="{VIDEO_HREF}" data-show-captions="false" data-embed-as="video"></amp-facebook>"#
            )
        );
    }

    #[test]
    fn test_percent_width_switches_to_fixed_height() {
        let (out, _) = run(
            r#"<div class="fb-page" data-href="x" data-width="100%"></div>"#,
            &config_args(),
        );
        assert_eq!(
            out,
            r#"<amp-facebook-page layout="fixed-height" width="auto" height="380" data-href="x"></amp-facebook-page>"#
        );
    }

    #[test]
    fn test_post_fallback_is_migrated() {
        let html = r#"<div class="fb-post" data-href="https://www.facebook.com/p/1" data-width="500" data-show-text="true"><blockquote cite="https://developers.facebook.com/p/1" class="fb-xfbml-parse-ignore"><p>Hello</p></blockquote></div>"#;
        let (out, _) = run(html, &config_args());
        assert_eq!(
            out,
            r#"<amp-facebook layout="responsive" width="500" height="380" data-href="https://www.facebook.com/p/1" data-show-text="true" data-embed-as="post"><blockquote cite="https://developers.facebook.com/p/1" class="fb-xfbml-parse-ignore" fallback=""><p>Hello</p></blockquote></amp-facebook>"#
        );
    }

    #[test]
    fn test_only_first_direct_fallback_child_moves() {
        let html = r#"<div class="fb-post" data-href="x"><p><span class="fb-xfbml-parse-ignore">deep</span></p><blockquote class="fb-xfbml-parse-ignore">one</blockquote><blockquote class="fb-xfbml-parse-ignore">two</blockquote></div>"#;
        let mut doc = Document::parse(html);
        FacebookSanitizer::new()
            .sanitize(&mut doc, &config_args())
            .unwrap();

        let component = doc.elements_by_tag("amp-facebook")[0];
        let children = doc.children(component);
        assert_eq!(children.len(), 1);
        assert_eq!(doc.text_content(children[0]), "one");
        assert!(doc.has_attr(children[0], "fallback"));
        // The marker node no longer sits anywhere else in the document
        assert_eq!(doc.elements_by_tag("blockquote").len(), 1);
    }

    #[test]
    fn test_type_specific_tags() {
        for (class, tag) in [
            ("fb-page", "amp-facebook-page"),
            ("fb-like", "amp-facebook-like"),
            ("fb-comments", "amp-facebook-comments"),
        ] {
            let (out, _) = run(
                &format!(r#"<div class="{class}" data-href="x"></div>"#),
                &config_args(),
            );
            assert!(out.starts_with(&format!("<{tag} ")), "{class}: {out}");
            assert!(!out.contains("data-embed-as"), "{class}: {out}");
        }
    }

    #[test]
    fn test_comment_embed_uses_residual_tag() {
        let (out, _) = run(
            r#"<div class="fb-comment-embed" data-href="x"></div>"#,
            &config_args(),
        );
        assert!(out.contains(r#"data-embed-as="comment""#), "{out}");
        assert!(out.starts_with("<amp-facebook "), "{out}");
    }

    #[test]
    fn test_first_marker_wins() {
        let (out, _) = run(
            r#"<div class="fb-video fb-post" data-href="x"></div>"#,
            &config_args(),
        );
        assert!(out.contains(r#"data-embed-as="post""#), "{out}");
    }

    #[test]
    fn test_non_candidates_untouched() {
        let html = r#"<div class="fb-post">no href</div><div data-href="x">no class</div><div class="other" data-href="x"></div>"#;
        let mut stage = FacebookSanitizer::new();
        let mut doc = Document::parse(html);
        let converted = stage.sanitize(&mut doc, &config_args()).unwrap();

        assert_eq!(doc.to_html(), html);
        assert_eq!(converted, 0);
        assert!(!stage.did_convert());
    }

    #[test]
    fn test_default_size_without_args() {
        let (out, _) = run(r#"<div class="fb-like" data-href="x"></div>"#, &Args::new());
        assert_eq!(
            out,
            r#"<amp-facebook-like layout="responsive" width="600" height="400" data-href="x"></amp-facebook-like>"#
        );
    }

    #[test]
    fn test_nested_embeds_are_both_converted() {
        let html = r#"<div class="fb-page" data-href="outer"><div class="fb-like" data-href="inner"></div></div>"#;
        let (_, converted) = run(html, &config_args());
        // The inner embed is visited first and replaced inside the outer one,
        // which is then replaced as a whole.
        assert_eq!(converted, 2);
    }
}
