//! AMP tag and attribute allow-list.

use std::collections::HashSet;

use amp_dom::{Document, NodeId};

use super::script::is_allowed_script;
use crate::Args;

/// Tags allowed anywhere in the body.
const ALLOWED_TAGS: &[&str] = &[
    "a", "abbr", "address", "article", "aside", "b", "bdi", "bdo", "blockquote", "br", "button",
    "caption", "cite", "code", "col", "colgroup", "data", "dd", "del", "details", "dfn", "div",
    "dl", "dt", "em", "fieldset", "figcaption", "figure", "footer", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hr", "i", "ins", "kbd", "label", "legend", "li", "main", "mark", "nav",
    "noscript", "ol", "p", "pre", "q", "rp", "rt", "ruby", "s", "samp", "section", "small",
    "source", "span", "strong", "sub", "summary", "sup", "table", "tbody", "td", "tfoot", "th",
    "thead", "time", "tr", "track", "u", "ul", "var", "wbr",
    // AMP components produced by the stages
    "amp-anim", "amp-audio", "amp-carousel", "amp-facebook", "amp-facebook-comments",
    "amp-facebook-like", "amp-facebook-page", "amp-iframe", "amp-img", "amp-video",
];

/// Tags allowed only as the non-AMP copy inside `noscript`.
const NOSCRIPT_ONLY_TAGS: &[&str] = &["audio", "iframe", "img", "picture", "video"];

/// Tags removed together with everything inside them.
const REMOVE_WITH_CONTENT: &[&str] = &[
    "applet", "base", "embed", "form", "frame", "frameset", "input", "link", "math", "meta",
    "object", "param", "select", "style", "svg", "template", "textarea",
];

/// Attributes allowed on every element.
const GLOBAL_ATTRS: &[&str] = &[
    "class", "dir", "fallback", "hidden", "id", "itemid", "itemprop", "itemref", "itemscope",
    "itemtype", "lang", "placeholder", "role", "tabindex", "title", "translate",
];

/// Layout attributes shared by every `amp-*` component.
const AMP_LAYOUT_ATTRS: &[&str] = &["layout", "width", "height", "sizes", "heights", "media", "noloading"];

/// Attributes allowed on specific tags, on top of the global ones.
const TAG_ATTRS: &[(&str, &[&str])] = &[
    ("a", &["href", "hreflang", "name", "rel", "target", "type", "download"]),
    ("amp-anim", &["src", "srcset", "alt", "attribution"]),
    ("amp-audio", &["src", "autoplay", "controls", "loop", "muted", "artwork", "artist", "album"]),
    ("amp-carousel", &["type", "controls", "loop", "autoplay", "delay", "slide"]),
    ("amp-iframe", &[
        "src", "srcdoc", "sandbox", "allow", "allowfullscreen", "allowtransparency", "frameborder",
        "referrerpolicy", "resizable", "scrolling",
    ]),
    ("amp-img", &["src", "srcset", "alt", "attribution"]),
    ("amp-video", &[
        "src", "poster", "autoplay", "controls", "loop", "muted", "crossorigin", "artwork",
        "artist", "album", "dock", "rotate-to-fullscreen",
    ]),
    ("audio", &["src", "autoplay", "controls", "loop", "muted", "preload"]),
    ("blockquote", &["cite"]),
    ("button", &["type", "name", "value", "disabled"]),
    ("col", &["span"]),
    ("colgroup", &["span"]),
    ("data", &["value"]),
    ("del", &["cite", "datetime"]),
    ("details", &["open"]),
    ("iframe", &["src", "width", "height", "frameborder", "allow", "allowfullscreen", "sandbox"]),
    ("img", &["src", "srcset", "sizes", "alt", "width", "height", "loading", "decoding"]),
    ("ins", &["cite", "datetime"]),
    ("li", &["value"]),
    ("ol", &["reversed", "start", "type"]),
    ("q", &["cite"]),
    ("script", &["type", "src", "async", "custom-element", "custom-template"]),
    ("source", &["src", "srcset", "sizes", "type", "media"]),
    ("td", &["colspan", "rowspan", "headers"]),
    ("th", &["colspan", "rowspan", "headers", "scope", "abbr"]),
    ("time", &["datetime"]),
    ("track", &["src", "kind", "srclang", "label", "default"]),
    ("video", &[
        "src", "poster", "width", "height", "autoplay", "controls", "loop", "muted", "playsinline",
        "preload",
    ]),
];

/// Attributes holding a URL.
const URL_ATTRS: &[&str] = &["href", "src", "srcset", "poster", "cite", "action", "formaction"];

/// What to do with an element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TagPolicy {
    /// Keep the element, filtering its attributes.
    Keep,
    /// Replace the element by its children.
    Unwrap,
    /// Remove the element and its content.
    Remove,
}

/// The allow-list, plus extras configured through stage arguments.
#[derive(Debug, Default)]
pub(crate) struct AllowList {
    extra_tags: HashSet<String>,
    extra_attrs: HashSet<String>,
}

impl AllowList {
    /// Build from the `allowed_tags` and `allowed_attributes` arguments.
    pub(crate) fn from_args(args: &Args) -> Self {
        let lower = |items: Vec<String>| -> HashSet<String> {
            items
                .into_iter()
                .map(|item| item.trim().to_ascii_lowercase())
                .filter(|item| !item.is_empty())
                .collect()
        };
        Self {
            extra_tags: lower(args.get_str_list("allowed_tags")),
            extra_attrs: lower(args.get_str_list("allowed_attributes")),
        }
    }

    pub(crate) fn tag_policy(&self, doc: &Document, id: NodeId) -> TagPolicy {
        let Some(tag) = doc.tag(id) else {
            return TagPolicy::Keep;
        };
        if tag == "script" {
            return if is_allowed_script(doc, id) {
                TagPolicy::Keep
            } else {
                TagPolicy::Remove
            };
        }
        if REMOVE_WITH_CONTENT.contains(&tag) {
            return TagPolicy::Remove;
        }
        let allowed = ALLOWED_TAGS.contains(&tag)
            || self.extra_tags.contains(tag)
            || (NOSCRIPT_ONLY_TAGS.contains(&tag) && doc.has_ancestor_tag(id, "noscript"));
        if allowed {
            TagPolicy::Keep
        } else {
            TagPolicy::Unwrap
        }
    }

    /// Whether attribute `name="value"` may stay on a `tag` element.
    pub(crate) fn allows_attr(&self, tag: &str, name: &str, value: &str) -> bool {
        if is_event_handler(name) {
            return false;
        }
        if URL_ATTRS.contains(&name) && is_script_url(value) {
            return false;
        }
        is_open_prefix(name, "data-")
            || is_open_prefix(name, "aria-")
            || GLOBAL_ATTRS.contains(&name)
            || (tag.starts_with("amp-") && AMP_LAYOUT_ATTRS.contains(&name))
            || TAG_ATTRS
                .iter()
                .find(|(t, _)| *t == tag)
                .is_some_and(|(_, attrs)| attrs.contains(&name))
            || self.extra_attrs.contains(name)
    }
}

fn is_open_prefix(name: &str, prefix: &str) -> bool {
    name.len() > prefix.len() && name.starts_with(prefix)
}

/// `onclick`, `onload`, ... but not AMP's own `on` action attribute.
fn is_event_handler(name: &str) -> bool {
    name.len() > 2 && name.starts_with("on")
}

/// Whether a URL value runs script when followed.
fn is_script_url(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();
    compact.starts_with("javascript:") || compact.starts_with("vbscript:")
}
