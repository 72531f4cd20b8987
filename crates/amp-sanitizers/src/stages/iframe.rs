//! `iframe` to `amp-iframe` conversion.

use amp_dom::{Attributes, Document, NodeId};

use super::{
    DEFAULT_FALLBACK_HEIGHT, attrs_without, candidates_outside_noscript, convert_each,
    dimension_attr, media_layout, media_noscript,
};
use crate::{Args, SanitizeError, Sanitizer};

/// Sandbox applied when the source iframe has none.
const DEFAULT_SANDBOX: &str = "allow-scripts allow-same-origin";

/// Class of the loading placeholder.
const PLACEHOLDER_CLASS: &str = "amp-wp-iframe-placeholder";

/// Attributes `amp-iframe` rejects or recomputes.
const DROPPED_ATTRS: &[&str] = &["width", "height", "src", "frameborder", "loading"];

/// Converts `iframe` elements to `amp-iframe`.
///
/// Arguments:
/// - `add_placeholder`: append a placeholder shown while the frame loads.
/// - `current_origin`: origin that relative sources resolve against.
/// - `fallback_height`: height for frames without a numeric one (default 400).
#[derive(Debug, Default)]
pub struct IframeSanitizer;

impl IframeSanitizer {
    /// Create the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Sanitizer for IframeSanitizer {
    fn name(&self) -> &'static str {
        "iframe"
    }

    fn sanitize(&mut self, doc: &mut Document, args: &Args) -> Result<usize, SanitizeError> {
        let options = IframeOptions {
            add_placeholder: args.get_bool("add_placeholder"),
            current_origin: args.get_str("current_origin"),
            fallback_height: args
                .get_u32("fallback_height")
                .unwrap_or(DEFAULT_FALLBACK_HEIGHT),
        };
        let candidates = candidates_outside_noscript(doc, "iframe");
        Ok(convert_each(self.name(), doc, &candidates, |doc, iframe| {
            convert_iframe(doc, iframe, &options)
        }))
    }
}

struct IframeOptions {
    add_placeholder: bool,
    current_origin: Option<String>,
    fallback_height: u32,
}

fn convert_iframe(
    doc: &mut Document,
    iframe: NodeId,
    options: &IframeOptions,
) -> Result<bool, SanitizeError> {
    let src = doc.attr(iframe, "src").map(str::trim).unwrap_or_default();
    if src.is_empty() {
        doc.detach(iframe);
        return Ok(false);
    }
    let src = absolute_src(src, options.current_origin.as_deref());

    let mut attrs = Attributes::new();
    attrs.set("src", src);
    attrs.extend(attrs_without(doc, iframe, DROPPED_ATTRS).iter());
    if doc.attr(iframe, "frameborder").is_some_and(|v| v.trim() == "0") {
        attrs.set("frameborder", "0");
    }
    if !attrs.contains("sandbox") {
        attrs.set("sandbox", DEFAULT_SANDBOX);
    }
    attrs.extend(media_layout(
        dimension_attr(doc, iframe, "width"),
        dimension_attr(doc, iframe, "height"),
        options.fallback_height,
    ));

    let noscript = media_noscript(doc, iframe)?;
    let amp_iframe = doc.create_element("amp-iframe", attrs);
    if options.add_placeholder {
        let placeholder = doc.create_element(
            "span",
            Attributes::from_iter([("placeholder", ""), ("class", PLACEHOLDER_CLASS)]),
        );
        doc.append_child(amp_iframe, placeholder)?;
    }
    doc.append_child(amp_iframe, noscript)?;
    doc.replace(iframe, amp_iframe)?;
    Ok(true)
}

/// Make `src` absolute: scheme-relative sources use https, path-relative ones
/// are joined to `origin` when one is known.
fn absolute_src(src: &str, origin: Option<&str>) -> String {
    if let Some(rest) = src.strip_prefix("//") {
        return format!("https://{rest}");
    }
    if src.contains("://") {
        return src.to_owned();
    }
    match origin {
        Some(origin) => {
            let origin = origin.trim_end_matches('/');
            let path = src.trim_start_matches('/');
            format!("{origin}/{path}")
        }
        None => src.to_owned(),
    }
}
