//! Inline CSS extraction.
//!
//! AMP forbids `style` attributes and body `<style>` elements. Their rules are
//! moved into one stylesheet that the caller serves as `<style amp-custom>`.

use std::sync::LazyLock;

use amp_dom::{Document, NodeId};
use regex::Regex;
use sha2::{Digest, Sha256};

use super::convert_each;
use crate::{Args, SanitizeError, Sanitizer};

static IMPORTANT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*!\s*important\b").unwrap());

/// Size limit AMP places on custom CSS.
const DEFAULT_MAX_BYTES: usize = 75_000;

/// Length of the hash suffix in generated class names.
const CLASS_HASH_LEN: usize = 7;

/// When to prepend a size manifest to the collected stylesheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ManifestMode {
    Always,
    WhenExcessive,
    Never,
}

impl ManifestMode {
    fn from_args(args: &Args) -> Result<Self, SanitizeError> {
        match args.get_str("include_manifest_comment").as_deref() {
            None | Some("when_excessive") => Ok(Self::WhenExcessive),
            Some("always") => Ok(Self::Always),
            Some("never") => Ok(Self::Never),
            Some(other) => Err(SanitizeError::InvalidArg {
                stage: "style",
                key: "include_manifest_comment".to_owned(),
                message: format!("expected always, when_excessive or never, got '{other}'"),
            }),
        }
    }
}

/// Moves inline CSS into a collected stylesheet.
///
/// Each `style` attribute becomes a class `amp-wp-{hash}` with a matching
/// rule, `!important` removed. Body `<style>` elements are collected and
/// removed. Identical declarations share one class and one rule.
///
/// Arguments:
/// - `include_manifest_comment`: `always`, `when_excessive` (default) or
///   `never`.
/// - `max_bytes`: stylesheet size counted as excessive (default 75000).
#[derive(Debug, Default)]
pub struct StyleSanitizer {
    styles: Vec<String>,
}

impl StyleSanitizer {
    /// Create the stage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push_rule(&mut self, rule: String) {
        if !self.styles.contains(&rule) {
            self.styles.push(rule);
        }
    }
}

impl Sanitizer for StyleSanitizer {
    fn name(&self) -> &'static str {
        "style"
    }

    fn sanitize(&mut self, doc: &mut Document, args: &Args) -> Result<usize, SanitizeError> {
        let manifest = ManifestMode::from_args(args)?;
        let max_bytes = args
            .get_u32("max_bytes")
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(DEFAULT_MAX_BYTES);
        self.styles.clear();

        let with_style: Vec<NodeId> = doc
            .elements()
            .into_iter()
            .filter(|&id| doc.has_attr(id, "style"))
            .collect();
        let mut rules = Vec::new();
        let mut converted = convert_each(self.name(), doc, &with_style, |doc, id| {
            let declarations = doc
                .remove_attr(id, "style")
                .map(|style| normalize_declarations(&style))
                .unwrap_or_default();
            if declarations.is_empty() {
                return Ok(false);
            }
            let class = class_name(&declarations);
            doc.add_class(id, &class);
            rules.push(format!(".{class}{{{declarations}}}"));
            Ok(true)
        });
        // Visited in reverse; rules follow document order
        rules.reverse();

        let style_elements = doc.elements_by_tag("style");
        let mut sheets = Vec::new();
        converted += convert_each(self.name(), doc, &style_elements, |doc, style| {
            let css = strip_important(doc.text_content(style).trim());
            doc.detach(style);
            if !css.is_empty() {
                sheets.push(css);
            }
            Ok(true)
        });
        sheets.reverse();

        for rule in sheets.into_iter().chain(rules) {
            self.push_rule(rule);
        }

        let size: usize = self.styles.iter().map(String::len).sum();
        let excessive = size > max_bytes;
        if excessive {
            tracing::warn!(size, max_bytes, "collected stylesheet exceeds size limit");
        }
        if manifest == ManifestMode::Always || (manifest == ManifestMode::WhenExcessive && excessive) {
            let comment = format!(
                "/* amp-custom manifest: {} rules, {size} bytes, limit {max_bytes} bytes */",
                self.styles.len()
            );
            self.styles.insert(0, comment);
        }

        Ok(converted)
    }

    fn styles(&self) -> &[String] {
        &self.styles
    }
}

/// `amp-wp-` plus the first hex digits of the declarations' SHA-256.
fn class_name(declarations: &str) -> String {
    let digest = hex::encode(Sha256::digest(declarations.as_bytes()));
    format!("amp-wp-{}", &digest[..CLASS_HASH_LEN])
}

fn strip_important(css: &str) -> String {
    IMPORTANT_RE.replace_all(css, "").into_owned()
}

/// Canonical `name:value;name:value` form of a `style` attribute.
///
/// Property names are lowercased, whitespace around names and values is
/// trimmed, `!important` is removed and empty declarations are dropped.
fn normalize_declarations(style: &str) -> String {
    split_declarations(style)
        .into_iter()
        .filter_map(|declaration| {
            let (name, value) = declaration.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            let value = strip_important(value.trim());
            let value = value.trim();
            (!name.is_empty() && !value.is_empty()).then(|| format!("{name}:{value}"))
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Split on `;` outside quotes and parentheses.
fn split_declarations(style: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote = None;
    let mut start = 0;
    for (i, c) in style.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                parts.push(&style[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&style[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn run(html: &str, args: &Args) -> (String, Vec<String>) {
        let mut doc = Document::parse(html);
        let mut stage = StyleSanitizer::new();
        stage.sanitize(&mut doc, args).unwrap();
        (doc.to_html(), stage.styles().to_vec())
    }

    fn never() -> Args {
        Args::new().with("include_manifest_comment", "never")
    }

    #[test]
    fn test_normalize_declarations() {
        assert_eq!(
            normalize_declarations(" COLOR : red !important;; margin:0 ;"),
            "color:red;margin:0"
        );
        assert_eq!(
            normalize_declarations("background:url('a;b.png');color:blue"),
            "background:url('a;b.png');color:blue"
        );
        assert_eq!(normalize_declarations(" ; "), "");
    }

    #[test]
    fn test_inline_style_becomes_class() {
        let class = class_name("color:red");
        let (out, styles) = run(
            r#"<p class="intro" style="color: red !important">a</p>"#,
            &never(),
        );
        assert_eq!(out, format!(r#"<p class="intro {class}">a</p>"#));
        assert_eq!(styles, vec![format!(".{class}{{color:red}}")]);
        assert_eq!(class.len(), "amp-wp-".len() + 7);
    }

    #[test]
    fn test_identical_styles_share_rule() {
        let (out, styles) = run(
            r#"<p style="color:red">a</p><p style="COLOR: red;">b</p><p style="color:blue">c</p>"#,
            &never(),
        );
        let red = class_name("color:red");
        let blue = class_name("color:blue");
        assert_eq!(
            out,
            format!(r#"<p class="{red}">a</p><p class="{red}">b</p><p class="{blue}">c</p>"#)
        );
        assert_eq!(
            styles,
            vec![format!(".{red}{{color:red}}"), format!(".{blue}{{color:blue}}")]
        );
    }

    #[test]
    fn test_style_elements_are_collected() {
        let (out, styles) = run(
            "<style>.a { color: red !important; }</style><p>x</p><style> </style>",
            &never(),
        );
        assert_eq!(out, "<p>x</p>");
        assert_eq!(styles, vec![".a { color: red; }".to_owned()]);
    }

    #[test]
    fn test_empty_style_attribute_is_dropped() {
        let (out, styles) = run(r#"<p style=" ">x</p>"#, &never());
        assert_eq!(out, "<p>x</p>");
        assert!(styles.is_empty());
    }

    #[test]
    fn test_manifest_modes() {
        let html = r#"<p style="color:red">x</p>"#;

        let (_, styles) = run(html, &Args::new());
        assert_eq!(styles.len(), 1);

        let (_, styles) = run(html, &Args::new().with("include_manifest_comment", "always"));
        assert!(styles[0].starts_with("/* amp-custom manifest: 1 rules"), "{styles:?}");

        let args = Args::new().with("max_bytes", 5);
        let (_, styles) = run(html, &args);
        assert_eq!(styles.len(), 2);
        assert!(styles[0].contains("limit 5 bytes"), "{styles:?}");
    }

    #[test]
    fn test_invalid_manifest_mode() {
        let mut doc = Document::parse("<p>x</p>");
        let err = StyleSanitizer::new()
            .sanitize(&mut doc, &Args::new().with("include_manifest_comment", "sometimes"))
            .unwrap_err();
        assert!(matches!(err, SanitizeError::InvalidArg { stage: "style", .. }));
    }

    #[test]
    fn test_rerun_starts_fresh() {
        let mut stage = StyleSanitizer::new();
        let mut doc = Document::parse(r#"<p style="color:red">x</p>"#);
        stage.sanitize(&mut doc, &never()).unwrap();
        let mut doc = Document::parse("<p>y</p>");
        stage.sanitize(&mut doc, &never()).unwrap();
        assert!(stage.styles().is_empty());
    }
}
