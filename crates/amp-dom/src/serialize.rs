//! HTML serialization.

use std::fmt::Write;

use crate::{Document, NodeId, NodeKind};

/// Elements that never have content or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose text children are written without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script",
    "style",
    "xmp",
    "iframe",
    "noembed",
    "noframes",
    "plaintext",
];

impl Document {
    /// Serialize the whole document (the root's children).
    #[must_use]
    pub fn to_html(&self) -> String {
        self.inner_html(self.root())
    }

    /// Serialize the children of `id`.
    #[must_use]
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        let raw = self.tag(id).is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag));
        for &child in self.children(id) {
            self.write_node(&mut out, child, raw);
        }
        out
    }

    /// Serialize `id` itself, including its own tag.
    #[must_use]
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(&mut out, id, false);
        out
    }

    fn write_node(&self, out: &mut String, id: NodeId, raw_parent: bool) {
        let mut stack = vec![Step::Enter(id, raw_parent)];
        while let Some(step) = stack.pop() {
            let (id, raw_parent) = match step {
                Step::Enter(id, raw_parent) => (id, raw_parent),
                Step::Close(name) => {
                    let _ = write!(out, "</{name}>");
                    continue;
                }
            };
            match self.kind(id) {
                NodeKind::Root => {
                    let children = self.children(id).iter().rev();
                    stack.extend(children.map(|&child| Step::Enter(child, false)));
                }
                NodeKind::Text(text) => {
                    if raw_parent {
                        out.push_str(text);
                    } else {
                        out.push_str(&escape_text(text));
                    }
                }
                NodeKind::Comment(text) => {
                    let _ = write!(out, "<!--{text}-->");
                }
                NodeKind::Element { name, attrs } => {
                    out.push('<');
                    out.push_str(name);
                    for (attr, value) in attrs.iter() {
                        let _ = write!(out, " {attr}=\"{}\"", escape_attr(value));
                    }
                    out.push('>');
                    if VOID_ELEMENTS.contains(&name.as_str()) {
                        continue;
                    }
                    let raw = RAW_TEXT_ELEMENTS.contains(&name.as_str());
                    stack.push(Step::Close(name));
                    let children = self.children(id).iter().rev();
                    stack.extend(children.map(|&child| Step::Enter(child, raw)));
                }
            }
        }
    }
}

/// Pending serialization work. Nesting depth lives on the heap, not the
/// call stack.
enum Step<'a> {
    /// Write a node; the flag marks a raw-text parent.
    Enter(NodeId, bool),
    /// Write the closing tag of an element whose children are done.
    Close(&'a str),
}

/// Escape text content: `&`, `<`, `>` and non-breaking spaces.
#[must_use]
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a double-quoted attribute value: `&`, `"` and non-breaking spaces.
#[must_use]
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}
