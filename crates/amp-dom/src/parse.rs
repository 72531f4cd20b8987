//! HTML fragment parsing through html5ever.

use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{LocalName, Namespace, ParseOpts, QualName, parse_fragment};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::{Attributes, Document, NodeId, NodeKind};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

impl Document {
    /// Parse an HTML fragment as if it were the content of a `<body>`.
    ///
    /// Parsing never fails: malformed markup is recovered the same way a
    /// browser would. Scripting is disabled so `<noscript>` content is parsed
    /// as markup instead of raw text.
    #[must_use]
    pub fn parse(html: &str) -> Self {
        let opts = ParseOpts {
            tree_builder: TreeBuilderOpts {
                scripting_enabled: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let context = QualName::new(
            None,
            Namespace::from(HTML_NAMESPACE),
            LocalName::from("body"),
        );
        let dom = parse_fragment(RcDom::default(), opts, context, Vec::new()).one(html);

        let mut doc = Self::new();
        let root = doc.root();

        // The fragment parser wraps its output in a synthetic <html> element.
        for top in dom.document.children.borrow().iter() {
            if matches!(top.data, NodeData::Element { .. }) {
                for child in top.children.borrow().iter() {
                    doc.import(root, child);
                }
            } else {
                doc.import(root, top);
            }
        }
        doc
    }

    /// Copy `handle` and its subtree under `parent`.
    fn import(&mut self, parent: NodeId, handle: &Handle) {
        let mut stack = vec![(parent, Handle::clone(handle))];
        while let Some((parent, handle)) = stack.pop() {
            let kind = match &handle.data {
                NodeData::Element {
                    name,
                    attrs,
                    template_contents,
                    ..
                } => {
                    let attrs = attrs
                        .borrow()
                        .iter()
                        .map(|attr| (attribute_name(&attr.name), attr.value.to_string()))
                        .collect::<Attributes>();
                    let id = self.push(NodeKind::Element {
                        name: name.local.to_string(),
                        attrs,
                    });
                    self.attach_unchecked(parent, id);

                    let mut children: Vec<Handle> = template_contents
                        .borrow()
                        .as_ref()
                        .map(|contents| contents.children.borrow().clone())
                        .unwrap_or_default();
                    children.extend(handle.children.borrow().iter().cloned());
                    stack.extend(children.into_iter().rev().map(|child| (id, child)));
                    continue;
                }
                NodeData::Text { contents } => NodeKind::Text(contents.borrow().to_string()),
                NodeData::Comment { contents } => NodeKind::Comment(contents.to_string()),
                NodeData::Document
                | NodeData::Doctype { .. }
                | NodeData::ProcessingInstruction { .. } => continue,
            };
            let id = self.push(kind);
            self.attach_unchecked(parent, id);
        }
    }
}

fn attribute_name(name: &QualName) -> String {
    match &name.prefix {
        Some(prefix) => format!("{prefix}:{}", name.local),
        None => name.local.to_string(),
    }
}
