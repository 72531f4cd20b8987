//! Arena-backed document tree.

use std::fmt;

use crate::{Attributes, DomError};

/// Handle to a node inside a [`Document`].
///
/// Ids are only meaningful for the document that created them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Payload of a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// The fragment root. Exactly one per document.
    Root,
    /// An element with its tag name and ordered attributes.
    Element {
        /// Lowercase tag name (e.g., "div", "amp-img").
        name: String,
        /// Ordered attributes.
        attrs: Attributes,
    },
    /// A text node.
    Text(String),
    /// A comment.
    Comment(String),
}

#[derive(Clone, Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A mutable HTML tree.
///
/// Nodes are stored in an arena and never freed: detached nodes simply stop
/// being reachable from [`root`](Self::root). A document lives for a single
/// conversion, so the garbage is bounded by the input size.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// The fragment root.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Payload of `id`.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    /// Tag name of an element, `None` for text, comments and the root.
    #[must_use]
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Whether `id` is an element.
    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        self.tag(id).is_some()
    }

    /// Whether `id` is an element with the given tag name.
    #[must_use]
    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }

    /// Text of a text node.
    #[must_use]
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Attributes of an element.
    #[must_use]
    pub fn attrs(&self, id: NodeId) -> Option<&Attributes> {
        match &self.node(id).kind {
            NodeKind::Element { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    /// Mutable attributes of an element.
    pub fn attrs_mut(&mut self, id: NodeId) -> Option<&mut Attributes> {
        match &mut self.node_mut(id).kind {
            NodeKind::Element { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    /// Value of attribute `name` on `id`.
    #[must_use]
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)?.get(name)
    }

    /// Whether `id` carries attribute `name`.
    #[must_use]
    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attrs(id).is_some_and(|attrs| attrs.contains(name))
    }

    /// Set attribute `name` on an element. No-op for non-elements.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(attrs) = self.attrs_mut(id) {
            attrs.set(name, value);
        }
    }

    /// Remove attribute `name`, returning its value.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.attrs_mut(id)?.remove(name)
    }

    /// Whether the whitespace-separated `class` attribute contains `class`.
    #[must_use]
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|value| value.split_ascii_whitespace().any(|c| c == class))
    }

    /// Append `class` to the `class` attribute unless already present.
    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            return;
        }
        let value = match self.attr(id, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
            _ => class.to_owned(),
        };
        self.set_attr(id, "class", value);
    }

    /// Parent of `id`, `None` for the root and detached nodes.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Ordered children of `id`.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Element children of `id`, in order.
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|&child| self.is_element(child))
    }

    /// Ancestors of `id`, nearest first, ending at the root (if attached).
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), |&current| self.parent(current))
    }

    /// Whether any ancestor of `id` is an element named `tag`.
    #[must_use]
    pub fn has_ancestor_tag(&self, id: NodeId, tag: &str) -> bool {
        self.ancestors(id).any(|ancestor| self.is_tag(ancestor, tag))
    }

    /// Whether `id` is reachable from the root.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root() || self.ancestors(id).any(|ancestor| ancestor == self.root())
    }

    /// All descendants of `id` in document (pre-)order, excluding `id`.
    ///
    /// The returned vector is a snapshot: mutating the tree afterwards does
    /// not change it.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Every attached element named `tag`, in document order.
    ///
    /// Stages that replace nodes iterate this snapshot in reverse so that a
    /// replacement never disturbs nodes that have not been visited yet.
    #[must_use]
    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&id| self.is_tag(id, tag))
            .collect()
    }

    /// Every attached element, in document order.
    #[must_use]
    pub fn elements(&self) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&id| self.is_element(id))
            .collect()
    }

    /// Concatenated text of all descendant text nodes.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|node| self.text(node))
            .collect()
    }

    /// Create a detached element.
    pub fn create_element(&mut self, name: impl Into<String>, attrs: Attributes) -> NodeId {
        self.push(NodeKind::Element {
            name: name.into(),
            attrs,
        })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    /// Create a detached comment.
    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Comment(text.into()))
    }

    /// Append a detached `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insertable(parent, child)?;
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
        Ok(())
    }

    /// Insert a detached `child` immediately before `reference`.
    pub fn insert_before(&mut self, reference: NodeId, child: NodeId) -> Result<(), DomError> {
        let parent = self.parent(reference).ok_or(DomError::Detached(reference))?;
        self.check_insertable(parent, child)?;
        let index = self.index_in_parent(parent, reference);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.insert(index, child);
        Ok(())
    }

    /// Detach `id` from its parent. Detaching a detached node is a no-op.
    ///
    /// The node keeps its own subtree and can be re-inserted elsewhere.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };
        let index = self.index_in_parent(parent, id);
        self.node_mut(parent).children.remove(index);
        self.node_mut(id).parent = None;
    }

    /// Put the detached node `new` at the position of `old`, detaching `old`.
    ///
    /// After this returns, `new` has `old`'s former parent and index and
    /// `old` is detached with its subtree intact.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), DomError> {
        if old == self.root() {
            return Err(DomError::Root);
        }
        let parent = self.parent(old).ok_or(DomError::Detached(old))?;
        self.check_insertable(parent, new)?;
        if self.ancestors(parent).any(|ancestor| ancestor == new) {
            return Err(DomError::Cycle(new));
        }
        let index = self.index_in_parent(parent, old);
        self.node_mut(parent).children[index] = new;
        self.node_mut(new).parent = Some(parent);
        self.node_mut(old).parent = None;
        Ok(())
    }

    /// Replace `id` with its own children, keeping their order.
    pub fn unwrap_node(&mut self, id: NodeId) -> Result<(), DomError> {
        if id == self.root() {
            return Err(DomError::Root);
        }
        let parent = self.parent(id).ok_or(DomError::Detached(id))?;
        let index = self.index_in_parent(parent, id);
        let children = std::mem::take(&mut self.node_mut(id).children);
        for &child in &children {
            self.node_mut(child).parent = Some(parent);
        }
        self.node_mut(parent)
            .children
            .splice(index..=index, children);
        self.node_mut(id).parent = None;
        Ok(())
    }

    /// Deep-copy `id` and its subtree into a new detached node.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let copy = self.push(self.node(id).kind.clone());
        // (source, copy) pairs whose children still need copying
        let mut stack = vec![(id, copy)];
        while let Some((source, target)) = stack.pop() {
            let children = self.children(source).to_vec();
            for child in children {
                let child_copy = self.push(self.node(child).kind.clone());
                self.attach_unchecked(target, child_copy);
                stack.push((child, child_copy));
            }
        }
        copy
    }

    /// Append a node while building the tree from a trusted source.
    pub(crate) fn attach_unchecked(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    pub(crate) fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if child == self.root() {
            return Err(DomError::Root);
        }
        if self.node(child).parent.is_some() {
            return Err(DomError::Attached(child));
        }
        if parent == child || self.ancestors(parent).any(|ancestor| ancestor == child) {
            return Err(DomError::Cycle(child));
        }
        Ok(())
    }

    fn index_in_parent(&self, parent: NodeId, child: NodeId) -> usize {
        self.node(parent)
            .children
            .iter()
            .position(|&c| c == child)
            .unwrap_or_else(|| unreachable!("node {child} not listed under its parent {parent}"))
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }
}
