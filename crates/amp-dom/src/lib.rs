//! Mutable HTML document model for Amped.
//!
//! A [`Document`] owns an arena of nodes addressed by [`NodeId`]. Every node
//! except the root has at most one parent, and structural operations refuse to
//! attach a node that is already attached somewhere else, so a node can never
//! appear twice in the tree.
//!
//! Parsing goes through html5ever's fragment parser; serialization is done by
//! this crate and preserves attribute order and text content.
//!
//! # Example
//!
//! ```
//! use amp_dom::{Attributes, Document};
//!
//! let mut doc = Document::parse(r#"<p><img src="a.png"></p>"#);
//! let img = doc.elements_by_tag("img")[0];
//!
//! let amp_img = doc.create_element("amp-img", Attributes::from_iter([("src", "a.png")]));
//! doc.replace(img, amp_img).unwrap();
//!
//! assert_eq!(doc.to_html(), r#"<p><amp-img src="a.png"></amp-img></p>"#);
//! ```

mod attributes;
mod document;
mod error;
mod parse;
mod serialize;

pub use attributes::Attributes;
pub use document::{Document, NodeId, NodeKind};
pub use error::DomError;
pub use serialize::{escape_attr, escape_text};
