//! Error types for structural document operations.

use crate::NodeId;

/// Error returned when a structural operation would break the tree invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// The node to insert is still attached to a parent.
    #[error("node {0} is already attached to a parent")]
    Attached(NodeId),

    /// The operation needs a parent, but the node is detached.
    #[error("node {0} has no parent")]
    Detached(NodeId),

    /// The node would become its own ancestor.
    #[error("inserting node {0} would create a cycle")]
    Cycle(NodeId),

    /// The document root cannot be moved, replaced, or inserted.
    #[error("the document root cannot be moved")]
    Root,
}
