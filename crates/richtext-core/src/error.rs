//! Document errors.

use crate::node::NodeKey;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors produced by document operations.
pub enum EditorError {
    #[error("node {0} does not exist")]
    /// The key does not resolve to a node in the current state.
    MissingNode(NodeKey),

    #[error("node {0} is not a text node")]
    /// A text operation was applied to a non-text node.
    NotText(NodeKey),

    #[error("node {0} cannot have children")]
    /// A child operation was applied to a leaf node.
    NotElement(NodeKey),

    #[error("node {0} is not attached to the document")]
    /// A sibling operation was applied to a detached node.
    Detached(NodeKey),

    #[error("invalid offset {offset} for node {key}")]
    /// An offset is outside the node's content.
    InvalidOffset {
        /// The node.
        key: NodeKey,
        /// The rejected offset.
        offset: usize,
    },

    #[error("node type `{0}` is not registered")]
    /// Deserialization met a decorator type without an importer.
    UnregisteredNodeType(String),

    #[error("malformed serialized node: {0}")]
    /// A serialized node is missing fields or has the wrong shape.
    MalformedNode(String),

    #[error("JSON error: {0}")]
    /// JSON (de)serialization failed.
    Json(#[from] serde_json::Error),

    #[error("nothing to undo")]
    /// The undo stack is empty.
    NothingToUndo,

    #[error("nothing to redo")]
    /// The redo stack is empty.
    NothingToRedo,
}
