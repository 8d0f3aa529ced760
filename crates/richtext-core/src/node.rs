//! Document nodes.
//!
//! The document is a tree: one [`NodeData::Root`] holding paragraphs, paragraphs holding inline
//! nodes. Inline nodes are plain text, zero-width placeholders, or decorators. A decorator is an
//! atomic inline node owned by an integration (a mention, an emoji, ...); the host only knows it
//! through the [`DecoratorNode`] trait.

use crate::error::EditorError;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Stable identity of a node across versions of the document state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub(crate) u32);

impl NodeKey {
    /// Raw numeric id (useful for logging).
    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An atomic inline node supplied by an integration.
///
/// The caret never stops inside a decorator: it is one unit for navigation and deletion.
pub trait DecoratorNode: fmt::Debug {
    /// Serialized `type` tag, also the key in the [`NodeRegistry`].
    fn node_type(&self) -> &'static str;

    /// Plain-text content of the node.
    fn text_content(&self) -> String;

    /// Export to the JSON document format. Must include `"type"`.
    fn export_json(&self) -> serde_json::Value;

    /// Visual representation handed to the rendering layer.
    fn decorate(&self) -> String {
        self.text_content()
    }

    /// Clone into a new box (needed because every update copies the node store).
    fn clone_box(&self) -> Box<dyn DecoratorNode>;

    /// Capability access for integrations that need their concrete type back.
    fn as_any(&self) -> &dyn Any;

    /// Mutable capability access, see [`DecoratorNode::as_any`].
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl Clone for Box<dyn DecoratorNode> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Node payload. This is a closed set: every traversal matches it exhaustively.
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root; children are paragraphs.
    Root {
        /// Child paragraphs.
        children: Vec<NodeKey>,
    },
    /// Block of inline content.
    Paragraph {
        /// Inline children.
        children: Vec<NodeKey>,
    },
    /// Simple text run.
    Text {
        /// Text content.
        text: String,
    },
    /// Invisible helper node used by some hosts next to decorators. Carries no text.
    ZeroWidth,
    /// Atomic inline node.
    Decorator(Box<dyn DecoratorNode>),
}

/// A node in the document store.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) key: NodeKey,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) data: NodeData,
}

impl Node {
    /// Node key.
    pub fn key(&self) -> NodeKey {
        self.key
    }

    /// Parent key (`None` for the root and for detached nodes).
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    /// Node payload.
    pub fn data(&self) -> &NodeData {
        &self.data
    }

    /// `true` for simple text nodes.
    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text { .. })
    }

    /// `true` for nodes that can hold children.
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Root { .. } | NodeData::Paragraph { .. })
    }

    /// `true` for paragraphs.
    pub fn is_paragraph(&self) -> bool {
        matches!(self.data, NodeData::Paragraph { .. })
    }

    /// `true` for zero-width placeholder nodes.
    pub fn is_zero_width(&self) -> bool {
        matches!(self.data, NodeData::ZeroWidth)
    }

    /// `true` for decorator nodes.
    pub fn is_decorator(&self) -> bool {
        matches!(self.data, NodeData::Decorator(_))
    }

    /// Text of a text node.
    pub fn text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Children of an element node (empty for leaves).
    pub fn children(&self) -> &[NodeKey] {
        match &self.data {
            NodeData::Root { children } | NodeData::Paragraph { children } => children,
            _ => &[],
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<NodeKey>> {
        match &mut self.data {
            NodeData::Root { children } | NodeData::Paragraph { children } => Some(children),
            _ => None,
        }
    }

    /// Decorator payload.
    pub fn decorator(&self) -> Option<&dyn DecoratorNode> {
        match &self.data {
            NodeData::Decorator(decorator) => Some(decorator.as_ref()),
            _ => None,
        }
    }

    /// Decorator payload downcast to a concrete type.
    pub fn decorator_as<T: 'static>(&self) -> Option<&T> {
        self.decorator()?.as_any().downcast_ref::<T>()
    }
}

/// Import function for a decorator node type.
pub type DecoratorImportFn =
    Rc<dyn Fn(&serde_json::Value) -> Result<Box<dyn DecoratorNode>, EditorError>>;

/// Registry of decorator node types the host can deserialize.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    importers: HashMap<String, DecoratorImportFn>,
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&String> = self.importers.keys().collect();
        types.sort();
        f.debug_struct("NodeRegistry").field("types", &types).finish()
    }
}

impl NodeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the importer for `node_type`.
    pub fn register<F>(&mut self, node_type: &str, import: F)
    where
        F: Fn(&serde_json::Value) -> Result<Box<dyn DecoratorNode>, EditorError> + 'static,
    {
        self.importers.insert(node_type.to_string(), Rc::new(import));
    }

    /// Returns `true` if `node_type` has an importer.
    pub fn is_registered(&self, node_type: &str) -> bool {
        self.importers.contains_key(node_type)
    }

    /// Import a serialized decorator.
    pub fn import(
        &self,
        node_type: &str,
        value: &serde_json::Value,
    ) -> Result<Box<dyn DecoratorNode>, EditorError> {
        let import = self
            .importers
            .get(node_type)
            .ok_or_else(|| EditorError::UnregisteredNodeType(node_type.to_string()))?;
        (import.as_ref())(value)
    }
}
