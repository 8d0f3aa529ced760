//! JSON document format.
//!
//! ```json
//! {"root": {"type": "root", "version": 1, "children": [
//!   {"type": "paragraph", "version": 1, "children": [
//!     {"type": "text", "version": 1, "text": "Hello "},
//!     {"type": "<decorator type>", "...": "..."}
//!   ]}
//! ]}}
//! ```
//!
//! Built-in nodes are handled here; any other `type` is handed to the [`NodeRegistry`].

use crate::error::EditorError;
use crate::node::{NodeData, NodeKey, NodeRegistry};
use crate::state::EditorState;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SerializedDocument {
    root: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedNode {
    #[serde(rename = "type")]
    node_type: String,
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    children: Option<Vec<Value>>,
}

fn default_version() -> u32 {
    FORMAT_VERSION
}

impl SerializedNode {
    fn element(node_type: &str, children: Vec<Value>) -> Self {
        Self {
            node_type: node_type.to_string(),
            version: FORMAT_VERSION,
            text: None,
            children: Some(children),
        }
    }
}

/// Export a document state (selection excluded).
pub fn export_state(state: &EditorState) -> Value {
    let document = SerializedDocument {
        root: export_node(state, state.root()),
    };
    serde_json::to_value(document).unwrap_or(Value::Null)
}

fn export_node(state: &EditorState, key: NodeKey) -> Value {
    let Some(node) = state.node(key) else {
        return Value::Null;
    };
    let children = || {
        node.children()
            .iter()
            .map(|&child| export_node(state, child))
            .collect::<Vec<_>>()
    };
    let serialized = match node.data() {
        NodeData::Root { .. } => SerializedNode::element("root", children()),
        NodeData::Paragraph { .. } => SerializedNode::element("paragraph", children()),
        NodeData::Text { text } => SerializedNode {
            node_type: "text".to_string(),
            version: FORMAT_VERSION,
            text: Some(text.clone()),
            children: None,
        },
        NodeData::ZeroWidth => SerializedNode {
            node_type: "zeroWidth".to_string(),
            version: FORMAT_VERSION,
            text: None,
            children: None,
        },
        NodeData::Decorator(decorator) => return decorator.export_json(),
    };
    serde_json::to_value(serialized).unwrap_or(Value::Null)
}

/// Import a document. Decorator types are resolved through `registry`.
pub fn import_state(value: &Value, registry: &NodeRegistry) -> Result<EditorState, EditorError> {
    let document: SerializedDocument = serde_json::from_value(value.clone())?;
    let root: SerializedNode = serde_json::from_value(document.root)?;
    if root.node_type != "root" {
        return Err(EditorError::MalformedNode(format!(
            "expected root node, found `{}`",
            root.node_type
        )));
    }

    let mut state = EditorState::empty();
    let root_key = state.root();
    for child in root.children.unwrap_or_default() {
        let paragraph = import_node(&mut state, &child, registry)?;
        if !state.get(paragraph)?.is_paragraph() {
            return Err(EditorError::MalformedNode(
                "root children must be paragraphs".to_string(),
            ));
        }
        state.append(root_key, paragraph)?;
    }
    state.normalize();
    state.clear_dirty();
    Ok(state)
}

fn import_node(
    state: &mut EditorState,
    value: &Value,
    registry: &NodeRegistry,
) -> Result<NodeKey, EditorError> {
    let node_type = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| EditorError::MalformedNode("missing `type`".to_string()))?;

    match node_type {
        "paragraph" => {
            let serialized: SerializedNode = serde_json::from_value(value.clone())?;
            let paragraph = state.create_paragraph();
            for child in serialized.children.unwrap_or_default() {
                let key = import_node(state, &child, registry)?;
                if state.get(key)?.is_element() {
                    return Err(EditorError::MalformedNode(
                        "paragraphs cannot be nested".to_string(),
                    ));
                }
                state.append(paragraph, key)?;
            }
            Ok(paragraph)
        }
        "text" => {
            let serialized: SerializedNode = serde_json::from_value(value.clone())?;
            let text = serialized
                .text
                .ok_or_else(|| EditorError::MalformedNode("text node without `text`".to_string()))?;
            Ok(state.create_text(text))
        }
        "zeroWidth" => Ok(state.create_zero_width()),
        "root" => Err(EditorError::MalformedNode("nested root".to_string())),
        other => {
            let decorator = registry.import(other, value)?;
            Ok(state.create_decorator(decorator))
        }
    }
}
