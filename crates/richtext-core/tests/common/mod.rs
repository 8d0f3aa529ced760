#![allow(dead_code)]

use richtext_core::{DecoratorNode, EditorError, EditorState, NodeKey, NodeRegistry};
use serde_json::{Value, json};
use std::any::Any;

/// Minimal decorator used to exercise atomic inline nodes.
#[derive(Debug, Clone)]
pub struct Chip(pub String);

impl DecoratorNode for Chip {
    fn node_type(&self) -> &'static str {
        "chip"
    }

    fn text_content(&self) -> String {
        self.0.clone()
    }

    fn export_json(&self) -> Value {
        json!({ "type": "chip", "label": self.0, "version": 1 })
    }

    fn clone_box(&self) -> Box<dyn DecoratorNode> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub fn import_chip(value: &Value) -> Result<Box<dyn DecoratorNode>, EditorError> {
    let label = value
        .get("label")
        .and_then(Value::as_str)
        .ok_or_else(|| EditorError::MalformedNode("chip without label".to_string()))?;
    Ok(Box::new(Chip(label.to_string())))
}

pub fn chip_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    registry.register("chip", import_chip);
    registry
}

/// Append a text node to the first paragraph.
pub fn push_text(state: &mut EditorState, text: &str) -> NodeKey {
    let paragraph = state.paragraphs()[0];
    let key = state.create_text(text);
    state.append(paragraph, key).unwrap();
    key
}

/// Append a chip to the first paragraph.
pub fn push_chip(state: &mut EditorState, label: &str) -> NodeKey {
    let paragraph = state.paragraphs()[0];
    let key = state.create_decorator(Box::new(Chip(label.to_string())));
    state.append(paragraph, key).unwrap();
    key
}
