//! Mention token node.
//!
//! # Overview
//!
//! A [`MentionNode`] is an atomic decorator node holding a trigger, a value and optional
//! scalar metadata. Its text content is always `trigger + value`; the caret never stops inside
//! it. The host resolves every key against its latest committed state, so the accessors here
//! always read the current version of a token.
//!
//! # Persisted layout
//!
//! ```json
//! {"type": "beautifulMention", "version": 1, "trigger": "@", "value": "John", "data": {"id": 7}}
//! ```
//!
//! `data` is omitted entirely when absent. The DOM form is a `<span>` carrying the same fields
//! in `data-lexical-beautiful-mention-*` attributes.

use indexmap::IndexMap;
use richtext_core::{DecoratorNode, EditorError, EditorState, NodeKey, NodeRegistry};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Serialized node type of mention tokens.
pub const MENTION_NODE_TYPE: &str = "beautifulMention";

const NODE_VERSION: u32 = 1;

/// Marker attribute of the DOM form.
pub const DOM_ATTR: &str = "data-lexical-beautiful-mention";
/// Trigger attribute of the DOM form.
pub const DOM_ATTR_TRIGGER: &str = "data-lexical-beautiful-mention-trigger";
/// Value attribute of the DOM form.
pub const DOM_ATTR_VALUE: &str = "data-lexical-beautiful-mention-value";
/// JSON-encoded data attribute of the DOM form.
pub const DOM_ATTR_DATA: &str = "data-lexical-beautiful-mention-data";

/// Scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    /// `null`
    Null,
    /// Boolean.
    Bool(bool),
    /// Number.
    Number(serde_json::Number),
    /// String.
    String(String),
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        DataValue::String(value.to_string())
    }
}

impl From<bool> for DataValue {
    fn from(value: bool) -> Self {
        DataValue::Bool(value)
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        DataValue::Number(value.into())
    }
}

/// Ordered metadata attached to a mention.
pub type MentionData = IndexMap<String, DataValue>;

/// Render strategy for mention tokens.
pub trait MentionComponent {
    /// Produce the visual representation handed to the rendering layer.
    fn render(&self, trigger: &str, value: &str, data: Option<&MentionData>) -> String;
}

/// The mention token.
#[derive(Clone)]
pub struct MentionNode {
    trigger: String,
    value: String,
    data: Option<MentionData>,
    component: Option<Rc<dyn MentionComponent>>,
}

impl fmt::Debug for MentionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MentionNode")
            .field("trigger", &self.trigger)
            .field("value", &self.value)
            .field("data", &self.data)
            .field("component", &self.component.is_some())
            .finish()
    }
}

impl PartialEq for MentionNode {
    fn eq(&self, other: &Self) -> bool {
        self.trigger == other.trigger && self.value == other.value && self.data == other.data
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedMention {
    #[serde(rename = "type")]
    node_type: String,
    #[serde(default = "default_version")]
    version: u32,
    trigger: String,
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

fn default_version() -> u32 {
    NODE_VERSION
}

fn parse_data(value: Value) -> Option<MentionData> {
    match serde_json::from_value::<MentionData>(value) {
        Ok(data) => Some(data),
        Err(err) => {
            log::warn!("ignoring malformed mention data: {err}");
            None
        }
    }
}

impl MentionNode {
    /// A new token.
    pub fn new(
        trigger: impl Into<String>,
        value: impl Into<String>,
        data: Option<MentionData>,
    ) -> Self {
        Self {
            trigger: trigger.into(),
            value: value.into(),
            data,
            component: None,
        }
    }

    /// Attach a render strategy.
    pub fn with_component(mut self, component: Option<Rc<dyn MentionComponent>>) -> Self {
        self.component = component;
        self
    }

    /// Trigger.
    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    /// Value (without the trigger).
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Metadata.
    pub fn data(&self) -> Option<&MentionData> {
        self.data.as_ref()
    }

    /// Replace the value.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// Replace the metadata.
    pub fn set_data(&mut self, data: Option<MentionData>) {
        self.data = data;
    }

    /// Export to the JSON document format.
    pub fn to_json(&self) -> Value {
        let serialized = SerializedMention {
            node_type: MENTION_NODE_TYPE.to_string(),
            version: NODE_VERSION,
            trigger: self.trigger.clone(),
            value: self.value.clone(),
            data: self
                .data
                .as_ref()
                .and_then(|data| serde_json::to_value(data).ok()),
        };
        serde_json::to_value(serialized).unwrap_or(Value::Null)
    }

    /// Import from the JSON document format. Malformed `data` is dropped with a warning.
    pub fn from_json(value: &Value) -> Result<Self, EditorError> {
        let serialized: SerializedMention = serde_json::from_value(value.clone())?;
        if serialized.node_type != MENTION_NODE_TYPE {
            return Err(EditorError::MalformedNode(format!(
                "expected `{MENTION_NODE_TYPE}`, found `{}`",
                serialized.node_type
            )));
        }
        Ok(Self::new(
            serialized.trigger,
            serialized.value,
            serialized.data.and_then(parse_data),
        ))
    }

    /// Export to the DOM form.
    pub fn export_dom(&self) -> DomElement {
        let mut element = DomElement::new("span");
        element.set_attribute(DOM_ATTR, "true");
        element.set_attribute(DOM_ATTR_TRIGGER, &self.trigger);
        element.set_attribute(DOM_ATTR_VALUE, &self.value);
        if let Some(data) = &self.data
            && let Ok(json) = serde_json::to_string(data)
        {
            element.set_attribute(DOM_ATTR_DATA, &json);
        }
        element.text = format!("{}{}", self.trigger, self.value);
        element
    }

    /// Import from the DOM form. `None` when the element is not a mention.
    pub fn import_dom(element: &DomElement) -> Option<Self> {
        element.attribute(DOM_ATTR)?;
        let trigger = element.attribute(DOM_ATTR_TRIGGER)?;
        let value = element.attribute(DOM_ATTR_VALUE)?;
        let data = element
            .attribute(DOM_ATTR_DATA)
            .and_then(|raw| match serde_json::from_str::<Value>(raw) {
                Ok(json) => parse_data(json),
                Err(err) => {
                    log::warn!("failed to parse data attribute of mention node: {err}");
                    None
                }
            });
        Some(Self::new(trigger, value, data))
    }
}

impl DecoratorNode for MentionNode {
    fn node_type(&self) -> &'static str {
        MENTION_NODE_TYPE
    }

    fn text_content(&self) -> String {
        format!("{}{}", self.trigger, self.value)
    }

    fn export_json(&self) -> Value {
        self.to_json()
    }

    fn decorate(&self) -> String {
        match &self.component {
            Some(component) => component.render(&self.trigger, &self.value, self.data.as_ref()),
            None => self.text_content(),
        }
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

/// A detached DOM element (tag, ordered attributes, text content).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DomElement {
    /// Tag name.
    pub tag: String,
    /// Attributes in insertion order.
    pub attributes: IndexMap<String, String>,
    /// Text content.
    pub text: String,
}

impl DomElement {
    /// Empty element.
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    /// Attribute value.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Set an attribute.
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        self.attributes.insert(name.to_string(), value.to_string());
    }

    /// Serialize as HTML.
    pub fn to_html(&self) -> String {
        let mut html = format!("<{}", self.tag);
        for (name, value) in &self.attributes {
            html.push_str(&format!(" {name}=\"{}\"", escape_html(value, true)));
        }
        html.push('>');
        html.push_str(&escape_html(&self.text, false));
        html.push_str(&format!("</{}>", self.tag));
        html
    }
}

fn escape_html(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Register the mention node type with a host registry.
///
/// Imported tokens get `component` as their render strategy.
pub fn register_mention_node(
    registry: &mut NodeRegistry,
    component: Option<Rc<dyn MentionComponent>>,
) {
    registry.register(MENTION_NODE_TYPE, move |value| {
        let node = MentionNode::from_json(value)?.with_component(component.clone());
        Ok(Box::new(node) as Box<dyn DecoratorNode>)
    });
}

/// The mention token at `key`, if the node is one.
pub fn as_mention(state: &EditorState, key: NodeKey) -> Option<&MentionNode> {
    state.node(key)?.decorator_as::<MentionNode>()
}

/// `true` when the node at `key` is a mention token.
pub fn is_mention(state: &EditorState, key: Option<NodeKey>) -> bool {
    key.is_some_and(|key| as_mention(state, key).is_some())
}

/// Create a detached mention token.
pub fn create_mention(state: &mut EditorState, node: MentionNode) -> NodeKey {
    state.create_decorator(Box::new(node))
}

/// All attached mention tokens in document order.
pub fn find_mentions(state: &EditorState) -> Vec<NodeKey> {
    state
        .decorators()
        .into_iter()
        .filter(|&key| as_mention(state, key).is_some())
        .collect()
}

/// Mention tokens with `trigger` and, if given, exactly `value`.
pub fn find_mentions_by(state: &EditorState, trigger: &str, value: Option<&str>) -> Vec<NodeKey> {
    find_mentions(state)
        .into_iter()
        .filter(|&key| {
            as_mention(state, key).is_some_and(|mention| {
                mention.trigger() == trigger && value.is_none_or(|v| mention.value() == v)
            })
        })
        .collect()
}

/// Writable access to the mention at `key`.
pub fn writable_mention(state: &mut EditorState, key: NodeKey) -> Option<&mut MentionNode> {
    state
        .writable_decorator(key)?
        .as_any_mut()
        .downcast_mut::<MentionNode>()
}
