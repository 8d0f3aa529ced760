#![allow(dead_code)]

use richtext_core::{Editor, Key, KeyEvent, NodeKey, NodeRegistry, Point};
use richtext_core_mentions::{
    ManualEnvironment, MentionNode, MentionsConfig, MentionsPlugin, SearchRequest, SearchSource,
    as_mention, find_mentions, register_mention_node,
};
use std::cell::RefCell;
use std::rc::Rc;

pub fn triggers() -> Vec<String> {
    vec!["@".to_string(), "#".to_string(), "due:".to_string()]
}

pub fn config() -> MentionsConfig {
    MentionsConfig::new(triggers())
}

/// Editor that can deserialize mention nodes.
pub fn editor() -> Editor {
    let mut registry = NodeRegistry::new();
    register_mention_node(&mut registry, None);
    Editor::with_registry(registry)
}

pub fn setup(config: MentionsConfig) -> (Editor, MentionsPlugin, Rc<ManualEnvironment>) {
    let editor = editor();
    let env = Rc::new(ManualEnvironment::new());
    let plugin = MentionsPlugin::new(&editor, config, env.clone()).unwrap();
    (editor, plugin, env)
}

pub fn type_text(plugin: &mut MentionsPlugin, editor: &mut Editor, text: &str) {
    for c in text.chars() {
        plugin.handle_key(editor, &KeyEvent::char(c));
    }
}

pub fn press(plugin: &mut MentionsPlugin, editor: &mut Editor, key: Key) -> bool {
    plugin.handle_key(editor, &KeyEvent::new(key))
}

/// Replace the document with `text`, converting mentions, and put the caret at the end.
pub fn seed(plugin: &mut MentionsPlugin, editor: &mut Editor, text: &str) {
    assert!(plugin.insert_text_with_mentions(editor, text));
    editor.update(|state| state.select_end());
    plugin.on_update(editor);
}

/// Append a text node and put the caret at `caret` inside it.
pub fn text_with_caret(editor: &mut Editor, text: &str, caret: usize) -> NodeKey {
    editor.update(|state| {
        let paragraph = state.paragraphs()[0];
        let key = state.create_text(text);
        state.append(paragraph, key).unwrap();
        state.select(Point::text(key, caret));
        key
    })
}

/// `(trigger, value)` of every mention in document order.
pub fn mentions(editor: &Editor) -> Vec<(String, String)> {
    let state = editor.state();
    find_mentions(state)
        .into_iter()
        .filter_map(|key| as_mention(state, key))
        .map(|m: &MentionNode| (m.trigger().to_string(), m.value().to_string()))
        .collect()
}

pub fn menu_labels(plugin: &MentionsPlugin) -> Vec<String> {
    plugin
        .menu()
        .items
        .iter()
        .map(|item| item.display_value.clone())
        .collect()
}

/// Search source that records requests for the test to answer.
#[derive(Clone, Default)]
pub struct RecordingSource {
    pub requests: Rc<RefCell<Vec<SearchRequest>>>,
}

impl SearchSource for RecordingSource {
    fn search(&mut self, request: &SearchRequest) {
        self.requests.borrow_mut().push(request.clone());
    }
}

impl RecordingSource {
    pub fn last(&self) -> SearchRequest {
        self.requests.borrow().last().cloned().expect("no search request")
    }

    pub fn count(&self) -> usize {
        self.requests.borrow().len()
    }
}
