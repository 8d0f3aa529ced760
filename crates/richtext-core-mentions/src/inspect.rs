//! Selection inspector: what surrounds a collapsed caret.

use crate::pattern::PatternSet;
use richtext_core::text::{char_at, char_len, char_slice};
use richtext_core::{EditorState, NodeKey, Point};

/// Snapshot of the caret surroundings. Only produced for a collapsed selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionContext {
    /// Node the caret resolves to.
    pub node: NodeKey,
    /// Char offset within `node`. Element points report 0 when the caret sits before the node
    /// and the node's length when it sits after it.
    pub offset: usize,
    /// Whether the caret is a text point.
    pub is_text_point: bool,
    /// Whether `node` is a plain text node.
    pub is_text_node: bool,
    /// Text content of `node`.
    pub text_content: String,
    /// Previous sibling, skipping zero-width placeholders.
    pub previous_sibling: Option<NodeKey>,
    /// Next sibling, skipping zero-width placeholders.
    pub next_sibling: Option<NodeKey>,
    /// Caret at offset 0.
    pub cursor_at_start: bool,
    /// Caret at the end of `text_content`.
    pub cursor_at_end: bool,
    /// The char before the caret may be part of a mention body.
    pub word_char_before: bool,
    /// The char after the caret may be part of a mention body.
    pub word_char_after: bool,
    /// The char before the caret is whitespace.
    pub space_before: bool,
    /// The char after the caret is whitespace.
    pub space_after: bool,
}

/// Previous sibling of `key`, treating zero-width placeholders as transparent.
pub fn previous_sibling(state: &EditorState, key: NodeKey) -> Option<NodeKey> {
    let mut current = state.previous_sibling(key);
    while let Some(k) = current {
        if !is_zero_width(state, k) {
            return Some(k);
        }
        current = state.previous_sibling(k);
    }
    None
}

/// Next sibling of `key`, treating zero-width placeholders as transparent.
pub fn next_sibling(state: &EditorState, key: NodeKey) -> Option<NodeKey> {
    let mut current = state.next_sibling(key);
    while let Some(k) = current {
        if !is_zero_width(state, k) {
            return Some(k);
        }
        current = state.next_sibling(k);
    }
    None
}

fn is_zero_width(state: &EditorState, key: NodeKey) -> bool {
    state.node(key).is_some_and(|node| node.is_zero_width())
}

/// Node a point resolves to: the text node itself, or the element child at the offset.
///
/// The flag is `true` when the caret sits after the resolved node.
fn resolve_node(state: &EditorState, point: Point) -> Option<(NodeKey, bool)> {
    match point {
        Point::Text { key, .. } => state.node(key).map(|node| (node.key(), false)),
        Point::Element { key, offset } => {
            let mut current = key;
            let mut offset = offset;
            let mut after = false;
            loop {
                let children = state.children(current);
                let node = state.node(current)?;
                if !node.is_element() || children.is_empty() {
                    return Some((current, after));
                }
                after = offset >= children.len();
                let child = children.get(offset).or(children.last()).copied()?;
                if !state.node(child)?.is_element() {
                    return Some((child, after));
                }
                current = child;
                offset = if after { usize::MAX } else { 0 };
            }
        }
    }
}

/// Inspect the caret. `None` when the selection is missing, not collapsed or unresolvable.
pub fn inspect(state: &EditorState, patterns: &PatternSet) -> Option<SelectionContext> {
    let selection = state.selection()?;
    if !selection.is_collapsed() {
        return None;
    }
    let (resolved, mut caret_after) = resolve_node(state, selection.anchor)?;
    // A placeholder hands the caret to its neighbour: after the previous node, else before the
    // next one.
    let node = if is_zero_width(state, resolved) {
        match previous_sibling(state, resolved) {
            Some(prev) => {
                caret_after = true;
                prev
            }
            None => {
                caret_after = false;
                next_sibling(state, resolved)?
            }
        }
    } else {
        resolved
    };

    let is_text_point = selection.anchor.is_text();
    let is_text_node = state.is_text(node);
    let text_content = state.text_content(node);
    let len = char_len(&text_content);
    let offset = match (is_text_point, caret_after) {
        (true, _) => selection.anchor.offset(),
        (false, true) => len,
        (false, false) => 0,
    };

    let (before, after) = if is_text_node {
        (
            offset.checked_sub(1).and_then(|i| char_at(&text_content, i)),
            char_at(&text_content, offset),
        )
    } else {
        (None, None)
    };

    Some(SelectionContext {
        node,
        offset,
        is_text_point,
        is_text_node,
        previous_sibling: previous_sibling(state, node),
        next_sibling: next_sibling(state, node),
        cursor_at_start: offset == 0,
        cursor_at_end: offset == len,
        word_char_before: before.is_some_and(|c| patterns.is_word_char(c)),
        word_char_after: after.is_some_and(|c| patterns.is_word_char(c)),
        space_before: before.is_some_and(char::is_whitespace),
        space_after: after.is_some_and(char::is_whitespace),
        text_content,
    })
}

/// Text of the caret's text node up to the caret, if the caret is a text point.
pub fn text_before_caret(state: &EditorState) -> Option<(NodeKey, usize, String)> {
    let selection = state.selection()?;
    if !selection.is_collapsed() {
        return None;
    }
    let Point::Text { key, offset } = selection.anchor else {
        return None;
    };
    let text = state.text(key)?;
    let prefix = char_slice(text, 0, offset).to_string();
    Some((key, offset, prefix))
}
