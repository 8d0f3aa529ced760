//! Edit-transformation rules.
//!
//! Each rule mutates an [`EditorState`] inside one host update and reports whether it applied.
//! A rule that finds no usable caret context is a no-op returning `Ok(false)`.

use crate::inspect::{inspect, next_sibling, previous_sibling, text_before_caret};
use crate::matching::ActiveMatch;
use crate::node::{
    MentionComponent, MentionData, MentionNode, as_mention, create_mention, find_mentions_by,
    is_mention, writable_mention,
};
use crate::pattern::{PatternSet, QueryMatch, TextSegment};
use richtext_core::text::{char_len, char_slice};
use richtext_core::{EditorError, EditorState, NodeKey};
use std::rc::Rc;

/// Settings shared by the rules.
#[derive(Clone, Copy)]
pub struct RuleContext<'a> {
    /// Compiled patterns.
    pub patterns: &'a PatternSet,
    /// Insert protective spaces.
    pub auto_space: bool,
    /// Render strategy given to new tokens.
    pub component: Option<&'a Rc<dyn MentionComponent>>,
}

impl RuleContext<'_> {
    fn mention(&self, trigger: &str, value: &str, data: Option<MentionData>) -> MentionNode {
        MentionNode::new(trigger, value, data).with_component(self.component.cloned())
    }
}

/// Insert a mention at the caret, or with `value: None` the bare trigger that opens the menu.
///
/// With no selection the caret is first placed at the end of the document.
pub fn insert_mention_at_selection(
    state: &mut EditorState,
    rules: RuleContext<'_>,
    trigger: &str,
    value: Option<&str>,
    data: Option<MentionData>,
) -> Result<bool, EditorError> {
    if state.selection().is_none() {
        state.select_end();
    }
    let Some(context) = inspect(state, rules.patterns) else {
        return Ok(false);
    };

    let inserted = match value {
        Some(value) => create_mention(state, rules.mention(trigger, value, data)),
        None => state.create_text(trigger),
    };

    let at_paragraph_start = state
        .node(context.node)
        .is_some_and(|node| node.is_paragraph())
        && context.cursor_at_start;
    if !at_paragraph_start && !context.is_text_node {
        let mut nodes = Vec::with_capacity(2);
        if rules.auto_space {
            nodes.push(state.create_text(" "));
        }
        nodes.push(inserted);
        return state.insert_nodes(&nodes);
    }

    let is_non_text = |key: Option<NodeKey>| key.is_some_and(|k| !state.is_text(k));
    let lead_space = context.word_char_before
        || (context.cursor_at_start && is_non_text(context.previous_sibling));
    let trail_space =
        context.word_char_after || (context.cursor_at_end && is_non_text(context.next_sibling));

    let mut nodes = Vec::with_capacity(3);
    if rules.auto_space && lead_space {
        nodes.push(state.create_text(" "));
    }
    nodes.push(inserted);
    let mut space = None;
    if rules.auto_space && trail_space {
        let key = state.create_text(" ");
        nodes.push(key);
        space = Some(key);
    }

    if !state.insert_nodes(&nodes)? {
        return Ok(false);
    }
    if nodes.len() > 1 {
        if state.is_text(inserted) {
            state.select_end_of(inserted)?;
        } else if let Some(space) = space {
            state.select_previous(space)?;
        }
    }
    Ok(true)
}

/// Remove mentions with `trigger` (and `value`, if given).
///
/// Spaces around a removed token collapse, and a trailing space left at the end of a paragraph
/// is trimmed. Returns `false` without touching the document when nothing matches.
pub fn remove_mentions(
    state: &mut EditorState,
    trigger: &str,
    value: Option<&str>,
    focus: bool,
) -> Result<bool, EditorError> {
    let targets = find_mentions_by(state, trigger, value);
    if targets.is_empty() {
        return Ok(false);
    }

    let mut neighbours = (None, None);
    for key in targets {
        let prev = previous_sibling(state, key);
        let next = next_sibling(state, key);
        state.remove(key)?;

        let prev_text = prev.and_then(|k| state.text(k)).map(str::to_string);
        let next_text = next.and_then(|k| state.text(k)).map(str::to_string);
        if let (Some(prev_key), Some(prev_text)) = (prev, &prev_text) {
            if prev_text.ends_with(' ') && next_text.as_deref().is_some_and(|t| t.starts_with(' '))
            {
                let len = char_len(prev_text);
                state.set_text(prev_key, char_slice(prev_text, 0, len - 1))?;
            } else if next.is_none() && prev_text.ends_with(' ') {
                state.set_text(prev_key, prev_text.trim_end())?;
            }
        }
        neighbours = (prev, next);
    }

    place_focus(state, neighbours.0, neighbours.1, focus)?;
    Ok(true)
}

/// Give mentions with `trigger` (and `value`, if given) a new value.
pub fn rename_mentions(
    state: &mut EditorState,
    trigger: &str,
    new_value: &str,
    value: Option<&str>,
    focus: bool,
) -> Result<bool, EditorError> {
    let targets = find_mentions_by(state, trigger, value);
    let Some(&last) = targets.last() else {
        return Ok(false);
    };
    for &key in &targets {
        if let Some(mention) = writable_mention(state, key) {
            mention.set_value(new_value);
        }
    }
    let prev = previous_sibling(state, last);
    let next = next_sibling(state, last);
    place_focus(state, prev, next, focus)?;
    Ok(true)
}

fn place_focus(
    state: &mut EditorState,
    prev: Option<NodeKey>,
    next: Option<NodeKey>,
    focus: bool,
) -> Result<(), EditorError> {
    if !focus {
        state.set_selection(None);
        return Ok(());
    }
    match (prev, next) {
        (_, Some(next)) if state.is_text(next) && state.is_attached(next) => {
            state.select_start_of(next)
        }
        (Some(prev), _) if state.is_text(prev) && state.is_attached(prev) => {
            state.select_end_of(prev)
        }
        _ => {
            state.select_end();
            Ok(())
        }
    }
}

/// Keystroke interceptor: add a protective space before `typed` lands in the document.
///
/// Runs only for a single character that is a mention-body character or exactly a trigger.
/// Never replaces the default handling of the key.
pub fn intercept_keystroke(
    state: &mut EditorState,
    rules: RuleContext<'_>,
    typed: char,
) -> Result<bool, EditorError> {
    let mut buf = [0u8; 4];
    let typed_str: &str = typed.encode_utf8(&mut buf);
    let is_trigger = rules.patterns.is_trigger(typed_str);
    if !rules.auto_space || !(is_trigger || rules.patterns.is_word_char(typed)) {
        return Ok(false);
    }
    let Some(context) = inspect(state, rules.patterns) else {
        return Ok(false);
    };

    if context.is_text_node
        && context.cursor_at_start
        && is_mention(state, context.previous_sibling)
    {
        let space = state.create_text(" ");
        state.insert_before(context.node, space)?;
        return Ok(true);
    }
    if context.is_text_node && context.cursor_at_end && is_mention(state, context.next_sibling) {
        let space = state.create_text(" ");
        state.insert_after(context.node, space)?;
        return Ok(true);
    }
    if context.is_text_node && is_trigger && context.word_char_after {
        let before = char_slice(&context.text_content, 0, context.offset);
        let after = char_slice(&context.text_content, context.offset, usize::MAX);
        state.set_text(context.node, format!("{before} {after}"))?;
        return Ok(true);
    }
    if as_mention(state, context.node).is_some()
        && context.cursor_at_end
        && context.next_sibling.is_none()
    {
        let space = state.create_text(" ");
        state.insert_after(context.node, space)?;
        state.select_end_of(space)?;
        return Ok(true);
    }
    Ok(false)
}

/// Backspace next to a mention: turn the mention back into its bare trigger so the menu reopens.
///
/// Returns `true` when the default deletion must be suppressed.
pub fn reopen_adjacent_mention(
    state: &mut EditorState,
    patterns: &PatternSet,
) -> Result<bool, EditorError> {
    let Some(context) = inspect(state, patterns) else {
        return Ok(false);
    };
    let target = if as_mention(state, context.node).is_some() && context.cursor_at_end {
        context.node
    } else if context.is_text_node
        && context.cursor_at_start
        && is_mention(state, context.previous_sibling)
    {
        match context.previous_sibling {
            Some(prev) => prev,
            None => return Ok(false),
        }
    } else {
        return Ok(false);
    };
    let Some(trigger) = as_mention(state, target).map(|m| m.trigger().to_string()) else {
        return Ok(false);
    };
    let text = state.create_text(trigger);
    state.replace(target, text)?;
    state.select_end_of(text)?;
    Ok(true)
}

/// Match a typed mention that may be converted without the menu (spaces never join).
///
/// `None` when there is no match or the query is empty.
pub fn conversion_candidate(state: &EditorState, patterns: &PatternSet) -> Option<QueryMatch> {
    let (_, _, prefix) = text_before_caret(state)?;
    let found = patterns.find_match(&prefix, false)?;
    (!found.matching_string.is_empty()).then_some(found)
}

/// Replace the typed trigger + query before the caret with a mention whose value is the query.
///
/// The caret ends up right after the new token.
pub fn convert_text_to_mention(
    state: &mut EditorState,
    rules: RuleContext<'_>,
    found: &QueryMatch,
    data: Option<MentionData>,
) -> Result<bool, EditorError> {
    let Some((node, caret, _)) = text_before_caret(state) else {
        return Ok(false);
    };
    let start = found.lead_offset;
    let parts = state.split_text(node, &[start, caret])?;
    let target = if start == 0 { parts[0] } else { parts[1] };
    let mention = create_mention(
        state,
        rules.mention(&found.trigger, &found.matching_string, data),
    );
    state.replace(target, mention)?;
    state.select_next(mention)?;
    Ok(true)
}

/// Length of the text to replace when committing: the longest suffix of `document_text` that is
/// a prefix of `entry_text`, but at least `offset`.
pub fn full_match_offset(document_text: &str, entry_text: &str, offset: usize) -> usize {
    let doc: Vec<char> = document_text.chars().collect();
    let entry: Vec<char> = entry_text.chars().collect();
    let mut match_offset = offset;
    for i in offset..=entry.len() {
        if i <= doc.len() && doc[doc.len() - i..] == entry[..i] {
            match_offset = i;
        }
    }
    match_offset
}

/// Commit a candidate: replace the trigger + query before the caret with a mention.
pub fn commit_candidate(
    state: &mut EditorState,
    rules: RuleContext<'_>,
    active: &ActiveMatch,
    value: &str,
    data: Option<MentionData>,
) -> Result<bool, EditorError> {
    let Some((node, caret, prefix)) = text_before_caret(state) else {
        return Ok(false);
    };
    if node != active.node {
        return Ok(false);
    }
    let replace_len = full_match_offset(
        &prefix,
        &active.query.matching_string,
        char_len(&active.query.replaceable_string),
    );
    let Some(start) = caret.checked_sub(replace_len) else {
        return Ok(false);
    };
    let parts = state.split_text(node, &[start, caret])?;
    let target = if start == 0 { parts[0] } else { parts[1] };
    let mention = create_mention(state, rules.mention(active.trigger(), value, data));
    state.replace(target, mention)?;
    state.select_next(mention)?;
    Ok(true)
}

/// Turn plain text into detached nodes: text runs and mention tokens.
pub fn convert_to_mention_nodes(
    state: &mut EditorState,
    rules: RuleContext<'_>,
    text: &str,
) -> Vec<NodeKey> {
    rules
        .patterns
        .scan(text)
        .into_iter()
        .map(|segment| match segment {
            TextSegment::Text(text) => state.create_text(text),
            TextSegment::Mention { trigger, value } => {
                create_mention(state, rules.mention(&trigger, &value, None))
            }
        })
        .collect()
}
