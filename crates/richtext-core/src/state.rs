//! Document state: the versioned node store plus selection.
//!
//! # Overview
//!
//! [`EditorState`] owns every node of one document version. The [`Editor`](crate::Editor)
//! never mutates its committed state in place: an update clones it, runs the mutation on the
//! clone, [normalizes](EditorState::normalize) the result and commits it as the new version.
//! Node keys stay stable across versions, so a key captured before an update still resolves
//! to the latest version of that node afterwards.
//!
//! Mutations keep the selection consistent: removing, splitting or merging nodes remaps any
//! point that referred to the affected nodes.

use crate::error::EditorError;
use crate::node::{DecoratorNode, Node, NodeData, NodeKey};
use crate::selection::{Point, Selection};
use crate::text::{
    byte_offset, char_len, char_slice, next_grapheme_offset, prev_grapheme_offset,
};
use std::collections::{HashMap, HashSet};

/// Direction for caret movement and deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards the document start.
    Backward,
    /// Towards the document end.
    Forward,
}

/// One version of the document.
#[derive(Debug, Clone)]
pub struct EditorState {
    nodes: HashMap<NodeKey, Node>,
    root: NodeKey,
    next_key: u32,
    selection: Option<Selection>,
    dirty_nodes: HashSet<NodeKey>,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorState {
    /// A document with one empty paragraph and no selection.
    pub fn new() -> Self {
        let mut state = Self::empty();
        let paragraph = state.create_paragraph();
        state.attach(state.root, None, paragraph);
        state.dirty_nodes.clear();
        state
    }

    /// A document with a bare root (used by deserialization).
    pub(crate) fn empty() -> Self {
        let root = NodeKey(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                key: root,
                parent: None,
                data: NodeData::Root {
                    children: Vec::new(),
                },
            },
        );
        Self {
            nodes,
            root,
            next_key: 1,
            selection: None,
            dirty_nodes: HashSet::new(),
        }
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Root node key.
    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Paragraphs in document order.
    pub fn paragraphs(&self) -> &[NodeKey] {
        self.children(self.root)
    }

    /// Look up a node.
    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(&key)
    }

    /// Look up a node, failing with [`EditorError::MissingNode`].
    pub fn get(&self, key: NodeKey) -> Result<&Node, EditorError> {
        self.nodes.get(&key).ok_or(EditorError::MissingNode(key))
    }

    /// Children of an element (empty for leaves and unknown keys).
    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.nodes.get(&key).map(Node::children).unwrap_or(&[])
    }

    /// Parent of a node.
    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(&key)?.parent
    }

    /// Index of a node within its parent.
    pub fn index_in_parent(&self, key: NodeKey) -> Option<usize> {
        let parent = self.parent(key)?;
        self.children(parent).iter().position(|&child| child == key)
    }

    /// Previous sibling.
    pub fn previous_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent(key)?;
        let index = self.index_in_parent(key)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    /// Next sibling.
    pub fn next_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent(key)?;
        let index = self.index_in_parent(key)?;
        self.children(parent).get(index + 1).copied()
    }

    /// `true` when the node is reachable from the root.
    pub fn is_attached(&self, key: NodeKey) -> bool {
        let mut current = Some(key);
        while let Some(k) = current {
            if k == self.root {
                return true;
            }
            current = self.parent(k);
        }
        false
    }

    /// `true` for text nodes.
    pub fn is_text(&self, key: NodeKey) -> bool {
        self.node(key).is_some_and(Node::is_text)
    }

    /// Text of a text node.
    pub fn text(&self, key: NodeKey) -> Option<&str> {
        self.node(key)?.text()
    }

    /// Plain-text content of a node and its descendants.
    ///
    /// Paragraphs are separated by a blank line, matching what a rich-text host reports for the
    /// whole document.
    pub fn text_content(&self, key: NodeKey) -> String {
        let Some(node) = self.node(key) else {
            return String::new();
        };
        match &node.data {
            NodeData::Root { children } => children
                .iter()
                .map(|&child| self.text_content(child))
                .collect::<Vec<_>>()
                .join("\n\n"),
            NodeData::Paragraph { children } => children
                .iter()
                .map(|&child| self.text_content(child))
                .collect(),
            NodeData::Text { text } => text.clone(),
            NodeData::ZeroWidth => String::new(),
            NodeData::Decorator(decorator) => decorator.text_content(),
        }
    }

    /// Plain-text content of the whole document.
    pub fn document_text(&self) -> String {
        self.text_content(self.root)
    }

    /// Descendants of `key` in document (pre-)order, excluding `key` itself.
    pub fn descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeKey> = self.children(key).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Attached decorator nodes in document order.
    pub fn decorators(&self) -> Vec<NodeKey> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&key| self.node(key).is_some_and(Node::is_decorator))
            .collect()
    }

    /// Current selection.
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Nodes written since this state was cloned from the committed version.
    pub fn dirty_nodes(&self) -> &HashSet<NodeKey> {
        &self.dirty_nodes
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty_nodes.clear();
    }

    /// Compact textual view: decorators in brackets, paragraphs on separate lines.
    ///
    /// ```rust
    /// use richtext_core::Editor;
    ///
    /// let mut editor = Editor::new();
    /// editor.update(|state| {
    ///     let paragraph = state.paragraphs()[0];
    ///     let text = state.create_text("hello");
    ///     state.append(paragraph, text).unwrap();
    /// });
    /// assert_eq!(editor.state().debug_text(), "hello");
    /// ```
    pub fn debug_text(&self) -> String {
        self.paragraphs()
            .iter()
            .map(|&paragraph| {
                self.children(paragraph)
                    .iter()
                    .map(|&child| match self.node(child).map(Node::data) {
                        Some(NodeData::Text { text }) => text.clone(),
                        Some(NodeData::Decorator(decorator)) => {
                            format!("[{}]", decorator.decorate())
                        }
                        _ => String::new(),
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    // ---------------------------------------------------------------------
    // Node creation
    // ---------------------------------------------------------------------

    fn alloc(&mut self, data: NodeData) -> NodeKey {
        let key = NodeKey(self.next_key);
        self.next_key = self.next_key.wrapping_add(1);
        self.nodes.insert(
            key,
            Node {
                key,
                parent: None,
                data,
            },
        );
        self.dirty_nodes.insert(key);
        key
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeKey {
        self.alloc(NodeData::Text { text: text.into() })
    }

    /// Create a detached, empty paragraph.
    pub fn create_paragraph(&mut self) -> NodeKey {
        self.alloc(NodeData::Paragraph {
            children: Vec::new(),
        })
    }

    /// Create a detached zero-width placeholder.
    pub fn create_zero_width(&mut self) -> NodeKey {
        self.alloc(NodeData::ZeroWidth)
    }

    /// Create a detached decorator node.
    pub fn create_decorator(&mut self, decorator: Box<dyn DecoratorNode>) -> NodeKey {
        self.alloc(NodeData::Decorator(decorator))
    }

    // ---------------------------------------------------------------------
    // Writable access
    // ---------------------------------------------------------------------

    /// Mutable access to a node; marks it dirty.
    pub fn writable(&mut self, key: NodeKey) -> Result<&mut Node, EditorError> {
        self.dirty_nodes.insert(key);
        self.nodes.get_mut(&key).ok_or(EditorError::MissingNode(key))
    }

    /// Mutable access to a decorator payload; marks the node dirty.
    pub fn writable_decorator(&mut self, key: NodeKey) -> Option<&mut dyn DecoratorNode> {
        if !self.node(key)?.is_decorator() {
            return None;
        }
        match &mut self.writable(key).ok()?.data {
            NodeData::Decorator(decorator) => Some(decorator.as_mut()),
            _ => None,
        }
    }

    // ---------------------------------------------------------------------
    // Tree mutation
    // ---------------------------------------------------------------------

    fn attach(&mut self, parent: NodeKey, index: Option<usize>, child: NodeKey) {
        let inserted_at = {
            let Some(children) = self.nodes.get_mut(&parent).and_then(Node::children_mut) else {
                return;
            };
            let index = index.unwrap_or(children.len()).min(children.len());
            children.insert(index, child);
            index
        };
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        self.dirty_nodes.insert(parent);
        self.dirty_nodes.insert(child);
        self.shift_element_points(parent, inserted_at, true);
    }

    fn detach(&mut self, key: NodeKey) -> Option<(NodeKey, usize)> {
        let parent = self.parent(key)?;
        let index = self.index_in_parent(key)?;
        if let Some(children) = self.nodes.get_mut(&parent).and_then(Node::children_mut) {
            children.remove(index);
        }
        if let Some(node) = self.nodes.get_mut(&key) {
            node.parent = None;
        }
        self.dirty_nodes.insert(parent);
        self.dirty_nodes.insert(key);
        Some((parent, index))
    }

    fn ensure_element(&self, key: NodeKey) -> Result<(), EditorError> {
        if self.get(key)?.is_element() {
            Ok(())
        } else {
            Err(EditorError::NotElement(key))
        }
    }

    /// Append `child` to `parent` (moving it if it was attached elsewhere).
    pub fn append(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), EditorError> {
        self.ensure_element(parent)?;
        self.get(child)?;
        self.detach(child);
        self.attach(parent, None, child);
        Ok(())
    }

    /// Insert `child` into `parent` at `index`.
    pub fn insert_at(
        &mut self,
        parent: NodeKey,
        index: usize,
        child: NodeKey,
    ) -> Result<(), EditorError> {
        self.ensure_element(parent)?;
        self.get(child)?;
        self.detach(child);
        self.attach(parent, Some(index), child);
        Ok(())
    }

    /// Insert `node` right before `sibling`.
    pub fn insert_before(&mut self, sibling: NodeKey, node: NodeKey) -> Result<(), EditorError> {
        self.get(node)?;
        self.detach(node);
        let parent = self.parent(sibling).ok_or(EditorError::Detached(sibling))?;
        let index = self
            .index_in_parent(sibling)
            .ok_or(EditorError::Detached(sibling))?;
        self.attach(parent, Some(index), node);
        Ok(())
    }

    /// Insert `node` right after `sibling`.
    pub fn insert_after(&mut self, sibling: NodeKey, node: NodeKey) -> Result<(), EditorError> {
        self.get(node)?;
        self.detach(node);
        let parent = self.parent(sibling).ok_or(EditorError::Detached(sibling))?;
        let index = self
            .index_in_parent(sibling)
            .ok_or(EditorError::Detached(sibling))?;
        self.attach(parent, Some(index + 1), node);
        Ok(())
    }

    /// Remove a node and its subtree from the document.
    ///
    /// Selection points inside the removed subtree move to the gap the node leaves behind.
    pub fn remove(&mut self, key: NodeKey) -> Result<(), EditorError> {
        self.get(key)?;
        if key == self.root {
            return Err(EditorError::NotElement(key));
        }
        let mut removed: HashSet<NodeKey> = self.descendants(key).into_iter().collect();
        removed.insert(key);

        if let Some((parent, index)) = self.detach(key) {
            self.remap_removed_points(parent, index, &removed);
        } else {
            self.clear_points_in(&removed);
        }
        for k in &removed {
            self.nodes.remove(k);
            self.dirty_nodes.insert(*k);
        }
        Ok(())
    }

    /// Put `new` where `old` is and remove `old`.
    pub fn replace(&mut self, old: NodeKey, new: NodeKey) -> Result<(), EditorError> {
        self.insert_after(old, new)?;
        self.remove(old)
    }

    /// Replace the text of a text node. Carets inside it are clamped.
    pub fn set_text(&mut self, key: NodeKey, text: impl Into<String>) -> Result<(), EditorError> {
        let text = text.into();
        let len = char_len(&text);
        match &mut self.writable(key)?.data {
            NodeData::Text { text: current } => *current = text,
            _ => return Err(EditorError::NotText(key)),
        }
        self.map_points(|point| match point {
            Point::Text { key: k, offset } if k == key && offset > len => point.with_offset(len),
            other => other,
        });
        Ok(())
    }

    /// Split a text node at the given character offsets.
    ///
    /// Returns the resulting parts in order; the first part keeps the original key. Offsets at
    /// the node boundaries are ignored. Carets move into the part that contains them (a caret on
    /// a split boundary stays at the end of the earlier part).
    pub fn split_text(
        &mut self,
        key: NodeKey,
        offsets: &[usize],
    ) -> Result<Vec<NodeKey>, EditorError> {
        let text = self
            .get(key)?
            .text()
            .ok_or(EditorError::NotText(key))?
            .to_string();
        let len = char_len(&text);
        if let Some(&bad) = offsets.iter().find(|&&o| o > len) {
            return Err(EditorError::InvalidOffset { key, offset: bad });
        }

        let mut cuts: Vec<usize> = offsets.iter().copied().filter(|&o| o > 0 && o < len).collect();
        cuts.sort_unstable();
        cuts.dedup();
        if cuts.is_empty() {
            return Ok(vec![key]);
        }

        let mut bounds = Vec::with_capacity(cuts.len() + 2);
        bounds.push(0);
        bounds.extend(cuts);
        bounds.push(len);

        let mut parts = vec![key];
        self.set_text_raw(key, char_slice(&text, bounds[0], bounds[1]))?;
        let mut previous = key;
        for window in bounds.windows(2).skip(1) {
            let part = self.create_text(char_slice(&text, window[0], window[1]));
            if self.parent(previous).is_some() {
                self.insert_after(previous, part)?;
            }
            parts.push(part);
            previous = part;
        }

        self.map_points(|point| match point {
            Point::Text { key: k, offset } if k == key => {
                let part_index = bounds
                    .windows(2)
                    .position(|w| offset <= w[1])
                    .unwrap_or(parts.len() - 1);
                Point::Text {
                    key: parts[part_index],
                    offset: offset - bounds[part_index],
                }
            }
            other => other,
        });
        Ok(parts)
    }

    fn set_text_raw(&mut self, key: NodeKey, text: &str) -> Result<(), EditorError> {
        match &mut self.writable(key)?.data {
            NodeData::Text { text: current } => {
                *current = text.to_string();
                Ok(())
            }
            _ => Err(EditorError::NotText(key)),
        }
    }

    // ---------------------------------------------------------------------
    // Selection
    // ---------------------------------------------------------------------

    /// Replace the selection (`None` clears it).
    pub fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection;
    }

    /// Collapse the selection to `point`.
    pub fn select(&mut self, point: Point) {
        self.selection = Some(Selection::collapsed(point));
    }

    /// Caret at the start of a node.
    pub fn select_start_of(&mut self, key: NodeKey) -> Result<(), EditorError> {
        let point = match &self.get(key)?.data {
            NodeData::Text { .. } => Point::text(key, 0),
            NodeData::Root { .. } | NodeData::Paragraph { .. } => Point::element(key, 0),
            _ => return self.select_previous(key),
        };
        self.select(point);
        Ok(())
    }

    /// Caret at the end of a node.
    pub fn select_end_of(&mut self, key: NodeKey) -> Result<(), EditorError> {
        let point = match &self.get(key)?.data {
            NodeData::Text { text } => Point::text(key, char_len(text)),
            NodeData::Root { children } | NodeData::Paragraph { children } => {
                Point::element(key, children.len())
            }
            _ => return self.select_next(key),
        };
        self.select(point);
        Ok(())
    }

    /// Caret right after `key`: the start of a following text node, else the gap after it.
    pub fn select_next(&mut self, key: NodeKey) -> Result<(), EditorError> {
        let parent = self.parent(key).ok_or(EditorError::Detached(key))?;
        let index = self.index_in_parent(key).ok_or(EditorError::Detached(key))?;
        let point = match self.next_sibling(key) {
            Some(next) if self.is_text(next) => Point::text(next, 0),
            _ => Point::element(parent, index + 1),
        };
        self.select(point);
        Ok(())
    }

    /// Caret right before `key`: the end of a preceding text node, else the gap before it.
    pub fn select_previous(&mut self, key: NodeKey) -> Result<(), EditorError> {
        let parent = self.parent(key).ok_or(EditorError::Detached(key))?;
        let index = self.index_in_parent(key).ok_or(EditorError::Detached(key))?;
        let point = match self.previous_sibling(key) {
            Some(prev) if self.is_text(prev) => {
                Point::text(prev, self.text(prev).map(char_len).unwrap_or(0))
            }
            _ => Point::element(parent, index),
        };
        self.select(point);
        Ok(())
    }

    /// Caret at the end of the document.
    pub fn select_end(&mut self) {
        let paragraph = match self.paragraphs().last() {
            Some(&paragraph) => paragraph,
            None => {
                let paragraph = self.create_paragraph();
                self.attach(self.root, None, paragraph);
                paragraph
            }
        };
        let point = match self.children(paragraph).last() {
            Some(&last) if self.is_text(last) => {
                Point::text(last, self.text(last).map(char_len).unwrap_or(0))
            }
            _ => Point::element(paragraph, self.children(paragraph).len()),
        };
        self.select(point);
    }

    fn map_points(&mut self, f: impl FnMut(Point) -> Point) {
        if let Some(selection) = self.selection.as_mut() {
            selection.map_points(f);
        }
    }

    fn shift_element_points(&mut self, parent: NodeKey, index: usize, inserted: bool) {
        self.map_points(|point| match point {
            Point::Element { key, offset } if key == parent && offset > index => {
                if inserted {
                    point.with_offset(offset + 1)
                } else {
                    point.with_offset(offset - 1)
                }
            }
            other => other,
        });
    }

    fn remap_removed_points(&mut self, parent: NodeKey, index: usize, removed: &HashSet<NodeKey>) {
        self.map_points(|point| {
            if removed.contains(&point.key()) {
                return Point::element(parent, index);
            }
            match point {
                Point::Element { key, offset } if key == parent && offset > index => {
                    point.with_offset(offset - 1)
                }
                other => other,
            }
        });
    }

    fn clear_points_in(&mut self, removed: &HashSet<NodeKey>) {
        let touches = self
            .selection
            .is_some_and(|s| removed.contains(&s.anchor.key()) || removed.contains(&s.focus.key()));
        if touches {
            self.selection = None;
        }
    }

    /// Resolve a point to `(parent, child index)` where new inline nodes would go, splitting a
    /// text node if the point is inside one.
    fn insertion_gap(&mut self, point: Point) -> Result<(NodeKey, usize), EditorError> {
        match point {
            Point::Text { key, offset } => {
                let len = self.text(key).map(char_len).ok_or(EditorError::NotText(key))?;
                let parent = self.parent(key).ok_or(EditorError::Detached(key))?;
                let index = self.index_in_parent(key).ok_or(EditorError::Detached(key))?;
                if offset == 0 {
                    Ok((parent, index))
                } else if offset >= len {
                    Ok((parent, index + 1))
                } else {
                    self.split_text(key, &[offset])?;
                    Ok((parent, index + 1))
                }
            }
            Point::Element { key, offset } if key == self.root => {
                let paragraphs = self.paragraphs().to_vec();
                match paragraphs.get(offset.min(paragraphs.len().saturating_sub(1))) {
                    Some(&paragraph) if offset < paragraphs.len() => Ok((paragraph, 0)),
                    Some(&paragraph) => Ok((paragraph, self.children(paragraph).len())),
                    None => {
                        let paragraph = self.create_paragraph();
                        self.attach(self.root, None, paragraph);
                        Ok((paragraph, 0))
                    }
                }
            }
            Point::Element { key, offset } => {
                self.ensure_element(key)?;
                Ok((key, offset.min(self.children(key).len())))
            }
        }
    }

    /// Insert detached inline nodes at the (collapsed) selection.
    ///
    /// The caret ends up after the last inserted node. Returns `Ok(false)` when there is no
    /// collapsed selection.
    pub fn insert_nodes(&mut self, nodes: &[NodeKey]) -> Result<bool, EditorError> {
        let Some(selection) = self.selection else {
            return Ok(false);
        };
        if !selection.is_collapsed() {
            return Ok(false);
        }
        let (parent, mut index) = self.insertion_gap(selection.anchor)?;
        for &node in nodes {
            self.insert_at(parent, index, node)?;
            index += 1;
        }
        if let Some(&last) = nodes.last() {
            if self.is_text(last) {
                self.select_end_of(last)?;
            } else {
                self.select(Point::element(parent, index));
            }
        }
        Ok(true)
    }

    /// Insert plain text at the (collapsed) selection, the default typing behavior.
    pub fn insert_text(&mut self, text: &str) -> Result<bool, EditorError> {
        let Some(selection) = self.selection else {
            return Ok(false);
        };
        if !selection.is_collapsed() || text.is_empty() {
            return Ok(false);
        }
        let inserted = char_len(text);

        if let Point::Text { key, offset } = selection.anchor {
            let current = self.text(key).ok_or(EditorError::NotText(key))?;
            let at = byte_offset(current, offset);
            let mut updated = current.to_string();
            updated.insert_str(at, text);
            self.set_text_raw(key, &updated)?;
            self.select(Point::text(key, offset + inserted));
            return Ok(true);
        }

        let (parent, index) = self.insertion_gap(selection.anchor)?;
        let children = self.children(parent).to_vec();
        let before = index.checked_sub(1).and_then(|i| children.get(i).copied());
        let after = children.get(index).copied();

        match (before, after) {
            (Some(prev), _) if self.is_text(prev) => {
                let mut updated = self.text(prev).unwrap_or_default().to_string();
                updated.push_str(text);
                let len = char_len(&updated);
                self.set_text_raw(prev, &updated)?;
                self.select(Point::text(prev, len));
            }
            (_, Some(next)) if self.is_text(next) => {
                let updated = format!("{text}{}", self.text(next).unwrap_or_default());
                self.set_text_raw(next, &updated)?;
                self.select(Point::text(next, inserted));
            }
            _ => {
                let node = self.create_text(text);
                self.insert_at(parent, index, node)?;
                self.select(Point::text(node, inserted));
            }
        }
        Ok(true)
    }

    /// Split the paragraph at the caret; the caret moves to the start of the new paragraph.
    pub fn insert_paragraph(&mut self) -> Result<bool, EditorError> {
        let Some(selection) = self.selection else {
            return Ok(false);
        };
        if !selection.is_collapsed() {
            return Ok(false);
        }
        let (parent, index) = self.insertion_gap(selection.anchor)?;
        if !self.get(parent)?.is_paragraph() {
            return Ok(false);
        }
        let moved = self.children(parent).get(index..).unwrap_or(&[]).to_vec();
        let paragraph = self.create_paragraph();
        self.insert_after(parent, paragraph)?;
        for &child in &moved {
            self.append(paragraph, child)?;
        }
        match moved.first() {
            Some(&first) if self.is_text(first) => self.select(Point::text(first, 0)),
            _ => self.select(Point::element(paragraph, 0)),
        }
        Ok(true)
    }

    /// Delete one unit next to the caret: a grapheme of text, or a whole decorator.
    ///
    /// Deleting backward at the start of a paragraph joins it with the previous one.
    pub fn delete_character(&mut self, direction: Direction) -> Result<bool, EditorError> {
        let Some(selection) = self.selection else {
            return Ok(false);
        };
        if !selection.is_collapsed() {
            return Ok(false);
        }
        if direction == Direction::Forward {
            let before = self.selection;
            if !self.move_caret(Direction::Forward) || self.selection == before {
                return Ok(false);
            }
            return self.delete_character(Direction::Backward);
        }

        let (parent, previous) = match selection.anchor {
            Point::Text { key, offset } if offset > 0 => {
                let text = self.text(key).unwrap_or_default().to_string();
                let start = prev_grapheme_offset(&text, offset).unwrap_or(0);
                let updated = format!(
                    "{}{}",
                    char_slice(&text, 0, start),
                    char_slice(&text, offset, char_len(&text))
                );
                self.set_text_raw(key, &updated)?;
                self.select(Point::text(key, start));
                return Ok(true);
            }
            Point::Text { key, .. } => (
                self.parent(key).ok_or(EditorError::Detached(key))?,
                self.previous_sibling(key),
            ),
            Point::Element { key, offset } => {
                let (parent, index) = self.insertion_gap(Point::element(key, offset))?;
                let previous = index
                    .checked_sub(1)
                    .and_then(|i| self.children(parent).get(i).copied());
                (parent, previous)
            }
        };

        let mut previous = previous;
        while let Some(prev) = previous {
            if self.get(prev)?.is_zero_width() {
                previous = self.previous_sibling(prev);
                self.remove(prev)?;
                continue;
            }
            if let Some(text) = self.text(prev).map(str::to_string) {
                let start = prev_grapheme_offset(&text, char_len(&text)).unwrap_or(0);
                self.set_text_raw(prev, char_slice(&text, 0, start))?;
                self.select(Point::text(prev, start));
            } else {
                self.remove(prev)?;
            }
            return Ok(true);
        }
        self.join_with_previous_paragraph(parent)
    }

    fn join_with_previous_paragraph(&mut self, paragraph: NodeKey) -> Result<bool, EditorError> {
        if !self.get(paragraph)?.is_paragraph() {
            return Ok(false);
        }
        let Some(previous) = self.previous_sibling(paragraph) else {
            return Ok(false);
        };
        match self.children(previous).last() {
            Some(&last) if self.is_text(last) => self.select_end_of(last)?,
            _ => self.select_end_of(previous)?,
        }
        for child in self.children(paragraph).to_vec() {
            self.append(previous, child)?;
        }
        self.remove(paragraph)?;
        Ok(true)
    }

    /// Move a collapsed caret by one unit. Decorators are a single unit.
    pub fn move_caret(&mut self, direction: Direction) -> bool {
        let Some(selection) = self.selection else {
            return false;
        };
        let Some((paragraph, position)) = self.linear_position(selection.focus) else {
            return false;
        };
        let units = self.paragraph_units(paragraph);
        let total = units.last().map(|u| u.start + u.width).unwrap_or(0);

        let target = match direction {
            Direction::Forward if position < total => self.step_within(&units, position, true),
            Direction::Backward if position > 0 => self.step_within(&units, position, false),
            Direction::Forward => {
                let Some(next) = self.next_sibling(paragraph) else {
                    return false;
                };
                let point = self.point_at(next, 0);
                self.select(point);
                return true;
            }
            Direction::Backward => {
                let Some(prev) = self.previous_sibling(paragraph) else {
                    return false;
                };
                let end = self
                    .paragraph_units(prev)
                    .last()
                    .map(|u| u.start + u.width)
                    .unwrap_or(0);
                let point = self.point_at(prev, end);
                self.select(point);
                return true;
            }
        };
        let point = self.point_at(paragraph, target);
        self.select(point);
        true
    }

    fn paragraph_units(&self, paragraph: NodeKey) -> Vec<Unit> {
        let mut start = 0usize;
        self.children(paragraph)
            .iter()
            .map(|&key| {
                let width = match self.node(key).map(Node::data) {
                    Some(NodeData::Text { text }) => char_len(text),
                    Some(NodeData::Decorator(_)) => 1,
                    _ => 0,
                };
                let unit = Unit { key, start, width };
                start += width;
                unit
            })
            .collect()
    }

    fn linear_position(&self, point: Point) -> Option<(NodeKey, usize)> {
        match point {
            Point::Text { key, offset } => {
                let paragraph = self.parent(key)?;
                let unit = self
                    .paragraph_units(paragraph)
                    .into_iter()
                    .find(|u| u.key == key)?;
                Some((paragraph, unit.start + offset.min(unit.width)))
            }
            Point::Element { key, offset } if key == self.root => {
                let paragraph = *self
                    .paragraphs()
                    .get(offset.min(self.paragraphs().len().saturating_sub(1)))?;
                Some((paragraph, 0))
            }
            Point::Element { key, offset } => {
                let position = self
                    .paragraph_units(key)
                    .iter()
                    .take(offset)
                    .map(|u| u.width)
                    .sum();
                Some((key, position))
            }
        }
    }

    fn step_within(&self, units: &[Unit], position: usize, forward: bool) -> usize {
        let containing = units.iter().find(|u| {
            let end = u.start + u.width;
            if forward {
                u.width > 0 && u.start <= position && position < end
            } else {
                u.width > 0 && u.start < position && position <= end
            }
        });
        let Some(unit) = containing else {
            return position;
        };
        match self.text(unit.key) {
            Some(text) => {
                let local = position - unit.start;
                let next = if forward {
                    next_grapheme_offset(text, local)
                } else {
                    prev_grapheme_offset(text, local)
                };
                unit.start + next.unwrap_or(if forward { unit.width } else { 0 })
            }
            // Decorators are crossed in one step.
            None if forward => unit.start + unit.width,
            None => unit.start,
        }
    }

    fn point_at(&self, paragraph: NodeKey, position: usize) -> Point {
        let units = self.paragraph_units(paragraph);
        let text_units: Vec<&Unit> = units.iter().filter(|u| self.is_text(u.key)).collect();
        if let Some(unit) = text_units
            .iter()
            .find(|u| u.start <= position && position < u.start + u.width)
            .or_else(|| {
                text_units
                    .iter()
                    .find(|u| u.start <= position && position <= u.start + u.width)
            })
        {
            return Point::text(unit.key, position - unit.start);
        }
        let index = units
            .iter()
            .take_while(|u| u.start + u.width <= position && !(u.width == 0 && u.start == position))
            .count();
        Point::element(paragraph, index)
    }

    // ---------------------------------------------------------------------
    // Normalization
    // ---------------------------------------------------------------------

    /// Merge adjacent text nodes, drop empty ones, and make sure the root has a paragraph.
    ///
    /// Element points that touch a text node are moved into it, so a caret next to text is
    /// always a text point.
    pub fn normalize(&mut self) {
        self.normalize_tree();
        if let Some(mut selection) = self.selection {
            selection.anchor = self.normalize_point(selection.anchor);
            selection.focus = self.normalize_point(selection.focus);
            self.selection = Some(selection);
        }
    }

    fn normalize_point(&self, mut point: Point) -> Point {
        while let Point::Element { key, offset } = point {
            let children = self.children(key);
            let at_end = offset >= children.len();
            let child = if at_end {
                children.last()
            } else {
                children.get(offset)
            };
            let Some(&child) = child else {
                break;
            };
            point = match self.node(child).map(Node::data) {
                Some(NodeData::Text { text }) => {
                    Point::text(child, if at_end { char_len(text) } else { 0 })
                }
                Some(NodeData::Root { children } | NodeData::Paragraph { children }) => {
                    Point::element(child, if at_end { children.len() } else { 0 })
                }
                _ => break,
            };
        }
        point
    }

    fn normalize_tree(&mut self) {
        if self.paragraphs().is_empty() {
            let paragraph = self.create_paragraph();
            self.attach(self.root, None, paragraph);
        }
        for paragraph in self.paragraphs().to_vec() {
            let mut index = 0usize;
            loop {
                let children = self.children(paragraph).to_vec();
                let Some(&child) = children.get(index) else {
                    break;
                };
                let Some(text) = self.text(child).map(str::to_string) else {
                    index += 1;
                    continue;
                };
                if text.is_empty() {
                    let _ = self.remove(child);
                    continue;
                }
                let previous = index.checked_sub(1).and_then(|i| children.get(i).copied());
                if let Some(prev) = previous.filter(|&p| self.is_text(p)) {
                    self.merge_text_into(prev, child);
                    continue;
                }
                index += 1;
            }
        }
    }

    fn merge_text_into(&mut self, target: NodeKey, source: NodeKey) {
        let target_text = self.text(target).unwrap_or_default().to_string();
        let source_text = self.text(source).unwrap_or_default().to_string();
        let shift = char_len(&target_text);
        let _ = self.set_text_raw(target, &format!("{target_text}{source_text}"));
        self.map_points(|point| match point {
            Point::Text { key, offset } if key == source => Point::text(target, shift + offset),
            other => other,
        });
        let _ = self.remove(source);
    }
}

#[derive(Debug, Clone, Copy)]
struct Unit {
    key: NodeKey,
    start: usize,
    width: usize,
}
