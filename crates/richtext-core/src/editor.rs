//! Editor: atomic updates, undo/redo and change notifications.
//!
//! # Overview
//!
//! [`Editor`] owns the committed [`EditorState`]. All writes go through
//! [`update`](Editor::update) (or its variants): the closure runs against a clone of the
//! committed state and the result is normalized and committed as one new version. A failing
//! [`try_update`](Editor::try_update) leaves the committed state untouched.
//!
//! Every committed update that touched the document is one undo step. Plain typing coalesces
//! into one group; [`UpdateTag::HistoryMerge`] folds an update into the previous step.
//!
//! # Example
//!
//! ```rust
//! use richtext_core::{Editor, KeyEvent};
//!
//! let mut editor = Editor::new();
//! editor.update(|state| state.select_end());
//! for c in "hi".chars() {
//!     editor.dispatch_key(&KeyEvent::char(c));
//! }
//! assert_eq!(editor.state().document_text(), "hi");
//!
//! editor.undo().unwrap();
//! assert_eq!(editor.state().document_text(), "");
//! ```

use crate::error::EditorError;
use crate::history::{History, UndoStep};
use crate::keys::{Key, KeyEvent};
use crate::node::{NodeKey, NodeRegistry};
use crate::serialize;
use crate::state::{Direction, EditorState};

const MAX_UNDO: usize = 1000;

/// Tag attached to an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateTag {
    /// Fold this update into the previous undo step.
    HistoryMerge,
    /// Commit without recording an undo step.
    SkipHistory,
}

/// Options for one update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Optional tag.
    pub tag: Option<UpdateTag>,
    /// Coalesce with the open typing group.
    pub coalesce: bool,
}

impl UpdateOptions {
    /// Options for one typed character.
    pub fn typing() -> Self {
        Self {
            tag: None,
            coalesce: true,
        }
    }

    /// Options for an update that merges into the previous undo step.
    pub fn history_merge() -> Self {
        Self {
            tag: Some(UpdateTag::HistoryMerge),
            coalesce: false,
        }
    }
}

/// Notification sent after each committed update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEvent {
    /// Version before the update.
    pub old_version: u64,
    /// Version after the update.
    pub new_version: u64,
    /// Whether any node was written.
    pub document_changed: bool,
    /// Whether the selection moved.
    pub selection_changed: bool,
    /// Tag the update ran with.
    pub tag: Option<UpdateTag>,
    /// Keys of the written nodes, sorted.
    pub dirty_nodes: Vec<NodeKey>,
}

/// Update listener callback.
pub type UpdateListener = Box<dyn FnMut(&UpdateEvent, &EditorState)>;

/// The editor instance.
pub struct Editor {
    state: EditorState,
    registry: NodeRegistry,
    history: History,
    version: u64,
    listeners: Vec<UpdateListener>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("version", &self.version)
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Editor {
    /// Editor with an empty document and an empty node registry.
    pub fn new() -> Self {
        Self::with_registry(NodeRegistry::new())
    }

    /// Editor with an empty document and the given registry.
    pub fn with_registry(registry: NodeRegistry) -> Self {
        Self {
            state: EditorState::new(),
            registry,
            history: History::new(MAX_UNDO),
            version: 0,
            listeners: Vec::new(),
        }
    }

    /// Latest committed state.
    pub fn state(&self) -> &EditorState {
        &self.state
    }

    /// Current version (incremented by every committed update that changed something).
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Node registry.
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Mutable node registry, used by integrations to register their node types.
    pub fn registry_mut(&mut self) -> &mut NodeRegistry {
        &mut self.registry
    }

    /// Subscribe to committed updates.
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&UpdateEvent, &EditorState) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Run `f` as one atomic update with default options.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut EditorState) -> R) -> R {
        self.update_with(UpdateOptions::default(), f)
    }

    /// Run `f` as one atomic update.
    pub fn update_with<R>(
        &mut self,
        options: UpdateOptions,
        f: impl FnOnce(&mut EditorState) -> R,
    ) -> R {
        let mut next = self.state.clone();
        let result = f(&mut next);
        self.commit(next, options);
        result
    }

    /// Run a fallible update. On `Err` nothing is committed.
    pub fn try_update<R>(
        &mut self,
        options: UpdateOptions,
        f: impl FnOnce(&mut EditorState) -> Result<R, EditorError>,
    ) -> Result<R, EditorError> {
        let mut next = self.state.clone();
        let result = f(&mut next)?;
        self.commit(next, options);
        Ok(result)
    }

    fn commit(&mut self, mut next: EditorState, options: UpdateOptions) {
        next.normalize();
        let document_changed = !next.dirty_nodes().is_empty();
        let selection_changed = next.selection() != self.state.selection();

        if !options.coalesce {
            self.history.end_group();
        }
        if !document_changed && !selection_changed {
            return;
        }

        let mut dirty_nodes: Vec<NodeKey> = next.dirty_nodes().iter().copied().collect();
        dirty_nodes.sort();
        next.clear_dirty();
        let previous = std::mem::replace(&mut self.state, next);

        if document_changed {
            match options.tag {
                Some(UpdateTag::SkipHistory) => {}
                Some(UpdateTag::HistoryMerge)
                    if self.history.merge_into_last(self.state.clone()) => {}
                _ => {
                    self.history.push_step(
                        UndoStep {
                            group_id: 0,
                            before: previous,
                            after: self.state.clone(),
                        },
                        options.coalesce,
                    );
                }
            }
        }

        let event = UpdateEvent {
            old_version: self.version,
            new_version: self.version + 1,
            document_changed,
            selection_changed,
            tag: options.tag,
            dirty_nodes,
        };
        self.version += 1;
        self.notify(&event);
    }

    fn restore(&mut self, state: EditorState) {
        let selection_changed = state.selection() != self.state.selection();
        self.state = state;
        let event = UpdateEvent {
            old_version: self.version,
            new_version: self.version + 1,
            document_changed: true,
            selection_changed,
            tag: Some(UpdateTag::SkipHistory),
            dirty_nodes: Vec::new(),
        };
        self.version += 1;
        self.notify(&event);
    }

    fn notify(&mut self, event: &UpdateEvent) {
        for listener in &mut self.listeners {
            listener(event, &self.state);
        }
    }

    /// Whether an undo step is available.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether a redo step is available.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Number of groups [`undo`](Self::undo) can revert.
    pub fn undo_depth(&self) -> usize {
        self.history.undo_depth()
    }

    /// Number of groups [`redo`](Self::redo) can reapply.
    pub fn redo_depth(&self) -> usize {
        self.history.redo_depth()
    }

    /// Undo the latest group.
    pub fn undo(&mut self) -> Result<(), EditorError> {
        let steps = self
            .history
            .pop_undo_group()
            .ok_or(EditorError::NothingToUndo)?;
        let restored = steps
            .last()
            .map(|step| step.before.clone())
            .ok_or(EditorError::NothingToUndo)?;
        self.history.push_redo(steps);
        self.restore(restored);
        Ok(())
    }

    /// Redo the next group.
    pub fn redo(&mut self) -> Result<(), EditorError> {
        let steps = self
            .history
            .pop_redo_group()
            .ok_or(EditorError::NothingToRedo)?;
        let restored = steps
            .last()
            .map(|step| step.after.clone())
            .ok_or(EditorError::NothingToRedo)?;
        self.history.push_undo(steps);
        self.restore(restored);
        Ok(())
    }

    /// Default key handling. Returns `true` when the key was handled.
    ///
    /// Shortcut chords (Ctrl/Meta) are left to the host application.
    pub fn dispatch_key(&mut self, event: &KeyEvent) -> bool {
        if event.has_command_modifier() {
            return false;
        }
        let result = match event.key {
            Key::Char(c) => {
                let mut buf = [0u8; 4];
                let text = c.encode_utf8(&mut buf);
                self.try_update(UpdateOptions::typing(), |state| state.insert_text(text))
            }
            Key::Backspace => self.try_update(UpdateOptions::default(), |state| {
                state.delete_character(Direction::Backward)
            }),
            Key::Delete => self.try_update(UpdateOptions::default(), |state| {
                state.delete_character(Direction::Forward)
            }),
            Key::Enter => {
                self.try_update(UpdateOptions::default(), |state| state.insert_paragraph())
            }
            Key::ArrowLeft => Ok(self.update(|state| state.move_caret(Direction::Backward))),
            Key::ArrowRight => Ok(self.update(|state| state.move_caret(Direction::Forward))),
            Key::Tab | Key::Escape | Key::ArrowUp | Key::ArrowDown => Ok(false),
        };
        result.unwrap_or_else(|err| {
            log::warn!("default handling of {:?} failed: {err}", event.key);
            false
        })
    }

    /// Export the committed document as JSON.
    pub fn export_json(&self) -> serde_json::Value {
        serialize::export_state(&self.state)
    }

    /// Parse a JSON document with this editor's registry, without committing it.
    pub fn parse_json(&self, value: &serde_json::Value) -> Result<EditorState, EditorError> {
        serialize::import_state(value, &self.registry)
    }

    /// Replace the document with a parsed JSON document. History is cleared.
    pub fn import_json(&mut self, value: &serde_json::Value) -> Result<(), EditorError> {
        let state = self.parse_json(value)?;
        self.history.clear();
        self.restore(state);
        Ok(())
    }
}
