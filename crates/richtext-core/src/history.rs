//! Snapshot-based undo/redo history.
//!
//! Each committed update that touched the document becomes one [`UndoStep`] holding the state
//! before and after it. Steps that share a `group_id` are undone together; consecutive
//! coalescible updates (plain typing) join the open group until any other update ends it.

use crate::state::EditorState;

#[derive(Debug, Clone)]
pub(crate) struct UndoStep {
    pub(crate) group_id: usize,
    pub(crate) before: EditorState,
    pub(crate) after: EditorState,
}

#[derive(Debug)]
pub(crate) struct History {
    undo_stack: Vec<UndoStep>,
    redo_stack: Vec<UndoStep>,
    max_undo: usize,
    next_group_id: usize,
    open_group_id: Option<usize>,
}

impl History {
    pub(crate) fn new(max_undo: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_undo,
            next_group_id: 0,
            open_group_id: None,
        }
    }

    pub(crate) fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub(crate) fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of groups `undo` can pop.
    pub(crate) fn undo_depth(&self) -> usize {
        group_count(&self.undo_stack)
    }

    /// Number of groups `redo` can pop.
    pub(crate) fn redo_depth(&self) -> usize {
        group_count(&self.redo_stack)
    }

    pub(crate) fn end_group(&mut self) {
        self.open_group_id = None;
    }

    pub(crate) fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.open_group_id = None;
    }

    pub(crate) fn push_step(&mut self, mut step: UndoStep, coalescible: bool) -> usize {
        self.redo_stack.clear();

        if self.undo_stack.len() >= self.max_undo {
            self.undo_stack.remove(0);
        }

        step.group_id = match self.open_group_id {
            Some(open) if coalescible => open,
            _ => {
                let id = self.next_group_id;
                self.next_group_id = self.next_group_id.wrapping_add(1);
                id
            }
        };
        self.open_group_id = coalescible.then_some(step.group_id);

        let group_id = step.group_id;
        self.undo_stack.push(step);
        group_id
    }

    /// Fold an update into the most recent step. Returns `false` when there is none.
    pub(crate) fn merge_into_last(&mut self, after: EditorState) -> bool {
        let Some(last) = self.undo_stack.last_mut() else {
            return false;
        };
        last.after = after;
        self.redo_stack.clear();
        true
    }

    /// Pop the latest group, latest step first.
    pub(crate) fn pop_undo_group(&mut self) -> Option<Vec<UndoStep>> {
        let last_group_id = self.undo_stack.last().map(|s| s.group_id)?;
        let mut steps = Vec::new();
        while self
            .undo_stack
            .last()
            .is_some_and(|step| step.group_id == last_group_id)
        {
            steps.extend(self.undo_stack.pop());
        }
        self.open_group_id = None;
        Some(steps)
    }

    /// Pop the next redo group, earliest step first.
    pub(crate) fn pop_redo_group(&mut self) -> Option<Vec<UndoStep>> {
        let last_group_id = self.redo_stack.last().map(|s| s.group_id)?;
        let mut steps = Vec::new();
        while self
            .redo_stack
            .last()
            .is_some_and(|step| step.group_id == last_group_id)
        {
            steps.extend(self.redo_stack.pop());
        }
        self.open_group_id = None;
        Some(steps)
    }

    pub(crate) fn push_redo(&mut self, steps: Vec<UndoStep>) {
        self.redo_stack.extend(steps);
    }

    pub(crate) fn push_undo(&mut self, steps: Vec<UndoStep>) {
        self.undo_stack.extend(steps);
    }
}

fn group_count(steps: &[UndoStep]) -> usize {
    steps
        .windows(2)
        .filter(|pair| pair[0].group_id != pair[1].group_id)
        .count()
        + usize::from(!steps.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step() -> UndoStep {
        UndoStep {
            group_id: 0,
            before: EditorState::new(),
            after: EditorState::new(),
        }
    }

    #[test]
    fn coalescible_steps_share_a_group() {
        let mut history = History::new(10);
        let a = history.push_step(step(), true);
        let b = history.push_step(step(), true);
        let c = history.push_step(step(), false);
        assert_eq!(a, b);
        assert_ne!(b, c);
        assert_eq!(history.undo_depth(), 2);
        assert_eq!(history.pop_undo_group().map(|s| s.len()), Some(1));
        assert_eq!(history.undo_depth(), 1);
        assert_eq!(history.pop_undo_group().map(|s| s.len()), Some(2));
        assert!(!history.can_undo());
    }

    #[test]
    fn max_undo_drops_oldest_step() {
        let mut history = History::new(2);
        history.push_step(step(), false);
        history.push_step(step(), false);
        history.push_step(step(), false);
        assert_eq!(history.undo_depth(), 2);
    }

    #[test]
    fn merge_without_steps_reports_false() {
        let mut history = History::new(2);
        assert!(!history.merge_into_last(EditorState::new()));
        history.push_step(step(), false);
        assert!(history.merge_into_last(EditorState::new()));
        assert_eq!(history.undo_depth(), 1);
    }
}
