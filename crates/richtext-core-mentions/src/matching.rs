//! Matching engine.
//!
//! Run after every committed update, the engine decides from the current document alone whether
//! a mention is being typed at the caret:
//!
//! ```text
//!            match found               commit
//!   Idle ─────────────────▶ Matching ─────────▶ Selecting ──▶ Idle
//!    ▲                         │
//!    └──── match lost / Esc ───┘
//! ```
//!
//! A match requires a collapsed text caret, the query pattern matching the text before the caret
//! and no mention-body character right after the caret. After Escape the same match stays
//! suppressed until the matched text changes.

use crate::inspect::{inspect, text_before_caret};
use crate::menu::MatchSpan;
use crate::pattern::{PatternSet, QueryMatch};
use richtext_core::{EditorState, NodeKey};

/// The mention being typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveMatch {
    /// Text node holding the caret.
    pub node: NodeKey,
    /// Caret offset within `node`.
    pub caret: usize,
    /// Pattern match on the text before the caret.
    pub query: QueryMatch,
}

impl ActiveMatch {
    /// Trigger of the match.
    pub fn trigger(&self) -> &str {
        &self.query.trigger
    }

    /// Query typed after the trigger.
    pub fn query_string(&self) -> &str {
        &self.query.matching_string
    }

    /// Span from the trigger to the caret.
    pub fn span(&self) -> MatchSpan {
        MatchSpan {
            start: self.query.lead_offset,
            end: self.caret,
        }
    }
}

/// Engine state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MatchState {
    /// No mention is being typed.
    #[default]
    Idle,
    /// A mention is being typed.
    Matching(ActiveMatch),
    /// A candidate is being committed.
    Selecting(ActiveMatch),
}

/// Result of re-evaluating the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchTransition {
    /// Nothing changed.
    Unchanged,
    /// A new match started.
    Opened(ActiveMatch),
    /// The current match changed (typically the query).
    Changed(ActiveMatch),
    /// The match ended.
    Closed,
}

/// Evaluate the caret without touching engine state.
pub fn find_active_match(
    state: &EditorState,
    patterns: &PatternSet,
    allow_spaces: bool,
) -> Option<ActiveMatch> {
    let (node, caret, prefix) = text_before_caret(state)?;
    let query = patterns.find_match(&prefix, allow_spaces)?;
    let context = inspect(state, patterns)?;
    if context.word_char_after {
        return None;
    }
    Some(ActiveMatch { node, caret, query })
}

/// The matching state machine.
#[derive(Debug, Clone)]
pub struct MatchingEngine {
    patterns: PatternSet,
    allow_spaces: bool,
    state: MatchState,
    suppressed: Option<ActiveMatch>,
}

impl MatchingEngine {
    /// Idle engine.
    pub fn new(patterns: PatternSet, allow_spaces: bool) -> Self {
        Self {
            patterns,
            allow_spaces,
            state: MatchState::Idle,
            suppressed: None,
        }
    }

    /// Compiled patterns.
    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Current state.
    pub fn state(&self) -> &MatchState {
        &self.state
    }

    /// Active match, if any.
    pub fn active(&self) -> Option<&ActiveMatch> {
        match &self.state {
            MatchState::Matching(active) | MatchState::Selecting(active) => Some(active),
            MatchState::Idle => None,
        }
    }

    /// Re-evaluate against `state`.
    pub fn update(&mut self, state: &EditorState) -> MatchTransition {
        let found = find_active_match(state, &self.patterns, self.allow_spaces);

        if let Some(suppressed) = &self.suppressed {
            if found.as_ref().is_some_and(|m| same_text(m, suppressed)) {
                return self.close();
            }
            self.suppressed = None;
        }

        match (found, self.active().cloned()) {
            (None, None) => MatchTransition::Unchanged,
            (None, Some(_)) => self.close(),
            (Some(found), None) => {
                self.state = MatchState::Matching(found.clone());
                MatchTransition::Opened(found)
            }
            (Some(found), Some(current)) => {
                if current == found {
                    return MatchTransition::Unchanged;
                }
                let reopened = current.trigger() != found.trigger()
                    || current.node != found.node
                    || current.query.lead_offset != found.query.lead_offset;
                self.state = MatchState::Matching(found.clone());
                if reopened {
                    MatchTransition::Opened(found)
                } else {
                    MatchTransition::Changed(found)
                }
            }
        }
    }

    /// Escape: close and keep this match closed until its text changes.
    pub fn suppress(&mut self) {
        if let Some(active) = self.active().cloned() {
            self.suppressed = Some(active);
        }
        self.state = MatchState::Idle;
    }

    /// Lift a pending Escape suppression.
    pub fn release(&mut self) {
        self.suppressed = None;
    }

    /// Enter the commit phase. Returns the match being committed.
    pub fn begin_commit(&mut self) -> Option<ActiveMatch> {
        let MatchState::Matching(active) = &self.state else {
            return None;
        };
        let active = active.clone();
        self.state = MatchState::Selecting(active.clone());
        Some(active)
    }

    /// Back to idle without suppression.
    pub fn reset(&mut self) {
        self.state = MatchState::Idle;
    }

    fn close(&mut self) -> MatchTransition {
        match std::mem::take(&mut self.state) {
            MatchState::Idle => MatchTransition::Unchanged,
            _ => MatchTransition::Closed,
        }
    }
}

fn same_text(a: &ActiveMatch, b: &ActiveMatch) -> bool {
    a.node == b.node
        && a.query.lead_offset == b.query.lead_offset
        && a.query.replaceable_string == b.query.replaceable_string
}
