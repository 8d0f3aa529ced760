#![warn(missing_docs)]
//! Richtext Core Mentions - Mention Matching and Mention Tokens
//!
//! # Overview
//!
//! `richtext-core-mentions` adds mentions to a [`richtext_core::Editor`]: typing a trigger such
//! as `@`, `#` or `due:` opens a suggestion session, and committing a candidate replaces the
//! typed text with an atomic mention token that the caret crosses in one step and that deletes
//! as a whole.
//!
//! # Core Features
//!
//! - **Pattern Library**: trigger, body, punctuation and length patterns compiled once per editor
//! - **Matching Engine**: recomputes the match from the document after every update
//! - **Mention Tokens**: trigger, value and ordered metadata, with JSON and DOM forms
//! - **Edit Rules**: insert, remove, rename, open-menu, conversion and protective spaces
//! - **Sessions**: static or remote candidates, debouncing, stale-result rejection
//! - **Combobox**: optional trigger catalogue while the editor has focus
//!
//! # Quick Start
//!
//! ```rust
//! use richtext_core::{Editor, KeyEvent, NodeRegistry};
//! use richtext_core_mentions::{
//!     ManualEnvironment, MentionsConfig, MentionsPlugin, register_mention_node,
//! };
//! use std::rc::Rc;
//!
//! let mut registry = NodeRegistry::new();
//! register_mention_node(&mut registry, None);
//! let mut editor = Editor::with_registry(registry);
//!
//! let config = MentionsConfig::new(["@"]).with_items("@", ["Anton", "Catherine"]);
//! let mut plugin =
//!     MentionsPlugin::new(&editor, config, Rc::new(ManualEnvironment::new())).unwrap();
//!
//! editor.update(|state| state.select_end());
//! for c in "@cat".chars() {
//!     plugin.handle_key(&mut editor, &KeyEvent::char(c));
//! }
//! assert_eq!(plugin.menu().items[0].value, "Catherine");
//!
//! plugin.select_option(&mut editor, 0);
//! assert_eq!(editor.state().debug_text(), "[@Catherine]");
//! ```
//!
//! # Module Description
//!
//! - [`pattern`] - regular expressions for triggers and mention bodies
//! - [`inspect`] - caret surroundings
//! - [`node`] - the mention token
//! - [`matching`] - the matching state machine
//! - [`transform`] - edit-transformation rules
//! - [`session`] - suggestion sessions and the search protocol
//! - [`menu`] - menu entries and composition
//! - [`config`] - plugin configuration
//! - [`env`] - clock and device capabilities
//! - [`plugin`] - the plugin tying everything to an editor

pub mod config;
pub mod env;
pub mod error;
pub mod inspect;
pub mod matching;
pub mod menu;
pub mod node;
pub mod pattern;
pub mod plugin;
pub mod session;
pub mod transform;

pub use config::{Creatable, MentionItem, MentionsConfig, MenuItemLimit, PerTrigger};
pub use env::{Environment, ManualEnvironment, SystemEnvironment};
pub use error::MentionError;
pub use inspect::{SelectionContext, inspect};
pub use matching::{ActiveMatch, MatchState, MatchTransition, MatchingEngine};
pub use menu::{ItemType, MatchSpan, MenuItem, MenuItemKind, MenuState};
pub use node::{
    DataValue, DomElement, MENTION_NODE_TYPE, MentionComponent, MentionData, MentionNode,
    as_mention, find_mentions, find_mentions_by, is_mention, register_mention_node,
};
pub use pattern::{PatternSet, QueryMatch, TextSegment};
pub use plugin::{MentionCommand, MentionsPlugin};
pub use session::{SearchRequest, SearchSource, SearchTicket, Session};
