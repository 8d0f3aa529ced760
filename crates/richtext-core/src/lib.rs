#![warn(missing_docs)]
//! Richtext Core - Headless Rich-Text Document Runtime
//!
//! # Overview
//!
//! `richtext-core` is a small headless rich-text kernel: a tree of paragraphs holding text runs
//! and atomic decorator nodes, a selection model with anchor/focus points, atomic updates with
//! undo/redo history, change notifications, default key handling and a JSON document format.
//! It does not render anything; integrations (such as `richtext-core-mentions`) build editing
//! behavior on top of its primitives.
//!
//! # Core Features
//!
//! - **Versioned State**: each update clones the committed state, mutates and normalizes it
//! - **Stable Node Keys**: keys survive across versions, so integrations can hold on to them
//! - **Atomic Decorators**: the caret crosses a decorator in one step and deletes it whole
//! - **Undo/Redo**: one step per update, typing coalesces, history-merge tags fold updates
//! - **Serialization**: JSON import/export with a registry for integration node types
//!
//! # Quick Start
//!
//! ```rust
//! use richtext_core::{Editor, Key, KeyEvent, Point};
//!
//! let mut editor = Editor::new();
//! editor.update(|state| {
//!     let paragraph = state.paragraphs()[0];
//!     let text = state.create_text("Hello");
//!     state.append(paragraph, text).unwrap();
//!     state.select(Point::text(text, 5));
//! });
//!
//! editor.dispatch_key(&KeyEvent::char('!'));
//! editor.dispatch_key(&KeyEvent::new(Key::ArrowLeft));
//! editor.dispatch_key(&KeyEvent::new(Key::Backspace));
//!
//! assert_eq!(editor.state().document_text(), "Hell!");
//! ```
//!
//! # Module Description
//!
//! - [`node`] - node payloads, decorator trait and node registry
//! - [`selection`] - points and selections
//! - [`state`] - the node store and its mutation primitives
//! - [`editor`] - atomic updates, history and notifications
//! - [`serialize`] - JSON document format
//! - [`text`] - character offset helpers

pub mod editor;
pub mod error;
mod history;
pub mod keys;
pub mod node;
pub mod selection;
pub mod serialize;
pub mod state;
pub mod text;

pub use editor::{Editor, UpdateEvent, UpdateListener, UpdateOptions, UpdateTag};
pub use error::EditorError;
pub use keys::{Key, KeyEvent};
pub use node::{DecoratorImportFn, DecoratorNode, Node, NodeData, NodeKey, NodeRegistry};
pub use selection::{Point, Selection};
pub use state::{Direction, EditorState};
