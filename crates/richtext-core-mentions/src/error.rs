//! Plugin errors.

use richtext_core::EditorError;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors produced while configuring or running the mentions plugin.
pub enum MentionError {
    #[error("node type `{0}` is not registered with the editor")]
    /// The host editor cannot deserialize mention nodes.
    NodeTypeNotRegistered(&'static str),

    #[error("at least one trigger is required")]
    /// The trigger list is empty.
    NoTriggers,

    #[error("regex compile error for pattern '{pattern}': {message}")]
    /// A mention pattern failed to compile.
    PatternCompile {
        /// The regex pattern string.
        pattern: String,
        /// The compiler error message.
        message: String,
    },

    #[error("invalid trigger key '{key}': {message}")]
    /// A per-trigger configuration key is not a valid pattern.
    InvalidTriggerKey {
        /// The configuration key.
        key: String,
        /// The compiler error message.
        message: String,
    },

    #[error("configuration error: {0}")]
    /// Configuration data could not be parsed.
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    /// A document operation failed.
    Editor(#[from] EditorError),
}
