//! Key events dispatched to the editor.

/// Logical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable character (space included).
    Char(char),
    /// Backspace.
    Backspace,
    /// Forward delete.
    Delete,
    /// Enter / Return.
    Enter,
    /// Tab.
    Tab,
    /// Escape.
    Escape,
    /// Left arrow.
    ArrowLeft,
    /// Right arrow.
    ArrowRight,
    /// Up arrow.
    ArrowUp,
    /// Down arrow.
    ArrowDown,
}

/// A key press with its modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    /// The key.
    pub key: Key,
    /// Ctrl held.
    pub ctrl: bool,
    /// Meta (Cmd / Win) held.
    pub meta: bool,
    /// Alt / Option held.
    pub alt: bool,
    /// Shift held.
    pub shift: bool,
}

impl KeyEvent {
    /// Key press without modifiers.
    pub fn new(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            meta: false,
            alt: false,
            shift: false,
        }
    }

    /// Typed character without modifiers.
    pub fn char(c: char) -> Self {
        Self::new(Key::Char(c))
    }

    /// Same key with Ctrl held.
    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    /// Same key with Meta held.
    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    /// The typed character, if this is a character key.
    pub fn typed_char(&self) -> Option<char> {
        match self.key {
            Key::Char(c) => Some(c),
            _ => None,
        }
    }

    /// `true` when Ctrl or Meta is held (shortcut chords).
    pub fn has_command_modifier(&self) -> bool {
        self.ctrl || self.meta
    }
}
