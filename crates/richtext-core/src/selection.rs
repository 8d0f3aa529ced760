//! Selection model: anchor and focus points inside the node tree.

use crate::node::NodeKey;

/// A caret position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Point {
    /// Inside a text node; `offset` counts characters.
    Text {
        /// Text node key.
        key: NodeKey,
        /// Character offset within the text node.
        offset: usize,
    },
    /// Between children of an element; `offset` is a child index.
    Element {
        /// Element node key.
        key: NodeKey,
        /// Child index.
        offset: usize,
    },
}

impl Point {
    /// Text point helper.
    pub fn text(key: NodeKey, offset: usize) -> Self {
        Point::Text { key, offset }
    }

    /// Element point helper.
    pub fn element(key: NodeKey, offset: usize) -> Self {
        Point::Element { key, offset }
    }

    /// Node the point refers to.
    pub fn key(&self) -> NodeKey {
        match *self {
            Point::Text { key, .. } | Point::Element { key, .. } => key,
        }
    }

    /// Offset within the node.
    pub fn offset(&self) -> usize {
        match *self {
            Point::Text { offset, .. } | Point::Element { offset, .. } => offset,
        }
    }

    /// `true` for text points.
    pub fn is_text(&self) -> bool {
        matches!(self, Point::Text { .. })
    }

    pub(crate) fn with_offset(self, offset: usize) -> Self {
        match self {
            Point::Text { key, .. } => Point::Text { key, offset },
            Point::Element { key, .. } => Point::Element { key, offset },
        }
    }
}

/// Range selection. Collapsed when anchor and focus are the same point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Fixed end.
    pub anchor: Point,
    /// Moving end.
    pub focus: Point,
}

impl Selection {
    /// Collapsed selection at `point`.
    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point,
            focus: point,
        }
    }

    /// Range selection.
    pub fn range(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    /// `true` when anchor and focus are identical.
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub(crate) fn map_points(&mut self, mut f: impl FnMut(Point) -> Point) {
        self.anchor = f(self.anchor);
        self.focus = f(self.focus);
    }
}
