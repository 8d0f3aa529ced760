//! Character-offset helpers.
//!
//! All public offsets in this workspace are **character offsets** (Unicode scalar values), while
//! Rust string slicing and regex engines work in bytes. [`char_offset`] and [`byte_offset`] map
//! between the two.

use unicode_segmentation::UnicodeSegmentation;

/// Length of `text` in characters.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte offset of `char_offset` in `text` (clamped to the end).
pub fn byte_offset(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(b, _)| b)
        .unwrap_or(text.len())
}

/// Character offset of the char boundary `byte_offset` (clamped to the end).
pub fn char_offset(text: &str, byte_offset: usize) -> usize {
    text.get(..byte_offset).map_or_else(|| char_len(text), char_len)
}

/// Substring by character range (clamped).
pub fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let start_byte = byte_offset(text, start);
    let end_byte = byte_offset(text, end.max(start));
    &text[start_byte..end_byte]
}

/// Character at `char_offset`.
pub fn char_at(text: &str, char_offset: usize) -> Option<char> {
    text.chars().nth(char_offset)
}

fn grapheme_boundaries(text: &str) -> Vec<usize> {
    let mut boundaries = vec![0];
    let mut chars = 0usize;
    for grapheme in text.graphemes(true) {
        chars += grapheme.chars().count();
        boundaries.push(chars);
    }
    boundaries
}

/// Next grapheme boundary after `char_offset`, if any.
pub fn next_grapheme_offset(text: &str, char_offset: usize) -> Option<usize> {
    grapheme_boundaries(text)
        .into_iter()
        .find(|&boundary| boundary > char_offset)
}

/// Previous grapheme boundary before `char_offset`, if any.
pub fn prev_grapheme_offset(text: &str, char_offset: usize) -> Option<usize> {
    grapheme_boundaries(text)
        .into_iter()
        .rev()
        .find(|&boundary| boundary < char_offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_map_multibyte_text() {
        let text = "añb";
        assert_eq!(byte_offset(text, 2), 3);
        assert_eq!(char_offset(text, 3), 2);
        assert_eq!(char_offset(text, 99), 3);
        assert_eq!(char_at(text, 1), Some('ñ'));
        assert_eq!(char_at(text, 3), None);
    }

    #[test]
    fn grapheme_steps_skip_combining_marks() {
        // "e" + combining acute accent is one grapheme of two chars.
        let text = "ae\u{301}b";
        assert_eq!(next_grapheme_offset(text, 1), Some(3));
        assert_eq!(prev_grapheme_offset(text, 3), Some(1));
        assert_eq!(next_grapheme_offset(text, 4), None);
        assert_eq!(prev_grapheme_offset(text, 0), None);
    }

    #[test]
    fn char_slice_clamps() {
        assert_eq!(char_slice("hello", 1, 3), "el");
        assert_eq!(char_slice("hello", 3, 99), "lo");
        assert_eq!(char_slice("hello", 4, 2), "");
    }
}
