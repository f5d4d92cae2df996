//! Buffer text with line access.
//!
//! The whole buffer (source lines and rendered result lines alike) lives in a Rope, giving
//! O(log N) line lookup, insertion and deletion. Only `'\n'` separates lines: the Rope is built
//! without Unicode/CR line-break recognition so loaded bytes round-trip without translation.
//!
//! All offsets are in characters (Unicode scalar values).

use ropey::Rope;

/// Logical line index over the buffer text.
#[derive(Debug, Clone)]
pub struct LineIndex {
    rope: Rope,
}

impl LineIndex {
    /// Create an empty index (one empty line).
    pub fn new() -> Self {
        Self { rope: Rope::new() }
    }

    /// Build an index from text.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }

    /// Total line count. An empty buffer has one line; N newlines give N + 1 lines.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Total character count.
    pub fn char_count(&self) -> usize {
        self.rope.len_chars()
    }

    /// Length of a line in characters, excluding its newline.
    pub fn line_len(&self, line: usize) -> Option<usize> {
        if line >= self.rope.len_lines() {
            return None;
        }
        let start = self.rope.line_to_char(line);
        let end = if line + 1 < self.rope.len_lines() {
            self.rope.line_to_char(line + 1) - 1
        } else {
            self.rope.len_chars()
        };
        Some(end - start)
    }

    /// Text of a line, excluding its newline.
    pub fn line_text(&self, line: usize) -> Option<String> {
        if line >= self.rope.len_lines() {
            return None;
        }
        let mut text = self.rope.line(line).to_string();
        if text.ends_with('\n') {
            text.pop();
        }
        Some(text)
    }

    /// Character offset of `(line, offset)`, or `None` if it does not address the buffer.
    pub fn position_to_char(&self, line: usize, offset: usize) -> Option<usize> {
        let len = self.line_len(line)?;
        if offset > len {
            return None;
        }
        Some(self.rope.line_to_char(line) + offset)
    }

    /// Character offset of the end of `line` (before its newline).
    pub fn line_end_char(&self, line: usize) -> Option<usize> {
        let len = self.line_len(line)?;
        Some(self.rope.line_to_char(line) + len)
    }

    /// Character offset of the start of `line`.
    pub fn line_start_char(&self, line: usize) -> Option<usize> {
        if line >= self.rope.len_lines() {
            return None;
        }
        Some(self.rope.line_to_char(line))
    }

    /// Insert text at a character offset.
    pub fn insert(&mut self, char_offset: usize, text: &str) {
        let char_offset = char_offset.min(self.rope.len_chars());
        self.rope.insert(char_offset, text);
    }

    /// Remove the characters in `start..end`.
    pub fn remove(&mut self, start: usize, end: usize) {
        let end = end.min(self.rope.len_chars());
        if start < end {
            self.rope.remove(start..end);
        }
    }

    /// Text in `start..end` (character offsets).
    pub fn slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.rope.len_chars());
        if start >= end {
            return String::new();
        }
        self.rope.slice(start..end).to_string()
    }

    /// Complete buffer text, result lines included.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }
}

impl Default for LineIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_line_index() {
        let index = LineIndex::new();
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.char_count(), 0);
        assert_eq!(index.line_text(0).as_deref(), Some(""));
    }

    #[test]
    fn test_trailing_newline_adds_line() {
        let index = LineIndex::from_text("1\n2\n");
        assert_eq!(index.line_count(), 3);
        assert_eq!(index.line_text(2).as_deref(), Some(""));
        assert_eq!(index.line_len(1), Some(1));
    }

    #[test]
    fn test_carriage_return_is_not_a_line_break() {
        let index = LineIndex::from_text("a\r\nb\rc");
        assert_eq!(index.line_count(), 2);
        assert_eq!(index.line_text(0).as_deref(), Some("a\r"));
        assert_eq!(index.line_text(1).as_deref(), Some("b\rc"));
    }

    #[test]
    fn test_position_to_char() {
        let index = LineIndex::from_text("ABC\nDEF\nGHI");
        assert_eq!(index.position_to_char(0, 0), Some(0));
        assert_eq!(index.position_to_char(0, 3), Some(3));
        assert_eq!(index.position_to_char(1, 0), Some(4));
        assert_eq!(index.position_to_char(2, 2), Some(10));
        assert_eq!(index.position_to_char(0, 4), None);
        assert_eq!(index.position_to_char(3, 0), None);
    }

    #[test]
    fn test_utf8_cjk() {
        let index = LineIndex::from_text("你好\n世界");
        assert_eq!(index.line_len(0), Some(2));
        assert_eq!(index.position_to_char(1, 1), Some(4));
        assert_eq!(index.slice(3, 5), "世界");
    }

    #[test]
    fn test_insert_and_remove() {
        let mut index = LineIndex::from_text("Hello World");
        index.insert(6, "Beautiful\n");
        assert_eq!(index.text(), "Hello Beautiful\nWorld");
        assert_eq!(index.line_count(), 2);

        index.remove(6, 16);
        assert_eq!(index.text(), "Hello World");
        assert_eq!(index.line_count(), 1);
    }

    #[test]
    fn test_line_bounds() {
        let index = LineIndex::from_text("ab\ncde");
        assert_eq!(index.line_start_char(1), Some(3));
        assert_eq!(index.line_end_char(0), Some(2));
        assert_eq!(index.line_end_char(1), Some(6));
        assert_eq!(index.line_end_char(2), None);
    }
}
