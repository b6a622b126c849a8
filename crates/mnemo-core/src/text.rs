//! Bounded text sink for rendered instructions.

use std::fmt;

/// Longest rendering a decoder produces, in bytes.
pub const MAX_TEXT_LEN: usize = 127;

/// A `fmt::Write` sink that stops accepting text at [`MAX_TEXT_LEN`] bytes.
///
/// Overflowing writes are cut at the last char boundary that fits and the
/// buffer remembers that it was truncated. Writes never fail, so `write!`
/// chains keep going after the limit is hit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    text: String,
    truncated: bool,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self {
            text: String::with_capacity(32),
            truncated: false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Returns true if some text was dropped.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Pads with spaces up to `column` (no-op if already past it).
    pub fn pad_to(&mut self, column: usize) {
        let column = column.min(MAX_TEXT_LEN);
        while self.text.len() < column {
            self.text.push(' ');
        }
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.truncated = false;
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Write for TextBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = MAX_TEXT_LEN - self.text.len();
        if s.len() <= room {
            self.text.push_str(s);
            return Ok(());
        }
        let mut cut = room;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        self.text.push_str(&s[..cut]);
        self.truncated = true;
        Ok(())
    }
}

impl fmt::Display for TextBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<TextBuffer> for String {
    fn from(buffer: TextBuffer) -> Self {
        buffer.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    #[test]
    fn test_short_text_untouched() {
        let mut buf = TextBuffer::new();
        write!(buf, "add r0, r1, #{}", 2).unwrap();
        assert_eq!(buf.as_str(), "add r0, r1, #2");
        assert!(!buf.is_truncated());
    }

    #[test]
    fn test_truncates_at_limit() {
        let mut buf = TextBuffer::new();
        for _ in 0..20 {
            write!(buf, "abcdefghij").unwrap();
        }
        assert_eq!(buf.len(), MAX_TEXT_LEN);
        assert!(buf.is_truncated());
    }

    #[test]
    fn test_truncates_on_char_boundary() {
        let mut buf = TextBuffer::new();
        buf.write_str(&"a".repeat(MAX_TEXT_LEN - 1)).unwrap();
        buf.write_str("é").unwrap();
        assert_eq!(buf.len(), MAX_TEXT_LEN - 1);
        assert!(buf.is_truncated());
    }

    #[test]
    fn test_pad_to_column() {
        let mut buf = TextBuffer::new();
        buf.write_str("nop").unwrap();
        buf.pad_to(8);
        buf.write_str("; x").unwrap();
        assert_eq!(buf.as_str(), "nop     ; x");
        buf.pad_to(2);
        assert_eq!(buf.len(), 11);
    }
}
