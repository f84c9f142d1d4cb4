//! Offset ↔ position mapping and identifier extraction.

use crate::types::Position;

/// Line start table for one text. Offsets are UTF-8 byte offsets; columns
/// are UTF-16 code units.
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(memchr::memchr_iter(b'\n', text.as_bytes()).map(|i| i + 1));
        Self { text, line_starts }
    }

    /// Offsets past the end clamp to the end of the text.
    #[must_use]
    pub fn position(&self, offset: usize) -> Position {
        let offset = floor_boundary(self.text, offset.min(self.text.len()));
        let line = match self.line_starts.binary_search(&offset) {
            Ok(l) => l,
            Err(l) => l - 1,
        };
        let start = self.line_starts[line];
        let column = self.text[start..offset].encode_utf16().count();
        Position::new(line as u32, column as u32)
    }

    /// Positions past the end of a line clamp to the line end (before `\r\n`);
    /// lines past the end clamp to the end of the text.
    #[must_use]
    pub fn offset(&self, pos: Position) -> usize {
        let Some(&start) = self.line_starts.get(pos.line as usize) else {
            return self.text.len();
        };
        let line = self.line_text(pos.line as usize);
        let mut units = 0u32;
        for (i, ch) in line.char_indices() {
            if units >= pos.column {
                return start + i;
            }
            units += ch.len_utf16() as u32;
        }
        start + line.len()
    }

    /// Text of one line without its terminator.
    #[must_use]
    pub fn line_text(&self, line: usize) -> &'a str {
        let Some(&start) = self.line_starts.get(line) else {
            return "";
        };
        let end = self
            .line_starts
            .get(line + 1)
            .map_or(self.text.len(), |&next| next - 1);
        self.text[start..end].trim_end_matches('\r')
    }
}

/// Identifier characters: the editor's word pattern minus punctuation.
#[must_use]
pub fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// The identifier touching `offset` (cursor inside it or just after it).
/// Returns the byte range and the word, or `None` when no word is there.
#[must_use]
pub fn word_at(text: &str, offset: usize) -> Option<(usize, &str)> {
    let offset = floor_boundary(text, offset.min(text.len()));
    let start = text[..offset]
        .char_indices()
        .rev()
        .take_while(|&(_, c)| is_ident_char(c))
        .last()
        .map_or(offset, |(i, _)| i);
    let end = text[offset..]
        .char_indices()
        .find(|&(_, c)| !is_ident_char(c))
        .map_or(text.len(), |(i, _)| offset + i);
    let word = &text[start..end];
    // A bare number is not something we can navigate to.
    if word.is_empty() || word.starts_with(|c: char| c.is_ascii_digit()) {
        None
    } else {
        Some((start, word))
    }
}

fn floor_boundary(text: &str, mut offset: usize) -> usize {
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_roundtrip_across_lines() {
        let text = "ab\ncd\r\nef";
        let idx = LineIndex::new(text);
        assert_eq!(idx.position(0), Position::new(0, 0));
        assert_eq!(idx.position(4), Position::new(1, 1));
        assert_eq!(idx.position(7), Position::new(2, 0));
        assert_eq!(idx.offset(Position::new(2, 1)), 8);
        assert_eq!(idx.line_text(1), "cd");
        assert_eq!(idx.line_text(2), "ef");
    }

    #[test]
    fn columns_count_utf16_units() {
        let text = "é😀x";
        let idx = LineIndex::new(text);
        // é = 1 unit, 😀 = 2 units
        assert_eq!(idx.position(text.len() - 1), Position::new(0, 3));
        assert_eq!(idx.offset(Position::new(0, 3)), text.len() - 1);
    }

    #[test]
    fn out_of_range_positions_clamp() {
        let idx = LineIndex::new("abc\nde");
        assert_eq!(idx.offset(Position::new(0, 99)), 3);
        assert_eq!(idx.offset(Position::new(9, 0)), 6);
        assert_eq!(idx.position(100), Position::new(1, 2));
    }

    #[test]
    fn word_at_cursor_inside_and_after() {
        let text = "foo.barBaz(1)";
        assert_eq!(word_at(text, 5), Some((4, "barBaz")));
        assert_eq!(word_at(text, 3), Some((0, "foo")));
        assert_eq!(word_at(text, 0), Some((0, "foo")));
        assert_eq!(word_at("$el.x", 1), Some((0, "$el")));
    }

    #[test]
    fn no_word_on_punctuation_or_numbers() {
        assert_eq!(word_at("a + b", 2), None);
        assert_eq!(word_at("x(42)", 3), None);
        assert_eq!(word_at("", 0), None);
    }
}
