use unicode_segmentation::UnicodeSegmentation;

/// Represents a location in the source text.
///
/// `line` and `column` are 1-based; columns count grapheme clusters so that
/// multi-byte characters and combining sequences occupy a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn new() -> Self {
        Self {
            line: 1,
            column: 1,
            offset: 0,
        }
    }

    /// Computes the position of a byte offset within `text`.
    ///
    /// Offsets past the end (or inside a multi-byte character) are clamped to
    /// the nearest preceding character boundary.
    pub fn at(text: &str, offset: usize) -> Self {
        let mut target = offset.min(text.len());
        while !text.is_char_boundary(target) {
            target -= 1;
        }

        let mut position = Self::new();
        for grapheme in text[..target].graphemes(true) {
            if grapheme == "\n" || grapheme == "\r\n" || grapheme == "\r" {
                position.line += 1;
                position.column = 1;
            } else {
                position.column += 1;
            }
        }
        position.offset = target;
        position
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_of_text() {
        assert_eq!(Position::at("abc", 0), Position::new());
    }

    #[test]
    fn counts_lines_and_graphemes() {
        let text = "ab\ne\u{301}x";
        let position = Position::at(text, text.len() - 1);
        assert_eq!(position.line, 2);
        assert_eq!(position.column, 2);
    }

    #[test]
    fn crlf_is_one_line_break() {
        let position = Position::at("a\r\nb", 3);
        assert_eq!((position.line, position.column), (2, 1));
    }

    #[test]
    fn clamps_out_of_range_offsets() {
        let position = Position::at("é", 1);
        assert_eq!(position.offset, 0);
        assert_eq!(Position::at("ab", 99).offset, 2);
    }
}
