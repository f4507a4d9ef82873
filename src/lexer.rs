//! Lexical analysis.
//!
//! The [`Lexer`] turns a range of the source buffer into a flat stream of
//! [`Token`]s. Tokens never copy text; they carry byte offsets into the
//! buffer the lexer was created over. The lexer never fails: anything it
//! cannot classify becomes a TEXT token, and the emitted tokens always tile
//! the lexed range exactly.
use std::ops::Range;

use crate::element::{ElementType, tokens};

mod position;
mod rules;

pub use position::Position;

/// Lexical mode.
///
/// Block mode only separates line endings, whitespace and text runs; the
/// marker processor assigns block structure on top of those. Inline mode
/// additionally splits out the punctuation, escapes and entities that inline
/// parsers key on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LexerState {
    #[default]
    Block,
    Inline,
}

/// A typed range of the source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: ElementType,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn new(kind: ElementType, start: usize, end: usize) -> Self {
        Self { kind, start, end }
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns the slice of `source` this token covers.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

/// Lazy, resettable tokenizer over a range of a text buffer.
#[derive(Debug, Clone)]
pub struct Lexer<'input> {
    text: &'input str,
    end: usize,
    cursor: usize,
    token_start: usize,
    token_end: usize,
    state: LexerState,
}

impl<'input> Lexer<'input> {
    /// Creates a lexer over the whole of `text`.
    pub fn new(text: &'input str, state: LexerState) -> Self {
        let mut lexer = Self {
            text,
            end: 0,
            cursor: 0,
            token_start: 0,
            token_end: 0,
            state,
        };
        lexer.reset(0..text.len(), state);
        lexer
    }

    /// Block-granularity lexer over the whole buffer.
    pub fn block(text: &'input str) -> Self {
        Self::new(text, LexerState::Block)
    }

    /// Inline-granularity lexer; rebind it to a span with [`Lexer::reset`].
    pub fn inline(text: &'input str) -> Self {
        Self::new(text, LexerState::Inline)
    }

    /// Rebinds the lexer to a new range and state of the same buffer.
    ///
    /// Range bounds are clamped to the buffer and moved back onto character
    /// boundaries.
    pub fn reset(&mut self, range: Range<usize>, state: LexerState) {
        let end = floor_char_boundary(self.text, range.end);
        let start = floor_char_boundary(self.text, range.start).min(end);

        self.cursor = start;
        self.end = end;
        self.token_start = start;
        self.token_end = start;
        self.state = state;
    }

    /// Advances to the next token and returns its type, or `None` at the end
    /// of the range.
    pub fn advance(&mut self) -> Option<ElementType> {
        if self.cursor >= self.end {
            return None;
        }

        let input = &self.text[self.cursor..self.end];
        let parsed = match self.state {
            LexerState::Block => rules::block_token(input),
            LexerState::Inline => rules::inline_token(input),
        };

        let (kind, mut consumed) = match parsed {
            Ok((rest, kind)) => (kind, input.len() - rest.len()),
            Err(_) => (tokens::TEXT, 0),
        };
        if consumed == 0 {
            consumed = input.chars().next().map_or(input.len(), char::len_utf8);
        }

        self.token_start = self.cursor;
        self.cursor += consumed;
        self.token_end = self.cursor;
        Some(kind)
    }

    pub fn token_start(&self) -> usize {
        self.token_start
    }

    pub fn token_end(&self) -> usize {
        self.token_end
    }

    pub fn state(&self) -> LexerState {
        self.state
    }

    pub fn text(&self) -> &'input str {
        self.text
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let kind = self.advance()?;
        Some(Token::new(kind, self.token_start, self.token_end))
    }
}

fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str, state: LexerState) -> Vec<(ElementType, &str)> {
        Lexer::new(text, state)
            .map(|token| (token.kind, token.text(text)))
            .collect()
    }

    #[test]
    fn block_mode_splits_lines_and_whitespace() {
        assert_eq!(
            kinds("# Hi *x*\n\n  b", LexerState::Block),
            vec![
                (tokens::TEXT, "#"),
                (tokens::WHITE_SPACE, " "),
                (tokens::TEXT, "Hi"),
                (tokens::WHITE_SPACE, " "),
                (tokens::TEXT, "*x*"),
                (tokens::EOL, "\n"),
                (tokens::EOL, "\n"),
                (tokens::WHITE_SPACE, "  "),
                (tokens::TEXT, "b"),
            ]
        );
    }

    #[test]
    fn inline_mode_splits_punctuation() {
        assert_eq!(
            kinds("a *b* [c](d) `e`", LexerState::Inline)
                .into_iter()
                .map(|(kind, _)| kind)
                .collect::<Vec<_>>(),
            vec![
                tokens::TEXT,
                tokens::WHITE_SPACE,
                tokens::EMPH,
                tokens::TEXT,
                tokens::EMPH,
                tokens::WHITE_SPACE,
                tokens::LBRACKET,
                tokens::TEXT,
                tokens::RBRACKET,
                tokens::LPAREN,
                tokens::TEXT,
                tokens::RPAREN,
                tokens::WHITE_SPACE,
                tokens::BACKTICK,
                tokens::TEXT,
                tokens::BACKTICK,
            ]
        );
    }

    #[test]
    fn reset_rebinds_range_and_state() {
        let text = "skip **this**";
        let mut lexer = Lexer::block(text);
        lexer.reset(5..text.len(), LexerState::Inline);

        assert_eq!(lexer.advance(), Some(tokens::EMPH));
        assert_eq!((lexer.token_start(), lexer.token_end()), (5, 6));
        assert_eq!(lexer.state(), LexerState::Inline);
    }

    #[test]
    fn tokens_tile_arbitrary_input() {
        let text = "\u{0}é&#;\\\r\n~~<a href=\"x\">\t";
        for state in [LexerState::Block, LexerState::Inline] {
            let mut expected = 0;
            for token in Lexer::new(text, state) {
                assert_eq!(token.start, expected);
                assert!(token.end > token.start);
                expected = token.end;
            }
            assert_eq!(expected, text.len());
        }
    }

    #[test]
    fn reset_clamps_to_char_boundaries() {
        let text = "éa";
        let mut lexer = Lexer::block(text);
        lexer.reset(1..99, LexerState::Block);
        let all: Vec<_> = lexer.collect();
        assert_eq!(all, vec![Token::new(tokens::TEXT, 0, 3)]);
    }
}
