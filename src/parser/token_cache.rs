//! Random-access view over the tokens of one inline host.
//!
//! Inline parsers address tokens by index into the normalized view, which
//! leaves out WHITE_SPACE. The raw stream stays reachable through
//! [`Iter::raw_lookup`], and character lookups see the source text directly,
//! bounded by the host's range.
use std::ops::Range;

use crate::element::{ElementType, tokens};
use crate::lexer::Token;

#[derive(Debug, Clone)]
pub struct TokenCache<'a> {
    text: &'a str,
    range: Range<usize>,
    raw: Vec<Token>,
    /// Raw index of each normalized token.
    normalized: Vec<usize>,
}

impl<'a> TokenCache<'a> {
    /// `raw` must tile `range` of `text`.
    pub fn new(text: &'a str, range: Range<usize>, raw: Vec<Token>) -> Self {
        let normalized = raw
            .iter()
            .enumerate()
            .filter(|(_, token)| token.kind != tokens::WHITE_SPACE)
            .map(|(index, _)| index)
            .collect();
        Self {
            text,
            range,
            raw,
            normalized,
        }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Byte range of the host.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// Number of normalized tokens.
    pub fn len(&self) -> usize {
        self.normalized.len()
    }

    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }

    pub fn raw_tokens(&self) -> &[Token] {
        &self.raw
    }

    pub fn into_raw_tokens(self) -> Vec<Token> {
        self.raw
    }

    pub fn token(&self, index: usize) -> Option<Token> {
        self.normalized
            .get(index)
            .and_then(|raw| self.raw.get(*raw))
            .copied()
    }

    pub fn kind(&self, index: usize) -> Option<ElementType> {
        self.token(index).map(|token| token.kind)
    }

    /// Start offset of a token; the host end for indices past the end.
    pub fn start(&self, index: usize) -> usize {
        self.token(index).map_or(self.range.end, |token| token.start)
    }

    pub fn end(&self, index: usize) -> usize {
        self.token(index).map_or(self.range.end, |token| token.end)
    }

    pub fn token_text(&self, index: usize) -> &'a str {
        self.token(index).map_or("", |token| token.text(self.text))
    }

    /// Source text from the start of `first` to the end of `last`.
    pub fn span_text(&self, first: usize, last: usize) -> &'a str {
        self.text.get(self.start(first)..self.end(last)).unwrap_or("")
    }

    /// Source text from the start of `index` to the end of the host.
    pub fn text_from(&self, index: usize) -> &'a str {
        self.text.get(self.start(index)..self.range.end).unwrap_or("")
    }

    /// Index of the normalized token starting exactly at `offset`.
    pub fn index_starting_at(&self, offset: usize) -> Option<usize> {
        let position = self
            .normalized
            .partition_point(|raw| self.raw[*raw].start < offset);
        (self.start(position) == offset && position < self.len()).then_some(position)
    }

    /// Index of the normalized token ending exactly at `offset`.
    pub fn index_ending_at(&self, offset: usize) -> Option<usize> {
        let position = self
            .normalized
            .partition_point(|raw| self.raw[*raw].end < offset);
        (position < self.len() && self.end(position) == offset).then_some(position)
    }

    pub fn iter_at(&self, index: usize) -> Iter<'_, 'a> {
        Iter { cache: self, index }
    }

    /// The character just before `offset`, if it is inside the host.
    pub fn char_before(&self, offset: usize) -> Option<char> {
        if offset <= self.range.start || offset > self.range.end {
            return None;
        }
        self.text.get(self.range.start..offset)?.chars().next_back()
    }

    /// The character at `offset`, if it is inside the host.
    pub fn char_at(&self, offset: usize) -> Option<char> {
        if offset < self.range.start || offset >= self.range.end {
            return None;
        }
        self.text.get(offset..self.range.end)?.chars().next()
    }
}

/// Cursor over the normalized tokens of a [`TokenCache`].
#[derive(Debug, Clone, Copy)]
pub struct Iter<'c, 'a> {
    cache: &'c TokenCache<'a>,
    index: usize,
}

impl<'c, 'a> Iter<'c, 'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> Option<ElementType> {
        self.cache.kind(self.index)
    }

    pub fn start(&self) -> usize {
        self.cache.start(self.index)
    }

    pub fn end(&self) -> usize {
        self.cache.end(self.index)
    }

    pub fn text(&self) -> &'a str {
        self.cache.token_text(self.index)
    }

    pub fn advance(self) -> Self {
        Self {
            cache: self.cache,
            index: self.index + 1,
        }
    }

    /// Type of the raw token `steps` away from this one, whitespace
    /// included.
    pub fn raw_lookup(&self, steps: isize) -> Option<ElementType> {
        self.raw_token(steps).map(|token| token.kind)
    }

    pub fn raw_token(&self, steps: isize) -> Option<Token> {
        let raw = *self.cache.normalized.get(self.index)?;
        let target = raw.checked_add_signed(steps)?;
        self.cache.raw.get(target).copied()
    }

    /// `-1`: the character before this token; `0`: its first character;
    /// `1`: the character after it. `None` outside the host.
    pub fn char_lookup(&self, delta: isize) -> Option<char> {
        match delta {
            -1 => self.cache.char_before(self.start()),
            0 => self.cache.char_at(self.start()),
            1 => self.cache.char_at(self.end()),
            _ => None,
        }
    }
}
