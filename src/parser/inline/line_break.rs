//! Hard line breaks: two or more trailing spaces, or a backslash, before a
//! line ending that is not the last one of the host.
use std::ops::RangeInclusive;

use crate::element::{tokens, types};
use crate::parser::sequential::{
    ParseContext, ParsingResult, SequentialNode, indices, position_of,
};
use crate::parser::token_cache::TokenCache;

pub(crate) fn parse(
    cache: &TokenCache<'_>,
    list: &[RangeInclusive<usize>],
    _context: &ParseContext<'_>,
) -> ParsingResult {
    let indices = indices(list);
    let mut nodes = Vec::new();

    for &index in &indices {
        let Some(kind) = cache.kind(index) else {
            continue;
        };
        if kind == tokens::EOL && index + 1 < cache.len() {
            let trailing = cache.iter_at(index).raw_token(-1).filter(|token| {
                token.kind == tokens::WHITE_SPACE && token.text(cache.text()).ends_with("  ")
            });
            if trailing.is_some() {
                nodes.push(SequentialNode::new(types::HARD_LINE_BREAK, index..=index));
            }
        } else if kind == tokens::BACKSLASH
            && cache.kind(index + 1) == Some(tokens::EOL)
            && cache.end(index) == cache.start(index + 1)
            && index + 2 < cache.len()
            && position_of(&indices, index + 1).is_some()
        {
            nodes.push(SequentialNode::new(types::HARD_LINE_BREAK, index..=index + 1));
        }
    }

    ParsingResult {
        nodes,
        further: vec![list.to_vec()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{Lexer, LexerState};
    use crate::parser::link_map::LinkMap;

    fn breaks(text: &str) -> Vec<String> {
        let mut lexer = Lexer::inline(text);
        lexer.reset(0..text.len(), LexerState::Inline);
        let cache = TokenCache::new(text, 0..text.len(), lexer.collect());
        let map = LinkMap::new();
        let context = ParseContext::new(&map);
        parse(&cache, &[0..=cache.len() - 1], &context)
            .nodes
            .iter()
            .map(|node| cache.span_text(*node.range.start(), *node.range.end()).to_string())
            .collect()
    }

    #[test]
    fn trailing_spaces() {
        assert_eq!(breaks("a  \nb"), vec!["\n"]);
        assert!(breaks("a \nb").is_empty());
    }

    #[test]
    fn backslash() {
        assert_eq!(breaks("a\\\nb"), vec!["\\\n"]);
    }

    #[test]
    fn not_at_end_of_host() {
        assert!(breaks("a  \n").is_empty());
        assert!(breaks("a\\\n").is_empty());
    }
}
