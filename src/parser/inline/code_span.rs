//! Code spans: a backtick run closed by the next run of the same length.
use std::collections::HashMap;
use std::ops::RangeInclusive;

use crate::element::{tokens, types};
use crate::parser::sequential::{
    Claim, ParseContext, ParsingResult, SequentialNode, indices, partition,
};
use crate::parser::token_cache::TokenCache;

/// Backtick count of a token that can close a code span.
fn closing_run(cache: &TokenCache<'_>, index: usize) -> Option<usize> {
    let length = cache.token_text(index).len();
    match cache.kind(index)? {
        kind if kind == tokens::BACKTICK => Some(length),
        // `\`` inside a code span: the backslash is literal content.
        kind if kind == tokens::ESCAPED_BACKTICKS => Some(length - 1),
        _ => None,
    }
}

pub(crate) fn parse(
    cache: &TokenCache<'_>,
    list: &[RangeInclusive<usize>],
    _context: &ParseContext<'_>,
) -> ParsingResult {
    let indices = indices(list);

    // Positions of closing candidates, by run length.
    let mut closers: HashMap<usize, Vec<usize>> = HashMap::new();
    for (position, index) in indices.iter().enumerate() {
        if let Some(run) = closing_run(cache, *index) {
            closers.entry(run).or_default().push(position);
        }
    }

    let mut nodes = Vec::new();
    let mut claims = Vec::new();
    let mut position = 0;
    while position < indices.len() {
        let index = indices[position];
        if cache.kind(index) != Some(tokens::BACKTICK) {
            position += 1;
            continue;
        }

        let run = cache.token_text(index).len();
        let closer = closers.get(&run).and_then(|candidates| {
            let next = candidates.partition_point(|candidate| *candidate <= position);
            candidates.get(next).copied()
        });
        match closer {
            Some(end) => {
                let range = index..=indices[end];
                nodes.push(SequentialNode::new(types::CODE_SPAN, range.clone()));
                claims.push(Claim::whole(range));
                position = end + 1;
            }
            None => position += 1,
        }
    }

    ParsingResult {
        further: partition(&indices, &claims),
        nodes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{Lexer, LexerState};
    use crate::parser::link_map::LinkMap;

    fn spans(text: &str) -> Vec<String> {
        let mut lexer = Lexer::inline(text);
        lexer.reset(0..text.len(), LexerState::Inline);
        let cache = TokenCache::new(text, 0..text.len(), lexer.collect());
        let map = LinkMap::new();
        let context = ParseContext::new(&map);
        let result = parse(&cache, &[0..=cache.len() - 1], &context);
        result
            .nodes
            .iter()
            .map(|node| cache.span_text(*node.range.start(), *node.range.end()).to_string())
            .collect()
    }

    #[test]
    fn matching_runs() {
        assert_eq!(spans("a `b` c ``d`e`` f"), vec!["`b`", "``d`e``"]);
    }

    #[test]
    fn unmatched_run_is_literal() {
        assert_eq!(spans("``a` `b`"), vec!["` `"]);
    }

    #[test]
    fn backslash_before_closer_is_content() {
        assert_eq!(spans(r"`a\`"), vec![r"`a\`"]);
    }
}
