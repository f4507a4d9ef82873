//! Links and images.
//!
//! The three link parsers share the bracket algorithm and differ in which
//! openers they act on and which forms they accept. Images run first and may
//! contain links. Inline and reference links deactivate every earlier link
//! opener once they form, since links do not nest.
use std::ops::{Range, RangeInclusive};

use crate::element::{tokens, types};
use crate::error::{ErrorInfo, ErrorSeverity, RecoveryKind};
use crate::parser::link_syntax::{inline_link_tail, link_label};
use crate::parser::sequential::{
    Claim, ParseContext, ParsingResult, SequentialNode, indices, partition, position_of,
};
use crate::parser::token_cache::TokenCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinkMode {
    /// `![text](…)` and `![text][label]` forms.
    Image,
    /// `[text](destination "title")`.
    Inline,
    /// `[text][label]`, `[label][]` and `[label]`.
    Reference,
}

#[derive(Debug, Clone, Copy)]
struct Opener {
    position: usize,
    image: bool,
    active: bool,
}

/// The link part of a match, without the image wrapper.
struct Matched {
    nodes: Vec<SequentialNode>,
    last_position: usize,
}

pub(crate) fn parse(
    mode: LinkMode,
    cache: &TokenCache<'_>,
    list: &[RangeInclusive<usize>],
    context: &ParseContext<'_>,
) -> ParsingResult {
    let indices = indices(list);
    let mut nodes = Vec::new();
    let mut claims = Vec::new();
    let mut openers: Vec<Opener> = Vec::new();
    let mut position = 0;

    while position < indices.len() {
        let kind = cache.kind(indices[position]);
        if kind == Some(tokens::LBRACKET) {
            openers.push(Opener {
                position,
                image: is_image_opener(cache, &indices, position),
                active: true,
            });
        } else if kind == Some(tokens::RBRACKET)
            && let Some(opener) = openers.pop()
            && opener.active
            && opener.image == (mode == LinkMode::Image)
            && let Some(matched) = match_link(mode, cache, &indices, opener.position, position, context)
        {
            let open = indices[opener.position];
            let close = indices[position];
            let last = indices[matched.last_position];
            let start = if opener.image { open - 1 } else { open };

            if opener.image {
                nodes.push(SequentialNode::new(types::IMAGE, start..=last));
            } else {
                context.record_link(cache.start(open)..cache.end(last));
                for earlier in openers.iter_mut().filter(|earlier| !earlier.image) {
                    earlier.active = false;
                }
            }
            nodes.extend(matched.nodes);
            claims.push(Claim::with_inner(start..=last, open + 1..=close.saturating_sub(1)));
            position = matched.last_position + 1;
            continue;
        }
        position += 1;
    }

    ParsingResult {
        further: partition(&indices, &claims),
        nodes,
    }
}

/// Byte ranges of the `(…)` tails that directly follow a closed bracket
/// pair and parse as an inline link tail. Raw HTML and autolinks never
/// start inside one, since the tail reads as link syntax first.
pub(crate) fn link_tails(cache: &TokenCache<'_>, indices: &[usize]) -> Vec<Range<usize>> {
    let mut tails = Vec::new();
    let mut openers = 0usize;
    for (position, &index) in indices.iter().enumerate() {
        let kind = cache.kind(index);
        if kind == Some(tokens::LBRACKET) {
            openers += 1;
        } else if kind == Some(tokens::RBRACKET) && openers > 0 {
            openers -= 1;
            if let Some(&paren) = indices.get(position + 1)
                && cache.kind(paren) == Some(tokens::LPAREN)
                && cache.start(paren) == cache.end(index)
                && let Some(tail) = inline_link_tail(cache.text_from(paren))
            {
                let start = cache.start(paren);
                tails.push(start..start + tail.end);
            }
        }
    }
    tails
}

/// Whether `offset` lies inside one of `tails`.
pub(crate) fn in_link_tail(tails: &[Range<usize>], offset: usize) -> bool {
    tails.iter().any(|tail| tail.contains(&offset))
}

/// A `[` directly preceded by `!`.
fn is_image_opener(cache: &TokenCache<'_>, indices: &[usize], position: usize) -> bool {
    let Some(previous) = position.checked_sub(1).map(|p| indices[p]) else {
        return false;
    };
    let open = indices[position];
    previous + 1 == open
        && cache.kind(previous) == Some(tokens::EXCLAMATION_MARK)
        && cache.end(previous) == cache.start(open)
}

fn match_link(
    mode: LinkMode,
    cache: &TokenCache<'_>,
    indices: &[usize],
    open_position: usize,
    close_position: usize,
    context: &ParseContext<'_>,
) -> Option<Matched> {
    match mode {
        LinkMode::Inline => inline_form(cache, indices, open_position, close_position),
        LinkMode::Reference => {
            let matched = reference_form(cache, indices, open_position, close_position, context)?;
            let range = cache.start(indices[open_position])
                ..cache.end(indices[matched.last_position]);
            (!context.overlaps_link(&range)).then_some(matched)
        }
        LinkMode::Image => inline_form(cache, indices, open_position, close_position)
            .or_else(|| reference_form(cache, indices, open_position, close_position, context)),
    }
}

/// `](destination "title")` after the link text.
fn inline_form(
    cache: &TokenCache<'_>,
    indices: &[usize],
    open_position: usize,
    close_position: usize,
) -> Option<Matched> {
    let open = indices[open_position];
    let close = indices[close_position];
    let paren = *indices.get(close_position + 1)?;
    if cache.kind(paren) != Some(tokens::LPAREN) || cache.start(paren) != cache.end(close) {
        return None;
    }

    let base = cache.start(paren);
    let tail = inline_link_tail(cache.text_from(paren))?;
    let last = cache
        .index_ending_at(base + tail.end)
        .filter(|last| cache.kind(*last) == Some(tokens::RPAREN))?;
    let last_position = position_of(indices, last)?;

    let mut nodes = vec![
        SequentialNode::new(types::INLINE_LINK, open..=last),
        SequentialNode::new(types::LINK_TEXT, open..=close),
    ];
    if let Some(destination) = tail.destination {
        let range = token_span(cache, indices, shift(destination, base))?;
        nodes.push(SequentialNode::new(types::LINK_DESTINATION, range));
    }
    if let Some(title) = tail.title {
        let range = token_span(cache, indices, shift(title, base))?;
        nodes.push(SequentialNode::new(types::LINK_TITLE, range));
    }

    Some(Matched {
        nodes,
        last_position,
    })
}

/// `][label]`, `][]` or nothing after the link text, resolved through the
/// link map.
fn reference_form(
    cache: &TokenCache<'_>,
    indices: &[usize],
    open_position: usize,
    close_position: usize,
    context: &ParseContext<'_>,
) -> Option<Matched> {
    let open = indices[open_position];
    let close = indices[close_position];
    let label_open = indices
        .get(close_position + 1)
        .copied()
        .filter(|next| {
            cache.kind(*next) == Some(tokens::LBRACKET) && cache.start(*next) == cache.end(close)
        });

    if let Some(label_open) = label_open {
        // Collapsed: `[label][]`.
        if let Some(&empty_close) = indices.get(close_position + 2)
            && cache.kind(empty_close) == Some(tokens::RBRACKET)
            && cache.start(empty_close) == cache.end(label_open)
        {
            if !is_valid_label(cache, open, close) {
                return None;
            }
            resolve(cache, open, close, context)?;
            return Some(Matched {
                nodes: vec![
                    SequentialNode::new(types::SHORT_REFERENCE_LINK, open..=empty_close),
                    SequentialNode::new(types::LINK_LABEL, open..=close),
                ],
                last_position: close_position + 2,
            });
        }

        // Full: `[text][label]`. A following label that does not resolve
        // rules out the shortcut form as well.
        if let Ok((_, raw)) = link_label(cache.text_from(label_open)) {
            let label_close = cache
                .index_ending_at(cache.start(label_open) + raw.len())
                .filter(|last| cache.kind(*last) == Some(tokens::RBRACKET))?;
            let last_position = position_of(indices, label_close)?;
            resolve(cache, label_open, label_close, context)?;
            return Some(Matched {
                nodes: vec![
                    SequentialNode::new(types::FULL_REFERENCE_LINK, open..=label_close),
                    SequentialNode::new(types::LINK_TEXT, open..=close),
                    SequentialNode::new(types::LINK_LABEL, label_open..=label_close),
                ],
                last_position,
            });
        }
    }

    // Shortcut: `[label]`, never directly followed by another label even
    // when a later parser claimed that one. Brackets are common in prose, so
    // a miss here is not reported.
    if !is_valid_label(cache, open, close) || followed_by_label(cache, close) {
        return None;
    }
    let label = label_string(cache, open, close);
    context.link_map().get(&label)?;
    Some(Matched {
        nodes: vec![
            SequentialNode::new(types::SHORT_REFERENCE_LINK, open..=close),
            SequentialNode::new(types::LINK_LABEL, open..=close),
        ],
        last_position: close_position,
    })
}

/// Looks the label between `open` and `close` up, reporting a miss.
fn resolve(
    cache: &TokenCache<'_>,
    open: usize,
    close: usize,
    context: &ParseContext<'_>,
) -> Option<()> {
    let label = label_string(cache, open, close);
    if context.link_map().contains(&label) {
        return Some(());
    }
    context.report(
        ErrorInfo::new(
            ErrorSeverity::Warning,
            RecoveryKind::UnresolvableReference,
            format!("no link definition for [{}]", label.trim()),
        )
        .located(cache.text(), cache.start(open)),
    );
    None
}

fn followed_by_label(cache: &TokenCache<'_>, close: usize) -> bool {
    let next = close + 1;
    cache.kind(next) == Some(tokens::LBRACKET)
        && cache.start(next) == cache.end(close)
        && link_label(cache.text_from(next)).is_ok()
}

/// Whether the brackets from `open` to `close` form a valid link label.
fn is_valid_label(cache: &TokenCache<'_>, open: usize, close: usize) -> bool {
    let expected = cache.end(close) - cache.start(open);
    link_label(cache.text_from(open)).is_ok_and(|(_, raw)| raw.len() == expected)
}

/// Text strictly between two bracket tokens, without block-quote markers.
fn label_string(cache: &TokenCache<'_>, open: usize, close: usize) -> String {
    let (from, to) = (cache.end(open), cache.start(close));
    let raw = cache.raw_tokens();
    let first = raw.partition_point(|token| token.start < from);
    raw[first..]
        .iter()
        .take_while(|token| token.end <= to)
        .filter(|token| token.kind != tokens::BLOCK_QUOTE)
        .map(|token| token.text(cache.text()))
        .collect()
}

fn shift(range: Range<usize>, base: usize) -> Range<usize> {
    range.start + base..range.end + base
}

/// Token indices covering exactly `range`; both ends must be in `indices`.
fn token_span(
    cache: &TokenCache<'_>,
    indices: &[usize],
    range: Range<usize>,
) -> Option<RangeInclusive<usize>> {
    let first = cache.index_starting_at(range.start)?;
    let last = cache.index_ending_at(range.end)?;
    position_of(indices, first)?;
    position_of(indices, last)?;
    Some(first..=last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{Lexer, LexerState};
    use crate::parser::link_map::{LinkInfo, LinkMap};

    fn run(mode: LinkMode, text: &str, map: &LinkMap) -> (Vec<(String, String)>, usize) {
        let mut lexer = Lexer::inline(text);
        lexer.reset(0..text.len(), LexerState::Inline);
        let cache = TokenCache::new(text, 0..text.len(), lexer.collect());
        let context = ParseContext::new(map);
        let result = parse(mode, &cache, &[0..=cache.len() - 1], &context);
        let nodes = result
            .nodes
            .iter()
            .map(|node| {
                (
                    node.kind.name().to_string(),
                    cache
                        .span_text(*node.range.start(), *node.range.end())
                        .to_string(),
                )
            })
            .collect();
        (nodes, context.take_diagnostics().len())
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    fn map_with(label: &str) -> LinkMap {
        let mut map = LinkMap::new();
        map.insert(
            label,
            LinkInfo {
                destination: "/u".into(),
                title: None,
            },
        );
        map
    }

    #[test]
    fn inline_link_parts() {
        let (nodes, _) = run(LinkMode::Inline, "a [b](/c \"d\") e", &LinkMap::new());
        assert_eq!(
            nodes,
            pairs(&[
                ("INLINE_LINK", "[b](/c \"d\")"),
                ("LINK_TEXT", "[b]"),
                ("LINK_DESTINATION", "/c"),
                ("LINK_TITLE", "\"d\""),
            ])
        );
    }

    #[test]
    fn links_do_not_nest() {
        let (nodes, _) = run(LinkMode::Inline, "[a [b](c) d](e)", &LinkMap::new());
        assert_eq!(nodes[0], ("INLINE_LINK".to_string(), "[b](c)".to_string()));
        assert_eq!(nodes.iter().filter(|(k, _)| k == "INLINE_LINK").count(), 1);
    }

    #[test]
    fn invalid_destination_is_not_a_link() {
        let (nodes, _) = run(LinkMode::Inline, "[x](not a uri)", &LinkMap::new());
        assert!(nodes.is_empty());
    }

    #[test]
    fn image_wraps_link() {
        let (nodes, _) = run(LinkMode::Image, "![alt](/i.png)", &LinkMap::new());
        assert_eq!(nodes[0], ("IMAGE".to_string(), "![alt](/i.png)".to_string()));
        assert_eq!(nodes[1], ("INLINE_LINK".to_string(), "[alt](/i.png)".to_string()));
    }

    #[test]
    fn reference_forms() {
        let map = map_with("Foo");
        let (full, _) = run(LinkMode::Reference, "[x][foo]", &map);
        assert_eq!(full[0], ("FULL_REFERENCE_LINK".to_string(), "[x][foo]".to_string()));
        let (collapsed, _) = run(LinkMode::Reference, "[foo][]", &map);
        assert_eq!(collapsed[0], ("SHORT_REFERENCE_LINK".to_string(), "[foo][]".to_string()));
        let (shortcut, _) = run(LinkMode::Reference, "[FOO] bar", &map);
        assert_eq!(shortcut[0], ("SHORT_REFERENCE_LINK".to_string(), "[FOO]".to_string()));
    }

    #[test]
    fn shortcut_followed_by_label_stays_literal() {
        let map = map_with("r");
        let (nodes, _) = run(LinkMode::Reference, "[r][l]", &map);
        assert!(nodes.is_empty());

        let (spaced, _) = run(LinkMode::Reference, "[r] [l]", &map);
        assert_eq!(spaced[0], ("SHORT_REFERENCE_LINK".to_string(), "[r]".to_string()));
    }

    #[test]
    fn missing_reference_stays_literal_and_is_reported() {
        let map = map_with("foo");
        let (nodes, diagnostics) = run(LinkMode::Reference, "[x][2]", &map);
        assert!(nodes.is_empty());
        assert_eq!(diagnostics, 1);

        let (shortcut, quiet) = run(LinkMode::Reference, "[ ] task", &map);
        assert!(shortcut.is_empty());
        assert_eq!(quiet, 0);
    }
}
