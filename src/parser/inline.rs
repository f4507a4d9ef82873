//! Inline pass.
//!
//! Every inline host of the block tree is re-lexed at inline granularity and
//! run through the flavour's sequential parsers. The nodes they find replace
//! the host's block-level tokens.
use tracing::{debug, trace};

use crate::ast::AstNode;
use crate::element::tokens;
use crate::error::ErrorHandler;
use crate::flavour::Flavour;
use crate::lexer::{LexerState, Token};

use super::builder;
use super::link_map::LinkMap;
use super::sequential::{ParseContext, SequentialParserManager};
use super::token_cache::TokenCache;

pub(crate) mod autolink;
pub(crate) mod code_span;
pub(crate) mod emphasis;
pub(crate) mod html;
pub(crate) mod line_break;
pub(crate) mod link;
pub(crate) mod strikethrough;

/// Parses the inline content of every host below `root`. Returns the number
/// of hosts processed.
pub(crate) fn attach_inline(
    text: &str,
    root: &mut AstNode,
    flavour: &Flavour,
    link_map: &LinkMap,
    handler: &mut dyn ErrorHandler,
) -> usize {
    let manager = SequentialParserManager::new(flavour.sequential_parsers());
    let mut hosts = 0;
    let mut stack: Vec<&mut AstNode> = vec![root];

    while let Some(node) = stack.pop() {
        if flavour.is_inline_host(node.kind()) {
            *node = parse_host(text, node, flavour, &manager, link_map, handler);
            hosts += 1;
        } else if let Some(children) = node.children_mut() {
            stack.extend(children.iter_mut());
        }
    }

    debug!(hosts, "inline pass finished");
    hosts
}

fn parse_host(
    text: &str,
    host: &AstNode,
    flavour: &Flavour,
    manager: &SequentialParserManager<'_>,
    link_map: &LinkMap,
    handler: &mut dyn ErrorHandler,
) -> AstNode {
    let range = host.range();
    let cache = TokenCache::new(text, range.clone(), host_tokens(text, host, flavour));
    let context = ParseContext::new(link_map);
    let productions = manager.run(&cache, &context);

    trace!(
        host = %host.kind(),
        start = range.start,
        end = range.end,
        tokens = cache.raw_tokens().len(),
        nodes = productions.len(),
        "inline host parsed"
    );
    for info in context.take_diagnostics() {
        debug!(kind = ?info.kind, message = %info.message, "inline recovery");
        if handler.accepts_more() {
            handler.handle_error(&info);
        }
    }

    builder::build(host.kind(), range, productions, cache.into_raw_tokens())
}

/// Inline tokens of a host: block-quote markers are kept as they are and
/// every run between them is lexed again in inline mode.
fn host_tokens(text: &str, host: &AstNode, flavour: &Flavour) -> Vec<Token> {
    let mut lexer = flavour.inline_lexer(text);
    let mut out = Vec::new();
    let mut run_start = host.start();

    let mut flush = |out: &mut Vec<Token>, start: usize, end: usize| {
        if start < end {
            lexer.reset(start..end, LexerState::Inline);
            out.extend(&mut lexer);
        }
    };

    for child in host.children() {
        if child.kind() == tokens::BLOCK_QUOTE {
            flush(&mut out, run_start, child.start());
            out.push(Token::new(tokens::BLOCK_QUOTE, child.start(), child.end()));
            run_start = child.end();
        }
    }
    flush(&mut out, run_start, host.end());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::types;
    use crate::flavour::Flavour;

    #[test]
    fn quote_markers_survive_relexing() {
        let text = "> a *b*\n> c";
        let host = AstNode::composite(
            types::PARAGRAPH,
            2..11,
            vec![
                AstNode::leaf(tokens::TEXT, 2..3),
                AstNode::leaf(tokens::WHITE_SPACE, 3..4),
                AstNode::leaf(tokens::TEXT, 4..7),
                AstNode::leaf(tokens::EOL, 7..8),
                AstNode::leaf(tokens::BLOCK_QUOTE, 8..9),
                AstNode::leaf(tokens::WHITE_SPACE, 9..10),
                AstNode::leaf(tokens::TEXT, 10..11),
            ],
        );
        let tokens = host_tokens(text, &host, &Flavour::commonmark());
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind.name()).collect();
        assert_eq!(
            kinds,
            vec![
                "TEXT",
                "WHITE_SPACE",
                "EMPH",
                "TEXT",
                "EMPH",
                "EOL",
                "BLOCK_QUOTE",
                "WHITE_SPACE",
                "TEXT"
            ]
        );
    }
}
