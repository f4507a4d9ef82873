//! Markdown parsing.
//!
//! Parsing runs in strictly sequential phases over one document:
//!
//! 1. the block lexer tokenizes the whole text,
//! 2. the marker processor recognizes the block structure line by line,
//! 3. the builder nests tokens under the block productions,
//! 4. link reference definitions are collected into a [`LinkMap`],
//! 5. every inline host is re-lexed and run through the flavour's
//!    sequential parsers.
//!
//! Each phase completes before the next one starts. Parsing is total: every
//! input yields a [`Document`] whose ranges tile the text.
pub mod block_starts;
mod builder;
mod char_class;
mod config;
mod inline;
pub mod link_map;
pub(crate) mod link_syntax;
mod markers;
pub mod sequential;
pub mod token_cache;

#[cfg(test)]
mod tests;

pub use config::ParserConfig;
pub use link_map::{LinkInfo, LinkMap};

use tracing::debug;

use crate::ast::Document;
use crate::element::types;
use crate::error::{ErrorHandler, IgnoreErrors};
use crate::flavour::Flavour;
use crate::lexer::Lexer;

use markers::MarkerProcessor;

/// Parses `text` with the default parser configuration.
pub fn parse<'a>(text: &'a str, flavour: &Flavour) -> Document<'a> {
    parse_with_config(text, flavour, &ParserConfig::default())
}

/// Parses `text` with a custom configuration. Diagnostics are only logged.
pub fn parse_with_config<'a>(
    text: &'a str,
    flavour: &Flavour,
    config: &ParserConfig,
) -> Document<'a> {
    parse_with_error_handler(text, flavour, config, &mut IgnoreErrors)
}

/// Parses `text`, delivering every recovered condition to `handler`.
pub fn parse_with_error_handler<'a>(
    text: &'a str,
    flavour: &Flavour,
    config: &ParserConfig,
    handler: &mut dyn ErrorHandler,
) -> Document<'a> {
    let tokens: Vec<_> = Lexer::block(text).collect();
    debug!(flavour = flavour.name(), bytes = text.len(), tokens = tokens.len(), "block lexing finished");

    let tree = MarkerProcessor::new(text, flavour.block_starts(), config.max_nesting_depth, handler)
        .process(&tokens);
    let productions = builder::block_productions(&tree);
    let tab_remainders = tree.tab_remainders;
    let tokens = builder::overlay(&tokens, tree.leaves);
    let mut root = builder::build(types::MARKDOWN_FILE, 0..text.len(), productions, tokens);

    let link_map = LinkMap::from_tree(text, &root);
    debug!(definitions = link_map.len(), "link map collected");

    inline::attach_inline(text, &mut root, flavour, &link_map, handler);
    Document::new(text, root).with_tab_remainders(tab_remainders)
}
