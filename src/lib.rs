//! A multi-phase markdown engine with pluggable flavours.
//!
//! Text goes through a block lexer, a block-structure state machine and a
//! tree builder, then every paragraph and heading is re-lexed and handed to
//! a sequence of inline parsers. The result is an offset-based tree whose
//! ranges tile the source text, which an HTML generator renders with the
//! providers the flavour registers per element type.
//!
//! Both boundary calls are total: every input string parses, and every
//! tree renders.

// Core modules
pub mod ast;
pub mod codegen;
pub mod element;
pub mod entities;
pub mod error;
pub mod flavour;
pub mod lexer;
pub mod parser;

// Configuration module for public API
pub mod config;

// Re-export key types for public API
pub use ast::{AstNode, Document, Visitor};
pub use codegen::providers::{CustomProvider, GeneratingProvider, Trim};
pub use codegen::{HtmlGenerator, HtmlValidator, HtmlWriter, OutputConfig, OutputConfigBuilder};
pub use config::{EngineConfig, EngineConfigBuilder, MarkdownEngine};
pub use element::{ElementType, tokens, types};
pub use error::{
    DefaultErrorHandler, ErrorHandler, ErrorInfo, ErrorSeverity, MarkdownError, RecoveryKind,
    Result,
};
pub use flavour::{Flavour, FlavourBuilder};
pub use lexer::{Lexer, LexerState, Position, Token};
pub use parser::ParserConfig;
pub use parser::block_starts::BlockStart;
pub use parser::sequential::SequentialParserKind;

/// Parses markdown text into a document tree.
///
/// Parsing never fails. Malformed constructs degrade to plain text, and
/// recovered conditions such as unresolved references are only logged; use
/// [`parser::parse_with_error_handler`] to receive them.
///
/// # Examples
///
/// ```
/// use notemark::{Flavour, parse, types};
///
/// let document = parse("- a\n- b", &Flavour::commonmark());
/// let list = &document.root().children()[0];
/// assert_eq!(list.kind(), types::UNORDERED_LIST);
/// assert_eq!(list.loose(), Some(false));
/// ```
pub fn parse<'a>(text: &'a str, flavour: &Flavour) -> Document<'a> {
    parser::parse(text, flavour)
}

/// Renders a document tree as HTML.
///
/// Relative link and image targets are resolved against `base_uri` when it
/// is given and well formed; anything that fails to resolve is emitted as
/// written.
///
/// # Examples
///
/// ```
/// use notemark::{Flavour, parse, render};
///
/// let flavour = Flavour::commonmark();
/// let document = parse("[x][1]\n\n[1]: /u \"t\"", &flavour);
/// assert_eq!(
///     render(&document, &flavour, None),
///     "<p><a href=\"/u\" title=\"t\">x</a></p>\n"
/// );
/// ```
pub fn render(document: &Document<'_>, flavour: &Flavour, base_uri: Option<&str>) -> String {
    let config = OutputConfig {
        base_uri: base_uri.map(str::to_string),
        ..OutputConfig::default()
    };
    HtmlGenerator::new(flavour, config).render(document)
}
