/// Configuration module for the Markdown engine public API.
///
/// This module provides the combined engine configuration and the
/// [`MarkdownEngine`] that pairs it with a flavour.
use crate::ast::Document;
use crate::codegen::{HtmlGenerator, OutputConfig};
use crate::error::{DefaultErrorHandler, ErrorInfo};
use crate::flavour::Flavour;
use crate::parser::{self, ParserConfig};

/// Main configuration struct for the Markdown engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Parser configuration
    pub parser: ParserConfig,
    /// HTML output configuration
    pub output: OutputConfig,
}

impl EngineConfig {
    /// Creates a builder for configuring the engine.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }
}

/// Builder for EngineConfig to provide a fluent configuration API.
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the parser configuration.
    pub fn parser(mut self, parser_config: ParserConfig) -> Self {
        self.config.parser = parser_config;
        self
    }

    /// Sets the output configuration.
    pub fn output(mut self, output_config: OutputConfig) -> Self {
        self.config.output = output_config;
        self
    }

    /// Sets maximum nesting depth for parsing.
    pub fn max_nesting_depth(mut self, depth: usize) -> Self {
        self.config.parser.max_nesting_depth = depth;
        self
    }

    /// Sets how many diagnostics are collected per document.
    pub fn max_errors(mut self, max_errors: Option<usize>) -> Self {
        self.config.parser.max_errors = max_errors;
        self
    }

    /// Sets the base URI relative link targets are resolved against.
    pub fn base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.config.output.base_uri = Some(base_uri.into());
        self
    }

    /// Sets XHTML-style void elements.
    pub fn xhtml_style(mut self, enabled: bool) -> Self {
        self.config.output.xhtml_style = enabled;
        self
    }

    /// Builds the final configuration.
    pub fn build(self) -> EngineConfig {
        self.config
    }
}

/// Markdown engine bound to one flavour and configuration.
///
/// # Examples
///
/// ```
/// use notemark::{EngineConfig, Flavour, MarkdownEngine};
///
/// let engine = MarkdownEngine::new(Flavour::commonmark());
/// assert_eq!(engine.to_html("# Hello"), "<h1>Hello</h1>\n");
///
/// let engine = MarkdownEngine::with_config(
///     Flavour::gfm(),
///     EngineConfig::builder()
///         .base_uri("https://example.com/docs/")
///         .build(),
/// );
/// assert_eq!(
///     engine.to_html("[a](b.md)"),
///     "<p><a href=\"https://example.com/docs/b.md\">a</a></p>\n"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct MarkdownEngine {
    flavour: Flavour,
    config: EngineConfig,
}

impl Default for MarkdownEngine {
    fn default() -> Self {
        Self::new(Flavour::commonmark())
    }
}

impl MarkdownEngine {
    /// Creates an engine with default configuration.
    pub fn new(flavour: Flavour) -> Self {
        Self::with_config(flavour, EngineConfig::default())
    }

    pub fn with_config(flavour: Flavour, config: EngineConfig) -> Self {
        Self { flavour, config }
    }

    pub fn flavour(&self) -> &Flavour {
        &self.flavour
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parses `text` into a document tree.
    pub fn parse<'a>(&self, text: &'a str) -> Document<'a> {
        parser::parse_with_config(text, &self.flavour, &self.config.parser)
    }

    /// Parses `text` and returns the diagnostics recovered along the way.
    pub fn parse_with_diagnostics<'a>(&self, text: &'a str) -> (Document<'a>, Vec<ErrorInfo>) {
        let mut handler = match self.config.parser.max_errors {
            Some(max) => DefaultErrorHandler::with_max_errors(max),
            None => DefaultErrorHandler::new(),
        };
        let document =
            parser::parse_with_error_handler(text, &self.flavour, &self.config.parser, &mut handler);
        (document, handler.errors)
    }

    /// Renders a parsed document as HTML.
    pub fn render(&self, document: &Document<'_>) -> String {
        HtmlGenerator::new(&self.flavour, self.config.output.clone()).render(document)
    }

    /// Parses and renders in one step.
    pub fn to_html(&self, text: &str) -> String {
        self.render(&self.parse(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecoveryKind;

    #[test]
    fn builder_sets_both_halves() {
        let config = EngineConfig::builder()
            .max_nesting_depth(8)
            .base_uri("https://example.com/")
            .xhtml_style(false)
            .build();
        assert_eq!(config.parser.max_nesting_depth, 8);
        assert_eq!(config.output.base_uri.as_deref(), Some("https://example.com/"));
        assert!(!config.output.xhtml_style);
    }

    #[test]
    fn engine_round_trip() {
        let engine = MarkdownEngine::default();
        assert_eq!(engine.to_html("*hi*"), "<p><em>hi</em></p>\n");
        assert_eq!(engine.flavour().name(), "commonmark");
    }

    #[test]
    fn html_style_void_elements() {
        let engine = MarkdownEngine::with_config(
            Flavour::commonmark(),
            EngineConfig::builder().xhtml_style(false).build(),
        );
        assert_eq!(engine.to_html("***"), "<hr>\n");
    }

    #[test]
    fn diagnostics_are_collected_up_to_the_limit() {
        let engine = MarkdownEngine::with_config(
            Flavour::commonmark(),
            EngineConfig::builder().max_errors(Some(1)).build(),
        );
        let (_, errors) = engine.parse_with_diagnostics("[a][x] [b][y]");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, RecoveryKind::UnresolvableReference);
    }

    #[test]
    fn nesting_cap_is_reported() {
        let engine = MarkdownEngine::with_config(
            Flavour::commonmark(),
            EngineConfig::builder().max_nesting_depth(3).build(),
        );
        let (document, errors) = engine.parse_with_diagnostics("> > > > > deep");
        assert!(errors.iter().any(|e| e.kind == RecoveryKind::DepthExceeded));
        assert!(document.check_ranges().is_ok());
    }
}
