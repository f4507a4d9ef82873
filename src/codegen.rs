//! HTML generation.
//!
//! [`HtmlGenerator`] walks a parsed [`Document`] with an explicit work stack
//! and hands every node to the generating provider its flavour registers for
//! the node's type. Types without a provider render their children with no
//! wrapping tag. Rendering never fails.
use std::borrow::Cow;

use tracing::{debug, warn};
use url::Url;

use crate::ast::{AstNode, Document};
use crate::flavour::Flavour;
use crate::parser::link_map::LinkMap;

pub mod providers;

/// Configuration options for HTML output.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutputConfig {
    /// Base relative link and image targets are resolved against.
    pub base_uri: Option<String>,
    /// Whether void elements are written `<br />` rather than `<br>`.
    pub xhtml_style: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_uri: None,
            xhtml_style: true,
        }
    }
}

impl OutputConfig {
    pub fn builder() -> OutputConfigBuilder {
        OutputConfigBuilder::new()
    }
}

/// Builder pattern for OutputConfig.
#[derive(Debug, Default)]
pub struct OutputConfigBuilder {
    config: OutputConfig,
}

impl OutputConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URI for relative targets
    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.config.base_uri = Some(base_uri.into());
        self
    }

    /// Enable or disable XHTML-style void elements
    pub fn with_xhtml_style(mut self, enabled: bool) -> Self {
        self.config.xhtml_style = enabled;
        self
    }

    pub fn build(self) -> OutputConfig {
        self.config
    }
}

/// Low-level HTML writing with escaping and whitespace handling.
///
/// Whitespace is held back until something visible follows it on the same
/// line, so spaces before a line ending or at a line start never reach the
/// output.
#[derive(Debug, Clone, Default)]
pub struct HtmlWriter {
    buffer: String,
    pending_space: String,
    xhtml_style: bool,
}

impl HtmlWriter {
    pub fn new(xhtml_style: bool) -> Self {
        Self {
            buffer: String::new(),
            pending_space: String::new(),
            xhtml_style,
        }
    }

    /// Writes markup without escaping.
    pub fn raw(&mut self, html: &str) {
        self.flush_space();
        self.buffer.push_str(html);
    }

    /// Writes escaped text content.
    pub fn text(&mut self, text: &str) {
        self.flush_space();
        escape_into(&mut self.buffer, text);
    }

    /// Queues inline whitespace.
    pub fn space(&mut self, space: &str) {
        if !self.at_line_start() {
            self.pending_space.push_str(space);
        }
    }

    pub fn discard_space(&mut self) {
        self.pending_space.clear();
    }

    /// Ends the current line.
    pub fn newline(&mut self) {
        self.discard_space();
        self.buffer.push('\n');
    }

    /// Ends the current line unless already at the start of one.
    pub fn cr(&mut self) {
        self.discard_space();
        if !self.at_line_start() {
            self.buffer.push('\n');
        }
    }

    /// Writes a void element such as `<hr />`.
    pub fn void_tag(&mut self, name: &str) {
        self.raw("<");
        self.raw(name);
        self.close_void();
    }

    /// Closes a void element opened with [`HtmlWriter::raw`].
    pub fn close_void(&mut self) {
        let end = if self.xhtml_style { " />" } else { ">" };
        self.raw(end);
    }

    pub fn at_line_start(&self) -> bool {
        self.buffer.is_empty() || self.buffer.ends_with('\n')
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn finish(self) -> String {
        self.buffer
    }

    /// Escapes `&`, `<`, `>` and `"`.
    pub fn escape(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        escape_into(&mut out, text);
        out
    }

    /// Escapes a link target for an attribute value. Bytes outside the URL
    /// safe set are percent-encoded; existing `%` escapes are kept.
    pub fn escape_href(target: &str) -> String {
        let mut out = String::with_capacity(target.len());
        for byte in target.bytes() {
            match byte {
                b'&' => out.push_str("&amp;"),
                byte if byte.is_ascii_alphanumeric() || HREF_SAFE.contains(&byte) => {
                    out.push(char::from(byte))
                }
                byte => out.push_str(&format!("%{:02X}", byte)),
            }
        }
        out
    }

    fn flush_space(&mut self) {
        if !self.pending_space.is_empty() {
            self.buffer.push_str(&self.pending_space);
            self.pending_space.clear();
        }
    }
}

const HREF_SAFE: &[u8] = b"!#$%'()*+,-./:;=?@_~";

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

/// What a node is rendered inside of.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RenderContext {
    /// Directly inside an item of a tight list.
    pub tight: bool,
    /// Inside an inline host.
    pub inline: bool,
    /// Text only, for image descriptions.
    pub plain: bool,
}

enum Work<'a> {
    Enter(&'a AstNode, RenderContext),
    Exit(&'a AstNode),
}

/// State of one rendering pass, handed to the providers.
pub(crate) struct Renderer<'g, 'a> {
    pub(crate) text: &'a str,
    document: &'a Document<'a>,
    pub(crate) writer: HtmlWriter,
    pub(crate) link_map: &'g LinkMap,
    base: Option<&'g Url>,
    work: Vec<Work<'a>>,
}

impl<'g, 'a> Renderer<'g, 'a> {
    pub(crate) fn push_enter(&mut self, node: &'a AstNode, context: RenderContext) {
        self.work.push(Work::Enter(node, context));
    }

    pub(crate) fn push_exit(&mut self, node: &'a AstNode) {
        self.work.push(Work::Exit(node));
    }

    /// Queues the children of `node`, minus `trim` from each end.
    pub(crate) fn push_children(&mut self, node: &'a AstNode, context: RenderContext, trim: usize) {
        let children = node.children();
        let start = trim.min(children.len());
        let end = children.len().saturating_sub(trim).max(start);
        for child in children[start..end].iter().rev() {
            self.work.push(Work::Enter(child, context));
        }
    }

    /// Source of a code content leaf. A leading tab that block structure
    /// consumed only partly contributes just its remaining columns.
    pub(crate) fn code_text(&self, leaf: &AstNode) -> Cow<'a, str> {
        let text = leaf.text(self.text);
        match self.document.tab_remainder(leaf.range().start) {
            Some(columns) if text.starts_with('\t') => {
                Cow::Owned(format!("{}{}", " ".repeat(columns), &text[1..]))
            }
            _ => Cow::Borrowed(text),
        }
    }

    /// Resolves a link target against the base URI. Absolute targets,
    /// fragments and anything that fails to resolve stay as written.
    pub(crate) fn resolve(&self, target: &str) -> String {
        let Some(base) = self.base else {
            return target.to_string();
        };
        if target.is_empty() || target.starts_with('#') || Url::parse(target).is_ok() {
            return target.to_string();
        }
        match base.join(target) {
            Ok(resolved) => resolved.to_string(),
            Err(error) => {
                warn!(link = target, %error, "link target kept unresolved");
                target.to_string()
            }
        }
    }
}

/// Renders documents with one flavour's providers.
#[derive(Debug, Clone)]
pub struct HtmlGenerator<'f> {
    flavour: &'f Flavour,
    config: OutputConfig,
    base: Option<Url>,
}

impl<'f> HtmlGenerator<'f> {
    pub fn new(flavour: &'f Flavour, config: OutputConfig) -> Self {
        let base = config.base_uri.as_deref().and_then(|base| match Url::parse(base) {
            Ok(url) => Some(url),
            Err(error) => {
                warn!(base, %error, "malformed base URI ignored");
                None
            }
        });
        Self {
            flavour,
            config,
            base,
        }
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    pub fn render(&self, document: &Document<'_>) -> String {
        let link_map = LinkMap::from_tree(document.text(), document.root());
        let mut renderer = Renderer {
            text: document.text(),
            document,
            writer: HtmlWriter::new(self.config.xhtml_style),
            link_map: &link_map,
            base: self.base.as_ref(),
            work: vec![Work::Enter(document.root(), RenderContext::default())],
        };
        let mut nodes = 0usize;

        while let Some(work) = renderer.work.pop() {
            match work {
                Work::Enter(node, context) => {
                    nodes += 1;
                    match self.flavour.provider(node.kind()) {
                        Some(provider) => provider.enter(node, context, &mut renderer),
                        None if node.is_leaf() => {
                            if context.inline {
                                renderer.writer.text(node.text(renderer.text));
                            }
                        }
                        None => renderer.push_children(node, context, 0),
                    }
                }
                Work::Exit(node) => {
                    if let Some(provider) = self.flavour.provider(node.kind()) {
                        provider.exit(node, &mut renderer);
                    }
                }
            }
        }

        let html = renderer.writer.finish();
        debug!(
            flavour = self.flavour.name(),
            nodes,
            bytes = html.len(),
            "document rendered"
        );
        html
    }
}

/// Checks HTML output for balanced tags.
pub struct HtmlValidator;

impl HtmlValidator {
    const VOID: [&'static str; 6] = ["br", "hr", "img", "input", "meta", "link"];

    /// Every opened tag is closed, in order. Comments and declarations are
    /// skipped.
    pub fn validate_well_formed(html: &str) -> Result<(), String> {
        let mut stack: Vec<&str> = Vec::new();
        let mut rest = html;

        while let Some(open) = rest.find('<') {
            rest = &rest[open + 1..];
            let Some(close) = rest.find('>') else {
                return Err("unterminated tag".to_string());
            };
            let tag = &rest[..close];
            rest = &rest[close + 1..];

            if tag.starts_with('!') || tag.starts_with('?') || tag.ends_with('/') {
                continue;
            }
            if let Some(name) = tag.strip_prefix('/') {
                let name = name.trim();
                match stack.pop() {
                    Some(expected) if expected == name => {}
                    Some(expected) => {
                        return Err(format!("expected </{}>, found </{}>", expected, name));
                    }
                    None => return Err(format!("unexpected </{}>", name)),
                }
                continue;
            }
            let name = tag.split_whitespace().next().unwrap_or("");
            if !Self::VOID.contains(&name) {
                stack.push(name);
            }
        }

        if stack.is_empty() {
            Ok(())
        } else {
            Err(format!("unclosed tags: {:?}", stack))
        }
    }
}
