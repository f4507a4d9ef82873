//! Generating providers: one rendering rule per element type.
//!
//! A flavour maps element types to [`GeneratingProvider`]s. The set of
//! rules is closed; flavours add behaviour of their own through
//! [`GeneratingProvider::Custom`].
use crate::ast::AstNode;
use crate::element::{ElementType, tokens, types};
use crate::entities::decode_entity;
use crate::parser::link_map::content_text;
use crate::parser::link_syntax::{destination_text, label_text, title_text};

use super::{HtmlWriter, RenderContext, Renderer};

/// How many delimiter children an inline wrapper drops from each end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trim {
    None,
    Count(usize),
    /// As many as the node starts with of the given token type.
    Run(ElementType),
}

impl Trim {
    fn count(&self, node: &AstNode) -> usize {
        match self {
            Trim::None => 0,
            Trim::Count(count) => *count,
            Trim::Run(kind) => node
                .children()
                .iter()
                .take_while(|child| child.kind() == *kind)
                .count(),
        }
    }
}

/// Hooks of a flavour-defined provider. `open` runs before the node's
/// children are rendered and `close` after.
#[derive(Debug, Clone, Copy)]
pub struct CustomProvider {
    pub open: fn(&AstNode, &str, &mut HtmlWriter),
    pub close: fn(&AstNode, &str, &mut HtmlWriter),
}

#[derive(Debug, Clone, Copy)]
pub enum GeneratingProvider {
    /// Renders children with no wrapping tag.
    Transparent { trim: Trim },
    /// Block container such as `<blockquote>`.
    Block { tag: &'static str },
    /// `<p>`, left out inside tight lists.
    Paragraph,
    /// `<ul>` or `<ol>`, with `start` when the first number is not 1.
    List,
    ListItem,
    /// `<hN>` around the heading's content child.
    Heading { level: usize },
    CodeFence,
    CodeBlock,
    HtmlBlock,
    ThematicBreak,
    /// Inline wrapper such as `<em>`.
    Inline { tag: &'static str, trim: Trim },
    CodeSpan,
    InlineHtml,
    Autolink,
    Link,
    Image,
    HardLineBreak,
    Text,
    Space,
    LineEnding,
    Entity,
    Escaped,
    /// Renders nothing.
    Skip,
    Custom(CustomProvider),
}

impl GeneratingProvider {
    pub fn name(&self) -> &'static str {
        match self {
            GeneratingProvider::Transparent { .. } => "transparent",
            GeneratingProvider::Block { .. } => "block",
            GeneratingProvider::Paragraph => "paragraph",
            GeneratingProvider::List => "list",
            GeneratingProvider::ListItem => "list-item",
            GeneratingProvider::Heading { .. } => "heading",
            GeneratingProvider::CodeFence => "code-fence",
            GeneratingProvider::CodeBlock => "code-block",
            GeneratingProvider::HtmlBlock => "html-block",
            GeneratingProvider::ThematicBreak => "thematic-break",
            GeneratingProvider::Inline { .. } => "inline",
            GeneratingProvider::CodeSpan => "code-span",
            GeneratingProvider::InlineHtml => "inline-html",
            GeneratingProvider::Autolink => "autolink",
            GeneratingProvider::Link => "link",
            GeneratingProvider::Image => "image",
            GeneratingProvider::HardLineBreak => "hard-line-break",
            GeneratingProvider::Text => "text",
            GeneratingProvider::Space => "space",
            GeneratingProvider::LineEnding => "line-ending",
            GeneratingProvider::Entity => "entity",
            GeneratingProvider::Escaped => "escaped",
            GeneratingProvider::Skip => "skip",
            GeneratingProvider::Custom(_) => "custom",
        }
    }

    /// Whether the provider needs a node with children.
    pub fn is_composite_only(&self) -> bool {
        !matches!(
            self,
            GeneratingProvider::ThematicBreak
                | GeneratingProvider::Text
                | GeneratingProvider::Space
                | GeneratingProvider::LineEnding
                | GeneratingProvider::Entity
                | GeneratingProvider::Escaped
                | GeneratingProvider::Skip
                | GeneratingProvider::Custom(_)
        )
    }

    pub(crate) fn enter<'a>(
        &self,
        node: &'a AstNode,
        context: RenderContext,
        renderer: &mut Renderer<'_, 'a>,
    ) {
        let block = RenderContext {
            inline: false,
            tight: false,
            plain: false,
        };
        let inline = RenderContext {
            inline: true,
            ..context
        };

        match self {
            GeneratingProvider::Transparent { trim } => {
                renderer.push_children(node, context, trim.count(node));
            }
            GeneratingProvider::Block { tag } => {
                renderer.writer.cr();
                renderer.writer.raw(&format!("<{}>", tag));
                renderer.writer.newline();
                renderer.push_exit(node);
                renderer.push_children(node, block, 0);
            }
            GeneratingProvider::Paragraph => {
                if context.tight {
                    renderer.push_children(node, inline, 0);
                } else {
                    renderer.writer.cr();
                    renderer.writer.raw("<p>");
                    renderer.push_exit(node);
                    renderer.push_children(node, RenderContext { tight: false, ..inline }, 0);
                }
            }
            GeneratingProvider::List => {
                renderer.writer.cr();
                if node.kind() == types::ORDERED_LIST {
                    match list_start(renderer.text, node) {
                        Some(start) if start != 1 => {
                            renderer.writer.raw(&format!("<ol start=\"{}\">", start));
                        }
                        _ => renderer.writer.raw("<ol>"),
                    }
                } else {
                    renderer.writer.raw("<ul>");
                }
                renderer.writer.newline();
                renderer.push_exit(node);
                let tight = !node.loose().unwrap_or(false);
                renderer.push_children(node, RenderContext { tight, ..block }, 0);
            }
            GeneratingProvider::ListItem => {
                renderer.writer.cr();
                renderer.writer.raw("<li>");
                renderer.push_exit(node);
                renderer.push_children(node, RenderContext { tight: context.tight, ..block }, 0);
            }
            GeneratingProvider::Heading { level } => {
                renderer.writer.cr();
                renderer.writer.raw(&format!("<h{}>", level));
                renderer.push_exit(node);
                for child in node.children().iter().rev().filter(|child| !child.is_leaf()) {
                    renderer.push_enter(child, RenderContext { inline: true, ..block });
                }
            }
            GeneratingProvider::CodeFence => {
                let language = node
                    .find_child(tokens::FENCE_LANG)
                    .and_then(|lang| lang.text(renderer.text).split_whitespace().next())
                    .map(crate::entities::unescape);
                renderer.writer.cr();
                match language {
                    Some(language) => renderer.writer.raw(&format!(
                        "<pre><code class=\"language-{}\">",
                        HtmlWriter::escape(&language)
                    )),
                    None => renderer.writer.raw("<pre><code>"),
                }
                let body = fence_body(renderer, node);
                renderer.writer.text(&body);
                renderer.writer.raw("</code></pre>");
                renderer.writer.newline();
            }
            GeneratingProvider::CodeBlock => {
                let mut body = String::new();
                for leaf in node.children() {
                    let kind = leaf.kind();
                    if kind == tokens::CODE_LINE {
                        body.push_str(&renderer.code_text(leaf));
                    } else if kind == tokens::EOL {
                        body.push('\n');
                    }
                }
                body.push('\n');
                renderer.writer.cr();
                renderer.writer.raw("<pre><code>");
                renderer.writer.text(&body);
                renderer.writer.raw("</code></pre>");
                renderer.writer.newline();
            }
            GeneratingProvider::HtmlBlock => {
                renderer.writer.cr();
                for leaf in node.children() {
                    let kind = leaf.kind();
                    if kind == tokens::HTML_BLOCK_CONTENT {
                        renderer.writer.raw(leaf.text(renderer.text));
                    } else if kind == tokens::EOL {
                        renderer.writer.newline();
                    }
                }
                renderer.writer.cr();
            }
            GeneratingProvider::ThematicBreak => {
                if context.inline {
                    renderer.writer.text(node.text(renderer.text));
                } else {
                    renderer.writer.cr();
                    renderer.writer.void_tag("hr");
                    renderer.writer.newline();
                }
            }
            GeneratingProvider::Inline { tag, trim } => {
                if !context.plain {
                    renderer.writer.raw(&format!("<{}>", tag));
                    renderer.push_exit(node);
                }
                renderer.push_children(node, context, trim.count(node));
            }
            GeneratingProvider::CodeSpan => {
                let body = code_span_body(renderer.text, node);
                if context.plain {
                    renderer.writer.text(&body);
                } else {
                    renderer.writer.raw("<code>");
                    renderer.writer.text(&body);
                    renderer.writer.raw("</code>");
                }
            }
            GeneratingProvider::InlineHtml => {
                let html = content_text(renderer.text, node);
                if context.plain {
                    renderer.writer.text(&html);
                } else {
                    renderer.writer.raw(&html);
                }
            }
            GeneratingProvider::Autolink => {
                let raw = content_text(renderer.text, node);
                let target = raw
                    .strip_prefix('<')
                    .and_then(|rest| rest.strip_suffix('>'))
                    .unwrap_or(&raw);
                if context.plain {
                    renderer.writer.text(target);
                    return;
                }
                let href = if target.contains(':') {
                    target.to_string()
                } else {
                    format!("mailto:{}", target)
                };
                renderer.writer.raw(&format!("<a href=\"{}\">", HtmlWriter::escape_href(&href)));
                renderer.writer.text(target);
                renderer.writer.raw("</a>");
            }
            GeneratingProvider::Link => {
                let Some((target, content)) = link_parts(renderer, node) else {
                    renderer.writer.text(&content_text(renderer.text, node));
                    return;
                };
                if !context.plain {
                    let href = renderer.resolve(&target.destination);
                    let mut open = format!("<a href=\"{}\"", HtmlWriter::escape_href(&href));
                    if let Some(title) = &target.title {
                        open.push_str(&format!(" title=\"{}\"", HtmlWriter::escape(title)));
                    }
                    open.push('>');
                    renderer.writer.raw(&open);
                    renderer.push_exit(node);
                }
                renderer.push_enter(content, context);
            }
            GeneratingProvider::Image => {
                let Some(link) = node.children().iter().find(|child| !child.is_leaf()) else {
                    renderer.writer.text(node.text(renderer.text));
                    return;
                };
                let Some((target, content)) = link_parts(renderer, link) else {
                    renderer.writer.text(&content_text(renderer.text, node));
                    return;
                };
                if !context.plain {
                    let src = renderer.resolve(&target.destination);
                    renderer
                        .writer
                        .raw(&format!("<img src=\"{}\" alt=\"", HtmlWriter::escape_href(&src)));
                    renderer.push_exit(node);
                }
                renderer.push_enter(content, RenderContext { plain: true, ..context });
            }
            GeneratingProvider::HardLineBreak => {
                if context.plain {
                    renderer.writer.newline();
                } else {
                    renderer.writer.discard_space();
                    renderer.writer.void_tag("br");
                    renderer.writer.newline();
                }
            }
            GeneratingProvider::Text => {
                if context.inline {
                    renderer.writer.text(node.text(renderer.text));
                }
            }
            GeneratingProvider::Space => {
                if context.inline {
                    renderer.writer.space(node.text(renderer.text));
                }
            }
            GeneratingProvider::LineEnding => {
                if context.inline {
                    renderer.writer.newline();
                }
            }
            GeneratingProvider::Entity => {
                if !context.inline {
                    return;
                }
                let raw = node.text(renderer.text);
                let decoded = decode_entity(raw);
                renderer.writer.text(decoded.as_deref().unwrap_or(raw));
            }
            GeneratingProvider::Escaped => {
                if context.inline {
                    let raw = node.text(renderer.text);
                    renderer.writer.text(raw.get(1..).unwrap_or(raw));
                }
            }
            GeneratingProvider::Skip => {}
            GeneratingProvider::Custom(custom) => {
                (custom.open)(node, renderer.text, &mut renderer.writer);
                renderer.push_exit(node);
                renderer.push_children(node, context, 0);
            }
        }
    }

    pub(crate) fn exit(&self, node: &AstNode, renderer: &mut Renderer<'_, '_>) {
        match self {
            GeneratingProvider::Block { tag } => {
                renderer.writer.cr();
                renderer.writer.raw(&format!("</{}>", tag));
                renderer.writer.newline();
            }
            GeneratingProvider::Paragraph => {
                renderer.writer.raw("</p>");
                renderer.writer.newline();
            }
            GeneratingProvider::List => {
                renderer.writer.cr();
                let tag = if node.kind() == types::ORDERED_LIST {
                    "</ol>"
                } else {
                    "</ul>"
                };
                renderer.writer.raw(tag);
                renderer.writer.newline();
            }
            GeneratingProvider::ListItem => {
                renderer.writer.raw("</li>");
                renderer.writer.newline();
            }
            GeneratingProvider::Heading { level } => {
                renderer.writer.raw(&format!("</h{}>", level));
                renderer.writer.newline();
            }
            GeneratingProvider::Inline { tag, .. } => {
                renderer.writer.raw(&format!("</{}>", tag));
            }
            GeneratingProvider::Link => renderer.writer.raw("</a>"),
            GeneratingProvider::Image => {
                let title = node
                    .children()
                    .iter()
                    .find(|child| !child.is_leaf())
                    .and_then(|link| link_parts(renderer, link))
                    .and_then(|(target, _)| target.title);
                renderer.writer.raw("\"");
                if let Some(title) = title {
                    renderer
                        .writer
                        .raw(&format!(" title=\"{}\"", HtmlWriter::escape(&title)));
                }
                renderer.writer.close_void();
            }
            GeneratingProvider::Custom(custom) => {
                (custom.close)(node, renderer.text, &mut renderer.writer);
            }
            _ => {}
        }
    }
}

/// Resolved target of a link node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LinkTarget {
    pub destination: String,
    pub title: Option<String>,
}

/// Target and text child of an INLINE_LINK, FULL_REFERENCE_LINK or
/// SHORT_REFERENCE_LINK. `None` when a reference no longer resolves.
fn link_parts<'a>(renderer: &Renderer<'_, '_>, link: &'a AstNode) -> Option<(LinkTarget, &'a AstNode)> {
    let text = renderer.text;
    let kind = link.kind();

    if kind == types::INLINE_LINK {
        let content = link.find_child(types::LINK_TEXT)?;
        let destination = link
            .find_child(types::LINK_DESTINATION)
            .map(|node| destination_text(&content_text(text, node)))
            .unwrap_or_default();
        let title = link
            .find_child(types::LINK_TITLE)
            .map(|node| title_text(&content_text(text, node)));
        return Some((LinkTarget { destination, title }, content));
    }

    let label = link.find_child(types::LINK_LABEL)?;
    let content = if kind == types::FULL_REFERENCE_LINK {
        link.find_child(types::LINK_TEXT)?
    } else {
        label
    };
    let info = renderer
        .link_map
        .get(label_text(&content_text(text, label)))?;
    Some((
        LinkTarget {
            destination: info.destination.clone(),
            title: info.title.clone(),
        },
        content,
    ))
}

/// First number of an ordered list.
fn list_start(text: &str, list: &AstNode) -> Option<u64> {
    let item = list.find_child(types::LIST_ITEM)?;
    let number = item.find_child(tokens::LIST_NUMBER)?.text(text);
    let digits: String = number.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Content lines of a fenced code block, each ending in a newline.
fn fence_body(renderer: &Renderer<'_, '_>, fence: &AstNode) -> String {
    let mut body = String::new();
    let mut in_body = false;
    let mut line_open = false;

    for leaf in fence.children() {
        let kind = leaf.kind();
        if kind == tokens::EOL {
            if in_body {
                body.push('\n');
            }
            in_body = true;
            line_open = false;
        } else if kind == tokens::CODE_FENCE_CONTENT && in_body {
            body.push_str(&renderer.code_text(leaf));
            line_open = true;
        }
    }
    if line_open {
        body.push('\n');
    }
    body
}

/// Code span content: line endings become spaces and one space is stripped
/// from each side when both sides have one and the content is not all
/// spaces.
fn code_span_body(text: &str, span: &AstNode) -> String {
    let children = span.children();
    let open = children.first().map_or(0, |child| child.text(text).len());
    let close = match children.last() {
        Some(last) if children.len() > 1 => {
            let run = last.text(text);
            // An escaped closer keeps its backslash as content.
            if last.kind() == tokens::ESCAPED_BACKTICKS {
                run.len() - 1
            } else {
                run.len()
            }
        }
        _ => 0,
    };

    let raw = content_text(text, span);
    let inner = raw.get(open..raw.len().saturating_sub(close)).unwrap_or("");
    let body = inner.replace("\r\n", " ").replace(['\n', '\r'], " ");
    if body.len() >= 2
        && body.starts_with(' ')
        && body.ends_with(' ')
        && !body.bytes().all(|b| b == b' ')
    {
        body[1..body.len() - 1].to_string()
    } else {
        body
    }
}
