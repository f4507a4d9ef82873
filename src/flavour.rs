//! Flavours: the grammar and output tables for one markdown dialect.
//!
//! A [`Flavour`] names the block starts the marker processor tries, in
//! order, the sequential inline parsers, in order, the composite types whose
//! content is parsed inline, the inline lexer and the generating provider of
//! every element type it renders. It holds no per-document state and is
//! shared freely between parses.
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::codegen::providers::{GeneratingProvider, Trim};
use crate::element::{ElementType, tokens, types};
use crate::error::{MarkdownError, Result};
use crate::lexer::Lexer;
use crate::parser::block_starts::BlockStart;
use crate::parser::sequential::SequentialParserKind;

/// Constructor of the inline lexer a flavour uses.
pub type InlineLexerFn = for<'a> fn(&'a str) -> Lexer<'a>;

#[derive(Debug, Clone)]
pub struct Flavour {
    name: String,
    block_starts: Vec<BlockStart>,
    sequential_parsers: Vec<SequentialParserKind>,
    inline_hosts: Vec<ElementType>,
    providers: HashMap<ElementType, GeneratingProvider>,
    inline_lexer: InlineLexerFn,
}

impl Flavour {
    /// CommonMark without extensions.
    pub fn commonmark() -> Self {
        Self {
            name: "commonmark".to_string(),
            block_starts: BlockStart::COMMONMARK.to_vec(),
            sequential_parsers: SequentialParserKind::COMMONMARK.to_vec(),
            inline_hosts: default_inline_hosts(),
            providers: commonmark_providers(),
            inline_lexer,
        }
    }

    /// CommonMark plus `~~strikethrough~~`.
    pub fn gfm() -> Self {
        let mut providers = commonmark_providers();
        providers.insert(
            types::STRIKETHROUGH,
            GeneratingProvider::Inline {
                tag: "del",
                trim: Trim::Run(tokens::TILDE),
            },
        );
        Self {
            name: "gfm".to_string(),
            block_starts: BlockStart::COMMONMARK.to_vec(),
            sequential_parsers: SequentialParserKind::GFM.to_vec(),
            inline_hosts: default_inline_hosts(),
            providers,
            inline_lexer,
        }
    }

    /// Starts a custom flavour from the CommonMark tables.
    pub fn builder(name: impl Into<String>) -> FlavourBuilder {
        FlavourBuilder::from_flavour(name, Flavour::commonmark())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn block_starts(&self) -> &[BlockStart] {
        &self.block_starts
    }

    pub fn sequential_parsers(&self) -> &[SequentialParserKind] {
        &self.sequential_parsers
    }

    pub fn inline_hosts(&self) -> &[ElementType] {
        &self.inline_hosts
    }

    pub fn is_inline_host(&self, kind: ElementType) -> bool {
        self.inline_hosts.contains(&kind)
    }

    pub fn inline_lexer<'a>(&self, text: &'a str) -> Lexer<'a> {
        (self.inline_lexer)(text)
    }

    pub fn provider(&self, kind: ElementType) -> Option<&GeneratingProvider> {
        self.providers.get(&kind)
    }
}

fn inline_lexer(text: &str) -> Lexer<'_> {
    Lexer::inline(text)
}

fn default_inline_hosts() -> Vec<ElementType> {
    vec![types::PARAGRAPH, types::ATX_CONTENT, types::SETEXT_CONTENT]
}

fn commonmark_providers() -> HashMap<ElementType, GeneratingProvider> {
    use GeneratingProvider as P;

    let mut providers = HashMap::new();
    let mut add = |kind: ElementType, provider: GeneratingProvider| {
        providers.insert(kind, provider);
    };

    add(types::MARKDOWN_FILE, P::Transparent { trim: Trim::None });
    add(types::PARAGRAPH, P::Paragraph);
    add(types::BLOCK_QUOTE, P::Block { tag: "blockquote" });
    add(types::UNORDERED_LIST, P::List);
    add(types::ORDERED_LIST, P::List);
    add(types::LIST_ITEM, P::ListItem);
    for (level, kind) in [
        types::ATX_1,
        types::ATX_2,
        types::ATX_3,
        types::ATX_4,
        types::ATX_5,
        types::ATX_6,
    ]
    .into_iter()
    .enumerate()
    {
        add(kind, P::Heading { level: level + 1 });
    }
    add(types::SETEXT_1, P::Heading { level: 1 });
    add(types::SETEXT_2, P::Heading { level: 2 });
    add(types::ATX_CONTENT, P::Transparent { trim: Trim::None });
    add(types::SETEXT_CONTENT, P::Transparent { trim: Trim::None });
    add(types::CODE_FENCE, P::CodeFence);
    add(types::CODE_BLOCK, P::CodeBlock);
    add(types::HTML_BLOCK, P::HtmlBlock);
    add(types::LINK_DEFINITION, P::Skip);

    add(
        types::EMPH,
        P::Inline {
            tag: "em",
            trim: Trim::Count(1),
        },
    );
    add(
        types::STRONG,
        P::Inline {
            tag: "strong",
            trim: Trim::Count(2),
        },
    );
    add(types::CODE_SPAN, P::CodeSpan);
    add(types::INLINE_HTML, P::InlineHtml);
    add(types::AUTOLINK, P::Autolink);
    add(types::INLINE_LINK, P::Link);
    add(types::FULL_REFERENCE_LINK, P::Link);
    add(types::SHORT_REFERENCE_LINK, P::Link);
    add(types::IMAGE, P::Image);
    add(types::LINK_TEXT, P::Transparent { trim: Trim::Count(1) });
    add(types::LINK_LABEL, P::Transparent { trim: Trim::Count(1) });
    add(types::LINK_DESTINATION, P::Skip);
    add(types::LINK_TITLE, P::Skip);
    add(types::HARD_LINE_BREAK, P::HardLineBreak);

    add(tokens::HORIZONTAL_RULE, P::ThematicBreak);
    add(tokens::TEXT, P::Text);
    add(tokens::WHITE_SPACE, P::Space);
    add(tokens::EOL, P::LineEnding);
    add(tokens::ENTITY, P::Entity);
    add(tokens::ESCAPED_CHAR, P::Escaped);
    add(tokens::ESCAPED_BACKTICKS, P::Escaped);
    add(tokens::BLOCK_QUOTE, P::Skip);

    providers
}

/// Builds a validated [`Flavour`].
///
/// Configuration mistakes are programmer errors and are reported by
/// [`FlavourBuilder::build`], before any document is parsed.
#[derive(Debug, Clone)]
pub struct FlavourBuilder {
    name: String,
    block_starts: Vec<BlockStart>,
    sequential_parsers: Vec<SequentialParserKind>,
    inline_hosts: Vec<ElementType>,
    providers: Vec<(ElementType, GeneratingProvider)>,
    inline_lexer: InlineLexerFn,
}

impl FlavourBuilder {
    /// A builder with empty tables.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            block_starts: Vec::new(),
            sequential_parsers: Vec::new(),
            inline_hosts: Vec::new(),
            providers: Vec::new(),
            inline_lexer,
        }
    }

    /// A builder holding a copy of `base`'s tables under a new name.
    pub fn from_flavour(name: impl Into<String>, base: Flavour) -> Self {
        let mut providers: Vec<_> = base.providers.into_iter().collect();
        providers.sort_by_key(|(kind, _)| kind.name());
        Self {
            name: name.into(),
            block_starts: base.block_starts,
            sequential_parsers: base.sequential_parsers,
            inline_hosts: base.inline_hosts,
            providers,
            inline_lexer: base.inline_lexer,
        }
    }

    /// Replaces the block-start priority table.
    pub fn block_starts(mut self, starts: impl IntoIterator<Item = BlockStart>) -> Self {
        self.block_starts = starts.into_iter().collect();
        self
    }

    /// Replaces the sequential-parser priority table.
    pub fn sequential_parsers(
        mut self,
        parsers: impl IntoIterator<Item = SequentialParserKind>,
    ) -> Self {
        self.sequential_parsers = parsers.into_iter().collect();
        self
    }

    /// Appends a parser after the existing ones.
    pub fn parser(mut self, parser: SequentialParserKind) -> Self {
        self.sequential_parsers.push(parser);
        self
    }

    pub fn inline_hosts(mut self, hosts: impl IntoIterator<Item = ElementType>) -> Self {
        self.inline_hosts = hosts.into_iter().collect();
        self
    }

    /// Registers or replaces the provider for `kind`.
    pub fn provider(mut self, kind: ElementType, provider: GeneratingProvider) -> Self {
        self.providers.retain(|(existing, _)| *existing != kind);
        self.providers.push((kind, provider));
        self
    }

    pub fn inline_lexer(mut self, lexer: InlineLexerFn) -> Self {
        self.inline_lexer = lexer;
        self
    }

    pub fn build(self) -> Result<Flavour> {
        let name = self.name;
        if self.block_starts.is_empty() {
            return Err(MarkdownError::configuration(&name, "no block starts"));
        }
        if self.sequential_parsers.is_empty() {
            return Err(MarkdownError::configuration(&name, "no sequential parsers"));
        }
        if self.inline_hosts.is_empty() {
            return Err(MarkdownError::configuration(&name, "no inline hosts"));
        }

        for (index, start) in self.block_starts.iter().enumerate() {
            if self.block_starts[..index].contains(start) {
                return Err(MarkdownError::duplicate(&name, format!("block start {:?}", start)));
            }
        }
        for (index, parser) in self.sequential_parsers.iter().enumerate() {
            if self.sequential_parsers[..index]
                .iter()
                .any(|earlier| earlier.name() == parser.name())
            {
                return Err(MarkdownError::duplicate(
                    &name,
                    format!("sequential parser `{}`", parser.name()),
                ));
            }
        }
        if let Some(host) = self.inline_hosts.iter().find(|host| host.is_token()) {
            return Err(MarkdownError::configuration(
                &name,
                format!("inline host {} is a token type", host),
            ));
        }

        let mut providers = HashMap::with_capacity(self.providers.len());
        for (kind, provider) in self.providers {
            if kind.is_token() && provider.is_composite_only() {
                return Err(MarkdownError::configuration(
                    &name,
                    format!("provider {} needs children but {} is a token type", provider.name(), kind),
                ));
            }
            match providers.entry(kind) {
                Entry::Occupied(_) => {
                    return Err(MarkdownError::duplicate(&name, format!("provider for {}", kind)));
                }
                Entry::Vacant(slot) => {
                    slot.insert(provider);
                }
            }
        }

        for parser in &self.sequential_parsers {
            if let Some(missing) = parser
                .outputs()
                .iter()
                .find(|output| !providers.contains_key(*output))
            {
                return Err(MarkdownError::missing_provider(
                    &name,
                    parser.name(),
                    missing.name(),
                ));
            }
        }

        Ok(Flavour {
            name,
            block_starts: self.block_starts,
            sequential_parsers: self.sequential_parsers,
            inline_hosts: self.inline_hosts,
            providers,
            inline_lexer: self.inline_lexer,
        })
    }
}
