//! Sequential inline parsing.
//!
//! Inline parsers run one after another over lists of token-index ranges.
//! Each parser sees the ranges its predecessors left unclaimed and hands on,
//! through [`ParsingResult::further`], the ranges later parsers may still
//! look at. Text a parser claims is never subdivided by a later one, so a
//! higher-priority match always wins a conflict.
use std::cell::RefCell;
use std::cmp::Reverse;
use std::ops::{Range, RangeInclusive};

use crate::element::{ElementType, tokens, types};
use crate::error::ErrorInfo;

use super::builder::Production;
use super::inline::{autolink, code_span, emphasis, html, line_break, link, strikethrough};
use super::link_map::LinkMap;
use super::token_cache::TokenCache;

/// Inclusive token-index ranges, in increasing order.
pub type RangeList = Vec<RangeInclusive<usize>>;

/// Coalesces pushed indices into contiguous inclusive ranges.
#[derive(Debug, Clone, Default)]
pub struct RangesListBuilder {
    ranges: RangeList,
}

impl RangesListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extends the last range when `index` directly follows it, otherwise
    /// starts a new one.
    pub fn push(&mut self, index: usize) {
        if let Some(last) = self.ranges.last_mut()
            && last.end().checked_add(1) == Some(index)
        {
            *last = *last.start()..=index;
            return;
        }
        self.ranges.push(index..=index);
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn get(self) -> RangeList {
        self.ranges
    }
}

/// Splits `range` around block-quote marker tokens.
pub fn filter_blockquotes(cache: &TokenCache<'_>, range: RangeInclusive<usize>) -> RangeList {
    let mut builder = RangesListBuilder::new();
    for index in range {
        match cache.kind(index) {
            Some(kind) if kind != tokens::BLOCK_QUOTE => builder.push(index),
            _ => {}
        }
    }
    builder.get()
}

/// Every index of a range list, in order.
pub(crate) fn indices(list: &[RangeInclusive<usize>]) -> Vec<usize> {
    list.iter().flat_map(Clone::clone).collect()
}

/// A typed node over an inclusive range of token indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequentialNode {
    pub kind: ElementType,
    pub range: RangeInclusive<usize>,
}

impl SequentialNode {
    pub fn new(kind: ElementType, range: RangeInclusive<usize>) -> Self {
        Self { kind, range }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsingResult {
    /// Nodes found, a parent before its children.
    pub nodes: Vec<SequentialNode>,
    /// Range lists later parsers run over.
    pub further: Vec<RangeList>,
}

impl ParsingResult {
    /// Finds nothing and passes `list` on unchanged.
    pub fn pass_through(list: &[RangeInclusive<usize>]) -> Self {
        Self {
            nodes: Vec::new(),
            further: vec![list.to_vec()],
        }
    }
}

/// A matched span in index space. Indices inside `inner` stay available
/// to later parsers as a range list of their own; the rest of `outer` is
/// consumed.
#[derive(Debug, Clone)]
pub(crate) struct Claim {
    pub outer: RangeInclusive<usize>,
    pub inner: Option<RangeInclusive<usize>>,
}

impl Claim {
    pub(crate) fn whole(outer: RangeInclusive<usize>) -> Self {
        Self { outer, inner: None }
    }

    pub(crate) fn with_inner(outer: RangeInclusive<usize>, inner: RangeInclusive<usize>) -> Self {
        let inner = (inner.start() <= inner.end()).then_some(inner);
        Self { outer, inner }
    }
}

/// Splits `list` into what no claim covers, followed by the free inner part
/// of each claim. Claims must nest or be disjoint.
pub(crate) fn partition(list: &[usize], claims: &[Claim]) -> Vec<RangeList> {
    let mut order: Vec<usize> = (0..claims.len()).collect();
    order.sort_by_key(|c| (*claims[*c].outer.start(), Reverse(*claims[*c].outer.end())));

    let mut outside = RangesListBuilder::new();
    let mut inner = vec![RangesListBuilder::new(); claims.len()];
    let mut open: Vec<usize> = Vec::new();
    let mut next = 0;

    for &index in list {
        while open.last().is_some_and(|top| *claims[*top].outer.end() < index) {
            open.pop();
        }
        while next < order.len() && *claims[order[next]].outer.start() <= index {
            let claim = order[next];
            next += 1;
            if *claims[claim].outer.end() < index {
                continue;
            }
            open.push(claim);
        }

        match open.last() {
            None => outside.push(index),
            Some(&claim) => {
                if claims[claim]
                    .inner
                    .as_ref()
                    .is_some_and(|range| range.contains(&index))
                {
                    inner[claim].push(index);
                }
            }
        }
    }

    std::iter::once(outside)
        .chain(inner)
        .filter(|builder| !builder.is_empty())
        .map(RangesListBuilder::get)
        .collect()
}

/// Per-host state shared by the parsers of one run.
#[derive(Debug)]
pub struct ParseContext<'m> {
    link_map: &'m LinkMap,
    diagnostics: RefCell<Vec<ErrorInfo>>,
    links: RefCell<Vec<Range<usize>>>,
}

impl<'m> ParseContext<'m> {
    pub fn new(link_map: &'m LinkMap) -> Self {
        Self {
            link_map,
            diagnostics: RefCell::new(Vec::new()),
            links: RefCell::new(Vec::new()),
        }
    }

    pub fn link_map(&self) -> &LinkMap {
        self.link_map
    }

    pub fn report(&self, info: ErrorInfo) {
        self.diagnostics.borrow_mut().push(info);
    }

    pub fn take_diagnostics(&self) -> Vec<ErrorInfo> {
        self.diagnostics.take()
    }

    /// Remembers the byte range of a formed link.
    pub fn record_link(&self, range: Range<usize>) {
        self.links.borrow_mut().push(range);
    }

    /// Whether `range` contains a recorded link or lies inside one.
    pub fn overlaps_link(&self, range: &Range<usize>) -> bool {
        self.links.borrow().iter().any(|link| {
            (range.start <= link.start && link.end <= range.end)
                || (link.start <= range.start && range.end <= link.end)
        })
    }
}

pub type ParseFn =
    fn(&TokenCache<'_>, &[RangeInclusive<usize>], &ParseContext<'_>) -> ParsingResult;

/// Inline parsers a flavour can list.
#[derive(Debug, Clone, Copy)]
pub enum SequentialParserKind {
    CodeSpan,
    Autolink,
    RawHtml,
    Image,
    InlineLink,
    ReferenceLink,
    Strikethrough,
    Emphasis,
    LineBreak,
    Custom {
        name: &'static str,
        parse: ParseFn,
        outputs: &'static [ElementType],
    },
}

impl SequentialParserKind {
    pub const COMMONMARK: [SequentialParserKind; 8] = [
        SequentialParserKind::CodeSpan,
        SequentialParserKind::Autolink,
        SequentialParserKind::RawHtml,
        SequentialParserKind::Image,
        SequentialParserKind::InlineLink,
        SequentialParserKind::ReferenceLink,
        SequentialParserKind::Emphasis,
        SequentialParserKind::LineBreak,
    ];

    pub const GFM: [SequentialParserKind; 9] = [
        SequentialParserKind::CodeSpan,
        SequentialParserKind::Autolink,
        SequentialParserKind::RawHtml,
        SequentialParserKind::Image,
        SequentialParserKind::InlineLink,
        SequentialParserKind::ReferenceLink,
        SequentialParserKind::Strikethrough,
        SequentialParserKind::Emphasis,
        SequentialParserKind::LineBreak,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SequentialParserKind::CodeSpan => "code-span",
            SequentialParserKind::Autolink => "autolink",
            SequentialParserKind::RawHtml => "raw-html",
            SequentialParserKind::Image => "image",
            SequentialParserKind::InlineLink => "inline-link",
            SequentialParserKind::ReferenceLink => "reference-link",
            SequentialParserKind::Strikethrough => "strikethrough",
            SequentialParserKind::Emphasis => "emphasis",
            SequentialParserKind::LineBreak => "line-break",
            SequentialParserKind::Custom { name, .. } => *name,
        }
    }

    /// Element types this parser can produce.
    pub fn outputs(&self) -> &'static [ElementType] {
        match self {
            SequentialParserKind::CodeSpan => &[types::CODE_SPAN],
            SequentialParserKind::Autolink => &[types::AUTOLINK],
            SequentialParserKind::RawHtml => &[types::INLINE_HTML],
            SequentialParserKind::Image => &[
                types::IMAGE,
                types::INLINE_LINK,
                types::FULL_REFERENCE_LINK,
                types::SHORT_REFERENCE_LINK,
                types::LINK_TEXT,
                types::LINK_LABEL,
                types::LINK_DESTINATION,
                types::LINK_TITLE,
            ],
            SequentialParserKind::InlineLink => &[
                types::INLINE_LINK,
                types::LINK_TEXT,
                types::LINK_DESTINATION,
                types::LINK_TITLE,
            ],
            SequentialParserKind::ReferenceLink => &[
                types::FULL_REFERENCE_LINK,
                types::SHORT_REFERENCE_LINK,
                types::LINK_TEXT,
                types::LINK_LABEL,
            ],
            SequentialParserKind::Strikethrough => &[types::STRIKETHROUGH],
            SequentialParserKind::Emphasis => &[types::EMPH, types::STRONG],
            SequentialParserKind::LineBreak => &[types::HARD_LINE_BREAK],
            SequentialParserKind::Custom { outputs, .. } => *outputs,
        }
    }

    pub fn parse(
        &self,
        cache: &TokenCache<'_>,
        list: &[RangeInclusive<usize>],
        context: &ParseContext<'_>,
    ) -> ParsingResult {
        match self {
            SequentialParserKind::CodeSpan => code_span::parse(cache, list, context),
            SequentialParserKind::Autolink => autolink::parse(cache, list, context),
            SequentialParserKind::RawHtml => html::parse(cache, list, context),
            SequentialParserKind::Image => link::parse(link::LinkMode::Image, cache, list, context),
            SequentialParserKind::InlineLink => {
                link::parse(link::LinkMode::Inline, cache, list, context)
            }
            SequentialParserKind::ReferenceLink => {
                link::parse(link::LinkMode::Reference, cache, list, context)
            }
            SequentialParserKind::Strikethrough => strikethrough::parse(cache, list, context),
            SequentialParserKind::Emphasis => emphasis::parse(cache, list, context),
            SequentialParserKind::LineBreak => line_break::parse(cache, list, context),
            SequentialParserKind::Custom { parse, .. } => parse(cache, list, context),
        }
    }
}

/// Runs a flavour's parsers in order over one host.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SequentialParserManager<'p> {
    parsers: &'p [SequentialParserKind],
}

impl<'p> SequentialParserManager<'p> {
    pub(crate) fn new(parsers: &'p [SequentialParserKind]) -> Self {
        Self { parsers }
    }

    /// All nodes found in the host, as byte-range productions.
    pub(crate) fn run(&self, cache: &TokenCache<'_>, context: &ParseContext<'_>) -> Vec<Production> {
        let mut productions = Vec::new();
        if cache.is_empty() {
            return productions;
        }

        let mut lists = vec![filter_blockquotes(cache, 0..=cache.len() - 1)];
        for parser in self.parsers {
            let mut further = Vec::new();
            for list in &lists {
                let result = parser.parse(cache, list, context);
                productions.extend(result.nodes.into_iter().map(|node| {
                    Production::new(
                        node.kind,
                        cache.start(*node.range.start())..cache.end(*node.range.end()),
                    )
                }));
                further.extend(result.further.into_iter().filter(|list| !list.is_empty()));
            }
            lists = further;
        }
        productions
    }
}

/// Position of token `index` within a sorted index list.
pub(crate) fn position_of(indices: &[usize], index: usize) -> Option<usize> {
    indices.binary_search(&index).ok()
}
