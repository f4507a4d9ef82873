//! Block-level state machine.
//!
//! The marker processor walks the document line by line, keeping a stack of
//! open block markers. Each line first tries to continue the open markers
//! from the outside in; the first one that does not match ends the matched
//! prefix. Block starts from the flavour's table are then tried on the rest
//! of the line, and whatever text remains either continues the open
//! paragraph (possibly lazily), extends an open leaf block, or starts a new
//! paragraph.
//!
//! Markers live in an arena and carry their children by index. Besides the
//! marker tree the processor emits leaf tokens (list bullets, quote markers,
//! fences, code lines, ...) that retype the block lexer's tokens.
use std::ops::Range;

use tracing::{debug, warn};

use crate::element::{ElementType, tokens, types};
use crate::error::{ErrorHandler, ErrorInfo, ErrorSeverity, RecoveryKind};
use crate::lexer::Token;

use super::block_starts::{
    BlockStart, HtmlBlockKind, atx_heading, fence_close, fence_open, list_marker,
    setext_underline, thematic_break,
};
use super::link_syntax::link_definition;

pub(crate) type MarkerId = usize;

const CODE_INDENT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MarkerKind {
    Document,
    BlockQuote,
    List { ordered: bool, delimiter: char },
    ListItem { content_indent: usize },
    Paragraph,
    AtxHeading { level: usize },
    AtxContent,
    SetextHeading { level: usize },
    SetextContent,
    FencedCode { fence: char, length: usize, indent: usize },
    IndentedCode,
    HtmlBlock(HtmlBlockKind),
    LinkDefinition,
    DefinitionLabel,
    DefinitionDestination,
    DefinitionTitle,
    /// Carried by its `HORIZONTAL_RULE` leaf token; has no composite.
    ThematicBreak,
    /// A paragraph consumed entirely by link reference definitions.
    Removed,
}

impl MarkerKind {
    pub(crate) fn element_type(self) -> Option<ElementType> {
        let element = match self {
            MarkerKind::Document => types::MARKDOWN_FILE,
            MarkerKind::BlockQuote => types::BLOCK_QUOTE,
            MarkerKind::List { ordered: true, .. } => types::ORDERED_LIST,
            MarkerKind::List { ordered: false, .. } => types::UNORDERED_LIST,
            MarkerKind::ListItem { .. } => types::LIST_ITEM,
            MarkerKind::Paragraph => types::PARAGRAPH,
            MarkerKind::AtxHeading { level } => types::atx(level),
            MarkerKind::AtxContent => types::ATX_CONTENT,
            MarkerKind::SetextHeading { level: 1 } => types::SETEXT_1,
            MarkerKind::SetextHeading { .. } => types::SETEXT_2,
            MarkerKind::SetextContent => types::SETEXT_CONTENT,
            MarkerKind::FencedCode { .. } => types::CODE_FENCE,
            MarkerKind::IndentedCode => types::CODE_BLOCK,
            MarkerKind::HtmlBlock(_) => types::HTML_BLOCK,
            MarkerKind::LinkDefinition => types::LINK_DEFINITION,
            MarkerKind::DefinitionLabel => types::LINK_LABEL,
            MarkerKind::DefinitionDestination => types::LINK_DESTINATION,
            MarkerKind::DefinitionTitle => types::LINK_TITLE,
            MarkerKind::ThematicBreak | MarkerKind::Removed => return None,
        };
        Some(element)
    }

    fn is_container(self) -> bool {
        matches!(
            self,
            MarkerKind::Document
                | MarkerKind::BlockQuote
                | MarkerKind::List { .. }
                | MarkerKind::ListItem { .. }
        )
    }

    fn accepts_lines(self) -> bool {
        matches!(
            self,
            MarkerKind::FencedCode { .. } | MarkerKind::IndentedCode | MarkerKind::HtmlBlock(_)
        )
    }

    fn can_contain(self, child: MarkerKind) -> bool {
        match self {
            MarkerKind::Document | MarkerKind::BlockQuote | MarkerKind::ListItem { .. } => {
                !matches!(child, MarkerKind::ListItem { .. })
            }
            MarkerKind::List { .. } => matches!(child, MarkerKind::ListItem { .. }),
            _ => false,
        }
    }
}

/// Provisional block node.
#[derive(Debug, Clone)]
pub(crate) struct Marker {
    pub kind: MarkerKind,
    pub start: usize,
    pub end: usize,
    pub children: Vec<MarkerId>,
    parent: Option<MarkerId>,
    /// Paragraph content lines, or indented code lines.
    lines: Vec<Range<usize>>,
}

impl Marker {
    fn new(kind: MarkerKind, start: usize, parent: Option<MarkerId>) -> Self {
        Self {
            kind,
            start,
            end: start,
            children: Vec::new(),
            parent,
            lines: Vec::new(),
        }
    }
}

/// Finalized marker arena plus the leaf tokens block parsing produced.
/// The document marker is always at index 0.
#[derive(Debug)]
pub(crate) struct MarkerTree {
    pub markers: Vec<Marker>,
    pub leaves: Vec<Token>,
    /// Code content starting on a partly consumed tab: the tab's offset and
    /// the columns of it that belong to the content.
    pub tab_remainders: Vec<(usize, usize)>,
}

impl MarkerTree {
    pub(crate) const ROOT: MarkerId = 0;
}

/// One source line as seen by the block parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Line {
    start: usize,
    content_end: usize,
}

/// Splits the block token stream into lines at EOL tokens.
fn lines_of(tokens: &[Token], text_len: usize) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut start = 0;
    for token in tokens {
        if token.kind == tokens::EOL {
            lines.push(Line {
                start,
                content_end: token.start,
            });
            start = token.end;
        }
    }
    if start < text_len {
        lines.push(Line {
            start,
            content_end: text_len,
        });
    }
    lines
}

/// Column-aware cursor over one line. Tabs advance to the next multiple of
/// four. When only part of a tab is needed to reach a column, the cursor
/// stays on the tab and its remaining columns count toward the next indent.
struct LineCursor<'t> {
    line: &'t str,
    base: usize,
    pos: usize,
    column: usize,
    partial_tab: bool,
}

impl<'t> LineCursor<'t> {
    fn new(line: &'t str, base: usize) -> Self {
        Self {
            line,
            base,
            pos: 0,
            column: 0,
            partial_tab: false,
        }
    }

    /// Columns left of a partly consumed tab under the cursor.
    fn tab_remainder(&self) -> Option<usize> {
        self.partial_tab.then(|| 4 - self.column % 4)
    }

    fn offset(&self) -> usize {
        self.base + self.pos
    }

    fn rest(&self) -> &'t str {
        &self.line[self.pos..]
    }

    /// Byte index and column of the next non-space character.
    fn next_nonspace(&self) -> (usize, usize) {
        let mut pos = self.pos;
        let mut column = self.column;
        for byte in self.line.as_bytes()[self.pos..].iter() {
            match byte {
                b' ' => column += 1,
                b'\t' => column += 4 - column % 4,
                _ => break,
            }
            pos += 1;
        }
        (pos, column)
    }

    fn indent(&self) -> usize {
        self.next_nonspace().1 - self.column
    }

    fn nonspace_rest(&self) -> &'t str {
        &self.line[self.next_nonspace().0..]
    }

    fn nonspace_offset(&self) -> usize {
        self.base + self.next_nonspace().0
    }

    fn is_blank(&self) -> bool {
        self.nonspace_rest().is_empty()
    }

    fn advance_to_nonspace(&mut self) {
        let (pos, column) = self.next_nonspace();
        if pos != self.pos {
            self.partial_tab = false;
        }
        self.pos = pos;
        self.column = column;
    }

    /// Advances over ASCII marker bytes.
    fn advance_bytes(&mut self, count: usize) {
        for _ in 0..count {
            match self.line.as_bytes().get(self.pos) {
                Some(b'\t') => self.column += 4 - self.column % 4,
                Some(_) => self.column += 1,
                None => return,
            }
            self.pos += 1;
            self.partial_tab = false;
        }
    }

    /// Advances over up to `columns` columns of spaces and tabs.
    fn advance_columns(&mut self, columns: usize) {
        let target = self.column + columns;
        while self.column < target {
            match self.line.as_bytes().get(self.pos) {
                Some(b' ') => self.column += 1,
                Some(b'\t') => {
                    let width = 4 - self.column % 4;
                    if self.column + width > target {
                        self.column = target;
                        self.partial_tab = true;
                        return;
                    }
                    self.column += width;
                }
                _ => return,
            }
            self.pos += 1;
            self.partial_tab = false;
        }
    }

    fn peek_is_space(&self) -> bool {
        matches!(self.line.as_bytes().get(self.pos), Some(b' ' | b'\t'))
    }
}

enum Continuation {
    Matched,
    NotMatched,
    /// The line was fully consumed by closing the marker (a closing fence).
    Finished,
}

enum StartOutcome {
    None,
    Container(MarkerId),
    Leaf,
    DepthExceeded,
}

/// Per-line bookkeeping for the matched prefix of the open stack.
struct LineState {
    matched: usize,
    all_matched: bool,
    unmatched_closed: bool,
}

pub(crate) struct MarkerProcessor<'a, 'h> {
    text: &'a str,
    block_starts: &'a [BlockStart],
    max_depth: usize,
    handler: &'h mut dyn ErrorHandler,
    markers: Vec<Marker>,
    open: Vec<MarkerId>,
    leaves: Vec<Token>,
    tab_remainders: Vec<(usize, usize)>,
}

impl<'a, 'h> MarkerProcessor<'a, 'h> {
    pub(crate) fn new(
        text: &'a str,
        block_starts: &'a [BlockStart],
        max_depth: usize,
        handler: &'h mut dyn ErrorHandler,
    ) -> Self {
        let mut document = Marker::new(MarkerKind::Document, 0, None);
        document.end = text.len();
        Self {
            text,
            block_starts,
            max_depth: max_depth.max(1),
            handler,
            markers: vec![document],
            open: vec![MarkerTree::ROOT],
            leaves: Vec::new(),
            tab_remainders: Vec::new(),
        }
    }

    /// Runs the state machine over the block token stream.
    pub(crate) fn process(mut self, block_tokens: &[Token]) -> MarkerTree {
        let lines = lines_of(block_tokens, self.text.len());
        for line in &lines {
            self.process_line(*line);
        }
        while self.open.len() > 1 {
            self.finalize_top();
        }

        debug!(
            lines = lines.len(),
            markers = self.markers.len(),
            leaves = self.leaves.len(),
            "block structure finalized"
        );
        MarkerTree {
            markers: self.markers,
            leaves: self.leaves,
            tab_remainders: self.tab_remainders,
        }
    }

    fn kind(&self, id: MarkerId) -> MarkerKind {
        self.markers[id].kind
    }

    fn tip(&self) -> MarkerId {
        self.open.last().copied().unwrap_or(MarkerTree::ROOT)
    }

    fn process_line(&mut self, line: Line) {
        let text = self.text;
        let mut cursor = LineCursor::new(&text[line.start..line.content_end], line.start);

        let mut matched = 1;
        while matched < self.open.len() {
            match self.continue_marker(self.open[matched], &mut cursor) {
                Continuation::Matched => matched += 1,
                Continuation::NotMatched => break,
                Continuation::Finished => {
                    while self.open.len() > matched {
                        self.finalize_top();
                    }
                    return;
                }
            }
        }

        let all_matched = matched == self.open.len();
        let mut state = LineState {
            matched,
            all_matched,
            unmatched_closed: all_matched,
        };
        let mut container = self.open[matched - 1];

        while !self.kind(container).accepts_lines() {
            let mut outcome = StartOutcome::None;
            for start in self.block_starts {
                outcome = self.try_start(*start, &mut cursor, container, &mut state);
                if !matches!(outcome, StartOutcome::None) {
                    break;
                }
            }
            match outcome {
                StartOutcome::Container(id) => container = id,
                StartOutcome::Leaf => return,
                StartOutcome::None | StartOutcome::DepthExceeded => break,
            }
        }

        let tip = self.tip();
        if !state.unmatched_closed && self.kind(tip) == MarkerKind::Paragraph && !cursor.is_blank() {
            self.add_paragraph_line(tip, &cursor, line);
            return;
        }

        self.close_unmatched(&mut state);
        let container = self.tip();
        match self.kind(container) {
            MarkerKind::FencedCode { .. } => {
                let start = cursor.offset();
                if start < line.content_end {
                    self.note_tab_remainder(&cursor);
                    self.leaves
                        .push(Token::new(tokens::CODE_FENCE_CONTENT, start, line.content_end));
                    self.markers[container].end = line.content_end;
                }
            }
            MarkerKind::IndentedCode => {
                self.note_tab_remainder(&cursor);
                self.markers[container]
                    .lines
                    .push(cursor.offset()..line.content_end);
            }
            MarkerKind::HtmlBlock(kind) => {
                self.add_html_line(container, kind, &cursor, line);
            }
            MarkerKind::Paragraph => self.add_paragraph_line(container, &cursor, line),
            _ if cursor.is_blank() => {}
            _ => {
                let paragraph =
                    self.add_child(container, MarkerKind::Paragraph, cursor.nonspace_offset());
                self.add_paragraph_line(paragraph, &cursor, line);
            }
        }
    }

    fn continue_marker(&mut self, id: MarkerId, cursor: &mut LineCursor<'_>) -> Continuation {
        match self.kind(id) {
            MarkerKind::BlockQuote => {
                if cursor.indent() <= 3 && cursor.nonspace_rest().starts_with('>') {
                    cursor.advance_to_nonspace();
                    let start = cursor.offset();
                    self.leaves
                        .push(Token::new(tokens::BLOCK_QUOTE, start, start + 1));
                    self.markers[id].end = start + 1;
                    cursor.advance_bytes(1);
                    if cursor.peek_is_space() {
                        cursor.advance_columns(1);
                    }
                    Continuation::Matched
                } else {
                    Continuation::NotMatched
                }
            }
            MarkerKind::List { .. } => Continuation::Matched,
            MarkerKind::ListItem { content_indent } => {
                if cursor.is_blank() {
                    if self.markers[id].children.is_empty() {
                        Continuation::NotMatched
                    } else {
                        cursor.advance_to_nonspace();
                        Continuation::Matched
                    }
                } else if cursor.indent() >= content_indent {
                    cursor.advance_columns(content_indent);
                    Continuation::Matched
                } else {
                    Continuation::NotMatched
                }
            }
            MarkerKind::FencedCode {
                fence,
                length,
                indent,
            } => {
                if cursor.indent() <= 3
                    && let Some(run) = fence_close(cursor.nonspace_rest(), fence, length)
                {
                    cursor.advance_to_nonspace();
                    let start = cursor.offset();
                    self.leaves
                        .push(Token::new(tokens::CODE_FENCE_END, start, start + run));
                    self.markers[id].end = start + run;
                    return Continuation::Finished;
                }
                let strip = cursor.indent().min(indent);
                cursor.advance_columns(strip);
                Continuation::Matched
            }
            MarkerKind::IndentedCode => {
                if cursor.indent() >= CODE_INDENT {
                    cursor.advance_columns(CODE_INDENT);
                    Continuation::Matched
                } else if cursor.is_blank() {
                    cursor.advance_to_nonspace();
                    Continuation::Matched
                } else {
                    Continuation::NotMatched
                }
            }
            MarkerKind::HtmlBlock(kind) => {
                if cursor.is_blank() && kind.ends_at_blank_line() {
                    Continuation::NotMatched
                } else {
                    Continuation::Matched
                }
            }
            MarkerKind::Paragraph => {
                if cursor.is_blank() {
                    Continuation::NotMatched
                } else {
                    Continuation::Matched
                }
            }
            _ => Continuation::NotMatched,
        }
    }

    fn try_start(
        &mut self,
        start: BlockStart,
        cursor: &mut LineCursor<'_>,
        container: MarkerId,
        state: &mut LineState,
    ) -> StartOutcome {
        if cursor.indent() >= CODE_INDENT && start != BlockStart::IndentedCode {
            return StartOutcome::None;
        }

        match start {
            BlockStart::BlockQuote => self.start_block_quote(cursor, container, state),
            BlockStart::AtxHeading => self.start_atx_heading(cursor, container, state),
            BlockStart::FencedCode => self.start_fenced_code(cursor, container, state),
            BlockStart::HtmlBlock => self.start_html_block(cursor, container, state),
            BlockStart::SetextHeading => self.start_setext_heading(cursor, container, state),
            BlockStart::ThematicBreak => self.start_thematic_break(cursor, container, state),
            BlockStart::ListItem => self.start_list_item(cursor, container, state),
            BlockStart::IndentedCode => self.start_indented_code(cursor, container, state),
        }
    }

    fn start_block_quote(
        &mut self,
        cursor: &mut LineCursor<'_>,
        container: MarkerId,
        state: &mut LineState,
    ) -> StartOutcome {
        if !cursor.nonspace_rest().starts_with('>') {
            return StartOutcome::None;
        }
        if self.exceeds_depth(1, cursor.nonspace_offset()) {
            return StartOutcome::DepthExceeded;
        }

        self.close_unmatched(state);
        cursor.advance_to_nonspace();
        let start = cursor.offset();
        self.leaves
            .push(Token::new(tokens::BLOCK_QUOTE, start, start + 1));
        cursor.advance_bytes(1);
        if cursor.peek_is_space() {
            cursor.advance_columns(1);
        }

        let quote = self.add_child(container, MarkerKind::BlockQuote, start);
        self.markers[quote].end = start + 1;
        StartOutcome::Container(quote)
    }

    fn start_atx_heading(
        &mut self,
        cursor: &mut LineCursor<'_>,
        container: MarkerId,
        state: &mut LineState,
    ) -> StartOutcome {
        let Some(heading) = atx_heading(cursor.nonspace_rest()) else {
            return StartOutcome::None;
        };

        self.close_unmatched(state);
        let base = cursor.nonspace_offset();
        let id = self.add_child(container, MarkerKind::AtxHeading { level: heading.level }, base);
        self.leaves
            .push(Token::new(tokens::ATX_HEADER, base, base + heading.level));
        let mut end = base + heading.level;

        if let Some(content) = heading.content {
            let child = self.push_marker(MarkerKind::AtxContent, base + content.start, id);
            self.markers[child].end = base + content.end;
            end = base + content.end;
        }
        if let Some(closing) = heading.closing {
            self.leaves
                .push(Token::new(tokens::ATX_HEADER, base + closing.start, base + closing.end));
            end = base + closing.end;
        }

        self.markers[id].end = end;
        self.finalize_top();
        StartOutcome::Leaf
    }

    fn start_fenced_code(
        &mut self,
        cursor: &mut LineCursor<'_>,
        container: MarkerId,
        state: &mut LineState,
    ) -> StartOutcome {
        let Some(fence) = fence_open(cursor.nonspace_rest()) else {
            return StartOutcome::None;
        };

        self.close_unmatched(state);
        let indent = cursor.indent();
        let base = cursor.nonspace_offset();
        let id = self.add_child(
            container,
            MarkerKind::FencedCode {
                fence: fence.fence,
                length: fence.length,
                indent,
            },
            base,
        );
        self.leaves
            .push(Token::new(tokens::CODE_FENCE_START, base, base + fence.length));
        self.markers[id].end = base + fence.length;
        if let Some(info) = fence.info {
            self.leaves
                .push(Token::new(tokens::FENCE_LANG, base + info.start, base + info.end));
            self.markers[id].end = base + info.end;
        }
        StartOutcome::Leaf
    }

    fn start_html_block(
        &mut self,
        cursor: &mut LineCursor<'_>,
        container: MarkerId,
        state: &mut LineState,
    ) -> StartOutcome {
        let Some(kind) = HtmlBlockKind::start(cursor.nonspace_rest()) else {
            return StartOutcome::None;
        };
        let interrupts_paragraph = self.kind(container) == MarkerKind::Paragraph
            || (!state.all_matched && self.kind(self.tip()) == MarkerKind::Paragraph);
        if interrupts_paragraph && !kind.can_interrupt_paragraph() {
            return StartOutcome::None;
        }

        self.close_unmatched(state);
        let id = self.add_child(container, MarkerKind::HtmlBlock(kind), cursor.offset());
        let line = Line {
            start: cursor.base,
            content_end: cursor.base + cursor.line.len(),
        };
        self.add_html_line(id, kind, cursor, line);
        StartOutcome::Leaf
    }

    fn start_setext_heading(
        &mut self,
        cursor: &mut LineCursor<'_>,
        container: MarkerId,
        state: &mut LineState,
    ) -> StartOutcome {
        if self.kind(container) != MarkerKind::Paragraph || !state.all_matched {
            return StartOutcome::None;
        }
        let Some((level, run)) = setext_underline(cursor.nonspace_rest()) else {
            return StartOutcome::None;
        };

        self.extract_definitions(container);
        if self.kind(container) == MarkerKind::Removed {
            return StartOutcome::None;
        }

        let paragraph = &self.markers[container];
        let content_start = paragraph.start;
        let content_end = paragraph
            .lines
            .last()
            .map(|line| trimmed_end(self.text, line))
            .unwrap_or(content_start);

        let content = self.push_marker(MarkerKind::SetextContent, content_start, container);
        self.markers[content].end = content_end;

        let underline = cursor.nonspace_offset();
        let token = if level == 1 {
            tokens::SETEXT_1
        } else {
            tokens::SETEXT_2
        };
        self.leaves.push(Token::new(token, underline, underline + run));

        let heading = &mut self.markers[container];
        heading.kind = MarkerKind::SetextHeading { level };
        heading.end = underline + run;
        self.finalize_top();
        StartOutcome::Leaf
    }

    fn start_thematic_break(
        &mut self,
        cursor: &mut LineCursor<'_>,
        container: MarkerId,
        state: &mut LineState,
    ) -> StartOutcome {
        let Some(length) = thematic_break(cursor.nonspace_rest()) else {
            return StartOutcome::None;
        };

        self.close_unmatched(state);
        let parent = self.ensure_block_container(container);
        let start = cursor.nonspace_offset();
        let rule = self.push_marker(MarkerKind::ThematicBreak, start, parent);
        self.markers[rule].end = start + length;
        self.leaves
            .push(Token::new(tokens::HORIZONTAL_RULE, start, start + length));
        StartOutcome::Leaf
    }

    fn start_list_item(
        &mut self,
        cursor: &mut LineCursor<'_>,
        container: MarkerId,
        state: &mut LineState,
    ) -> StartOutcome {
        let rest = cursor.nonspace_rest();
        let Some(marker) = list_marker(rest) else {
            return StartOutcome::None;
        };
        let blank_after = rest[marker.length..].trim_matches([' ', '\t']).is_empty();

        if self.kind(container) == MarkerKind::Paragraph
            && (blank_after || (marker.ordered && marker.start != 1))
        {
            return StartOutcome::None;
        }

        let list_kind = MarkerKind::List {
            ordered: marker.ordered,
            delimiter: marker.delimiter,
        };
        let joins_list = self.kind(container) == list_kind;
        let needed = if joins_list { 1 } else { 2 };
        if self.exceeds_depth(needed, cursor.nonspace_offset()) {
            return StartOutcome::DepthExceeded;
        }

        self.close_unmatched(state);
        let indent = cursor.indent();
        cursor.advance_to_nonspace();
        let marker_start = cursor.offset();
        cursor.advance_bytes(marker.length);

        let spaces_after = cursor.indent();
        let padding = if blank_after || spaces_after > CODE_INDENT {
            1
        } else {
            spaces_after
        };
        if !blank_after {
            cursor.advance_columns(padding);
        }

        let token = if marker.ordered {
            tokens::LIST_NUMBER
        } else {
            tokens::LIST_BULLET
        };
        self.leaves
            .push(Token::new(token, marker_start, marker_start + marker.length));

        let list = if joins_list {
            container
        } else {
            self.add_child(container, list_kind, marker_start)
        };
        let item = self.add_child(
            list,
            MarkerKind::ListItem {
                content_indent: indent + marker.length + padding,
            },
            marker_start,
        );
        self.markers[item].end = marker_start + marker.length;
        StartOutcome::Container(item)
    }

    fn start_indented_code(
        &mut self,
        cursor: &mut LineCursor<'_>,
        container: MarkerId,
        state: &mut LineState,
    ) -> StartOutcome {
        if cursor.indent() < CODE_INDENT
            || cursor.is_blank()
            || self.kind(self.tip()) == MarkerKind::Paragraph
        {
            return StartOutcome::None;
        }

        self.close_unmatched(state);
        cursor.advance_columns(CODE_INDENT);
        self.note_tab_remainder(cursor);
        let id = self.add_child(container, MarkerKind::IndentedCode, cursor.offset());
        let content_end = cursor.base + cursor.line.len();
        self.markers[id].lines.push(cursor.offset()..content_end);
        StartOutcome::Leaf
    }

    fn note_tab_remainder(&mut self, cursor: &LineCursor<'_>) {
        if let Some(columns) = cursor.tab_remainder() {
            self.tab_remainders.push((cursor.offset(), columns));
        }
    }

    fn exceeds_depth(&mut self, needed: usize, offset: usize) -> bool {
        if self.open.len() + needed <= self.max_depth {
            return false;
        }
        warn!(
            offset,
            max_depth = self.max_depth,
            "container nesting cap reached; keeping the rest of the line as text"
        );
        if self.handler.accepts_more() {
            let info = ErrorInfo::new(
                ErrorSeverity::Error,
                RecoveryKind::DepthExceeded,
                format!("nesting deeper than {} containers", self.max_depth),
            )
            .located(self.text, offset);
            self.handler.handle_error(&info);
        }
        true
    }

    fn close_unmatched(&mut self, state: &mut LineState) {
        if state.unmatched_closed {
            return;
        }
        while self.open.len() > state.matched {
            self.finalize_top();
        }
        state.unmatched_closed = true;
    }

    /// Finalizes open markers until the tip can hold a leaf block.
    fn ensure_block_container(&mut self, mut parent: MarkerId) -> MarkerId {
        while !self.kind(parent).can_contain(MarkerKind::Paragraph) && self.open.len() > 1 {
            self.finalize_top();
            parent = self.tip();
        }
        parent
    }

    /// Adds a child under `parent` (the current tip), closing markers that
    /// cannot contain it first. Blocks that continue over lines are pushed
    /// onto the open stack.
    fn add_child(&mut self, mut parent: MarkerId, kind: MarkerKind, start: usize) -> MarkerId {
        while !self.kind(parent).can_contain(kind) && self.open.len() > 1 {
            self.finalize_top();
            parent = self.tip();
        }
        let id = self.push_marker(kind, start, parent);
        self.open.push(id);
        id
    }

    fn push_marker(&mut self, kind: MarkerKind, start: usize, parent: MarkerId) -> MarkerId {
        let id = self.markers.len();
        self.markers.push(Marker::new(kind, start, Some(parent)));
        self.markers[parent].children.push(id);
        id
    }

    fn add_paragraph_line(&mut self, paragraph: MarkerId, cursor: &LineCursor<'_>, line: Line) {
        let start = cursor.nonspace_offset();
        let marker = &mut self.markers[paragraph];
        marker.lines.push(start..line.content_end);
        marker.end = line.content_end;
    }

    fn add_html_line(
        &mut self,
        id: MarkerId,
        kind: HtmlBlockKind,
        cursor: &LineCursor<'_>,
        line: Line,
    ) {
        let start = cursor.offset();
        if start < line.content_end {
            self.leaves
                .push(Token::new(tokens::HTML_BLOCK_CONTENT, start, line.content_end));
            self.markers[id].end = line.content_end;
        }
        if kind.ends_on(cursor.rest()) {
            self.finalize_top();
        }
    }

    fn finalize_top(&mut self) {
        if let Some(id) = self.open.pop() {
            self.finalize(id);
        }
    }

    fn finalize(&mut self, id: MarkerId) {
        match self.kind(id) {
            MarkerKind::Paragraph => {
                self.extract_definitions(id);
                if self.kind(id) == MarkerKind::Paragraph
                    && let Some(last) = self.markers[id].lines.last()
                {
                    let end = trimmed_end(self.text, last);
                    self.markers[id].end = end;
                }
            }
            MarkerKind::IndentedCode => {
                let text = self.text;
                let marker = &mut self.markers[id];
                while marker
                    .lines
                    .last()
                    .is_some_and(|line| text[line.clone()].trim_matches([' ', '\t']).is_empty())
                {
                    marker.lines.pop();
                }
                for line in &marker.lines {
                    if !line.is_empty() {
                        self.leaves
                            .push(Token::new(tokens::CODE_LINE, line.start, line.end));
                    }
                }
                if let Some(last) = marker.lines.last() {
                    marker.end = last.end;
                }
            }
            kind if kind.is_container() && kind != MarkerKind::Document => {
                let last_end = self.markers[id]
                    .children
                    .iter()
                    .rev()
                    .find(|child| self.markers[**child].kind != MarkerKind::Removed)
                    .map(|child| self.markers[*child].end);
                if let Some(end) = last_end {
                    let marker = &mut self.markers[id];
                    marker.end = marker.end.max(end);
                }
            }
            _ => {}
        }
    }

    /// Splits link reference definitions off the start of a paragraph.
    fn extract_definitions(&mut self, paragraph: MarkerId) {
        let lines = self.markers[paragraph].lines.clone();
        if !self.text[lines.first().map_or(0..0, Clone::clone)].starts_with('[') {
            return;
        }

        // Paragraph content with container prefixes stripped, one line per
        // source line, plus where each line starts in the source.
        let mut joined = String::new();
        let mut line_starts = Vec::with_capacity(lines.len());
        for line in &lines {
            line_starts.push((joined.len(), line.start));
            joined.push_str(&self.text[line.clone()]);
            joined.push('\n');
        }
        let to_source = |logical: usize| -> usize {
            let index = line_starts
                .partition_point(|(start, _)| *start <= logical)
                .saturating_sub(1);
            let (logical_start, source_start) = line_starts[index];
            source_start + (logical - logical_start)
        };

        let mut definitions = Vec::new();
        let mut position = 0;
        while position < joined.len() {
            let Some(found) = link_definition(&joined[position..]) else {
                break;
            };
            let shift = |range: Range<usize>| to_source(position + range.start)..to_source(position + range.end);
            definitions.push((
                shift(0..found.end),
                shift(found.label.clone()),
                shift(found.destination.clone()),
                found.title.clone().map(shift),
            ));
            position += found.end + 1;
        }
        if definitions.is_empty() {
            return;
        }

        let Some(parent) = self.markers[paragraph].parent else {
            return;
        };
        let index = self.markers[parent]
            .children
            .iter()
            .position(|child| *child == paragraph)
            .unwrap_or(self.markers[parent].children.len());

        let mut created = Vec::with_capacity(definitions.len());
        for (whole, label, destination, title) in definitions {
            let id = self.markers.len();
            let mut definition = Marker::new(MarkerKind::LinkDefinition, whole.start, Some(parent));
            definition.end = whole.end;
            self.markers.push(definition);

            let parts = [
                Some((MarkerKind::DefinitionLabel, label)),
                Some((MarkerKind::DefinitionDestination, destination)),
                title.map(|title| (MarkerKind::DefinitionTitle, title)),
            ];
            for (kind, range) in parts.into_iter().flatten() {
                let part = self.push_marker(kind, range.start, id);
                self.markers[part].end = range.end;
            }
            created.push(id);
        }
        debug!(count = created.len(), "link reference definitions extracted");

        let children = &mut self.markers[parent].children;
        for (shift, id) in created.into_iter().enumerate() {
            children.insert(index + shift, id);
        }

        let consumed_lines = line_starts
            .iter()
            .filter(|(logical_start, _)| *logical_start < position)
            .count();
        let marker = &mut self.markers[paragraph];
        if consumed_lines >= lines.len() {
            marker.kind = MarkerKind::Removed;
            marker.lines.clear();
        } else {
            marker.lines.drain(..consumed_lines);
            marker.start = marker.lines[0].start;
        }
    }
}

fn trimmed_end(text: &str, line: &Range<usize>) -> usize {
    line.start + text[line.clone()].trim_end_matches([' ', '\t']).len()
}
