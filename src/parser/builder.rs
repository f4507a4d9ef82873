//! Offset-based tree construction.
//!
//! Both parsing phases end here: a flat, tiling token stream plus a list of
//! composite productions (typed ranges) is nested into an [`AstNode`]. Tokens
//! that straddle a production boundary are split, so children always tile
//! their parent exactly.
use std::cmp::Reverse;
use std::ops::Range;

use crate::ast::AstNode;
use crate::element::ElementType;
use crate::lexer::Token;

use super::markers::{MarkerKind, MarkerTree};

/// A composite to be built over `range`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Production {
    pub kind: ElementType,
    pub range: Range<usize>,
}

impl Production {
    pub(crate) fn new(kind: ElementType, range: Range<usize>) -> Self {
        Self { kind, range }
    }
}

/// Replaces the parts of `base` covered by `overrides` with the override
/// tokens. Base tokens that overlap an override only partly are cut into
/// fragments that keep their type.
pub(crate) fn overlay(base: &[Token], mut overrides: Vec<Token>) -> Vec<Token> {
    overrides.retain(|token| !token.is_empty());
    overrides.sort_by_key(|token| token.start);

    // Drop overrides that overlap an earlier one.
    let mut last_end = 0;
    overrides.retain(|token| {
        let keep = token.start >= last_end;
        if keep {
            last_end = token.end;
        }
        keep
    });

    let mut out = Vec::with_capacity(base.len() + overrides.len());
    let mut pending = overrides.into_iter().peekable();
    let mut covered = 0;

    for token in base {
        let mut pos = token.start.max(covered);
        while pos < token.end {
            match pending.peek() {
                Some(next) if next.start <= pos => {
                    covered = next.end;
                    pos = pos.max(next.end);
                    out.push(*next);
                    pending.next();
                }
                Some(next) => {
                    let cut = next.start.min(token.end);
                    out.push(Token::new(token.kind, pos, cut));
                    pos = cut;
                }
                None => {
                    out.push(Token::new(token.kind, pos, token.end));
                    pos = token.end;
                }
            }
        }
    }
    out.extend(pending);
    out
}

/// Composite productions of the marker tree in pre-order, document excluded.
pub(crate) fn block_productions(tree: &MarkerTree) -> Vec<Production> {
    let mut productions = Vec::with_capacity(tree.markers.len());
    let root = &tree.markers[MarkerTree::ROOT];
    let mut stack: Vec<usize> = root.children.iter().rev().copied().collect();

    while let Some(id) = stack.pop() {
        let marker = &tree.markers[id];
        if marker.kind == MarkerKind::Removed {
            continue;
        }
        if let Some(kind) = marker.kind.element_type() {
            productions.push(Production::new(kind, marker.start..marker.end));
        }
        stack.extend(marker.children.iter().rev().copied());
    }
    productions
}

struct Frame {
    kind: ElementType,
    range: Range<usize>,
    children: Vec<AstNode>,
}

impl Frame {
    fn new(kind: ElementType, range: Range<usize>) -> Self {
        Self {
            kind,
            range,
            children: Vec::new(),
        }
    }

    fn into_node(self) -> AstNode {
        AstNode::composite(self.kind, self.range, self.children)
    }
}

/// Nests `productions` and `tokens` under a root composite of `kind`.
///
/// `tokens` must tile `range`. Productions may come in any order; equal
/// ranges nest in the order given, first outermost.
pub(crate) fn build(
    kind: ElementType,
    range: Range<usize>,
    mut productions: Vec<Production>,
    tokens: Vec<Token>,
) -> AstNode {
    productions.sort_by_key(|production| (production.range.start, Reverse(production.range.end)));

    let mut boundaries: Vec<usize> = productions
        .iter()
        .flat_map(|production| [production.range.start, production.range.end])
        .collect();
    boundaries.sort_unstable();
    boundaries.dedup();

    let mut frames = vec![Frame::new(kind, range)];
    let mut pending = productions.into_iter().peekable();

    for token in tokens {
        for piece in split_at(token, &boundaries) {
            open_until(&mut frames, &mut pending, piece.start);
            if let Some(top) = frames.last_mut() {
                top.children.push(AstNode::leaf(piece.kind, piece.range()));
            }
        }
    }

    let end = frames[0].range.end;
    open_until(&mut frames, &mut pending, end);
    while frames.len() > 1 {
        close_top(&mut frames);
    }
    frames
        .pop()
        .map(Frame::into_node)
        .unwrap_or_else(|| AstNode::composite(kind, 0..0, Vec::new()))
}

fn open_until(
    frames: &mut Vec<Frame>,
    pending: &mut std::iter::Peekable<std::vec::IntoIter<Production>>,
    offset: usize,
) {
    loop {
        while frames.len() > 1 && frames.last().is_some_and(|top| top.range.end <= offset) {
            close_top(frames);
        }
        match pending.peek() {
            Some(next) if next.range.start <= offset => {
                let Some(production) = pending.next() else {
                    break;
                };
                let Some(parent) = frames.last() else {
                    break;
                };
                let start = production.range.start.max(parent.range.start);
                let end = production.range.end.min(parent.range.end).max(start);
                frames.push(Frame::new(production.kind, start..end));
            }
            _ => break,
        }
    }
}

fn close_top(frames: &mut Vec<Frame>) {
    if let Some(frame) = frames.pop()
        && let Some(parent) = frames.last_mut()
    {
        parent.children.push(frame.into_node());
    }
}

/// Cuts `token` at every boundary strictly inside it.
fn split_at(token: Token, boundaries: &[usize]) -> Vec<Token> {
    let first = boundaries.partition_point(|offset| *offset <= token.start);
    let mut pieces = Vec::new();
    let mut start = token.start;
    for offset in &boundaries[first..] {
        if *offset >= token.end {
            break;
        }
        pieces.push(Token::new(token.kind, start, *offset));
        start = *offset;
    }
    pieces.push(Token::new(token.kind, start, token.end));
    pieces
}
