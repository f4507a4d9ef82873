//! Abstract syntax tree.
//!
//! A parsed document is a tree of [`AstNode`]s over the source text. Nodes
//! hold byte ranges only, so a tree is meaningless without the buffer it was
//! parsed from; [`Document`] ties the two together. Composites exclusively own
//! their children and the children of every composite tile its range exactly.
//! Trees are immutable once returned from parsing.
use std::ops::Range;

use crate::element::{ElementType, types};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Leaf node: a typed range with no children.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct LeafNode {
    pub kind: ElementType,
    pub range: Range<usize>,
}

/// Composite node with ordered, owned children.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct CompositeNode {
    pub kind: ElementType,
    pub range: Range<usize>,
    pub children: Vec<AstNode>,
}

/// List composite carrying its looseness, computed once when the list is built.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ListCompositeNode {
    pub kind: ElementType,
    pub range: Range<usize>,
    pub children: Vec<AstNode>,
    pub loose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum AstNode {
    Leaf(LeafNode),
    Composite(CompositeNode),
    List(ListCompositeNode),
}

impl AstNode {
    pub fn leaf(kind: ElementType, range: Range<usize>) -> Self {
        AstNode::Leaf(LeafNode { kind, range })
    }

    /// Creates a composite, promoting list types to [`AstNode::List`].
    pub fn composite(kind: ElementType, range: Range<usize>, children: Vec<AstNode>) -> Self {
        if kind == types::UNORDERED_LIST || kind == types::ORDERED_LIST {
            let loose = is_loose(&children);
            AstNode::List(ListCompositeNode {
                kind,
                range,
                children,
                loose,
            })
        } else {
            AstNode::Composite(CompositeNode {
                kind,
                range,
                children,
            })
        }
    }

    pub fn kind(&self) -> ElementType {
        match self {
            AstNode::Leaf(node) => node.kind,
            AstNode::Composite(node) => node.kind,
            AstNode::List(node) => node.kind,
        }
    }

    pub fn range(&self) -> Range<usize> {
        match self {
            AstNode::Leaf(node) => node.range.clone(),
            AstNode::Composite(node) => node.range.clone(),
            AstNode::List(node) => node.range.clone(),
        }
    }

    pub fn start(&self) -> usize {
        self.range().start
    }

    pub fn end(&self) -> usize {
        self.range().end
    }

    pub fn children(&self) -> &[AstNode] {
        match self {
            AstNode::Leaf(_) => &[],
            AstNode::Composite(node) => &node.children,
            AstNode::List(node) => &node.children,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<AstNode>> {
        match self {
            AstNode::Leaf(_) => None,
            AstNode::Composite(node) => Some(&mut node.children),
            AstNode::List(node) => Some(&mut node.children),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, AstNode::Leaf(_))
    }

    /// `Some(loose)` for list nodes, `None` otherwise.
    pub fn loose(&self) -> Option<bool> {
        match self {
            AstNode::List(node) => Some(node.loose),
            _ => None,
        }
    }

    /// The slice of `source` this node covers.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.range()).unwrap_or("")
    }

    pub fn find_child(&self, kind: ElementType) -> Option<&AstNode> {
        self.children().iter().find(|child| child.kind() == kind)
    }

    /// Pre-order traversal of this node and everything below it.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

/// Pre-order iterator driven by an explicit stack.
pub struct Descendants<'a> {
    stack: Vec<&'a AstNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a AstNode;

    fn next(&mut self) -> Option<&'a AstNode> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

/// Visitor over a document tree.
///
/// `enter` returning `false` skips the node's children; `leave` is still
/// called for it.
pub trait Visitor<'a> {
    fn enter(&mut self, node: &'a AstNode, depth: usize) -> bool;

    fn leave(&mut self, _node: &'a AstNode, _depth: usize) {}
}

/// A parsed document: the source text and the tree over it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Document<'a> {
    text: &'a str,
    root: AstNode,
    /// Code content that starts on a partly consumed tab, by offset, with
    /// the number of columns of the tab that belong to the content.
    tab_remainders: Vec<(usize, usize)>,
}

impl<'a> Document<'a> {
    pub(crate) fn new(text: &'a str, root: AstNode) -> Self {
        Self {
            text,
            root,
            tab_remainders: Vec::new(),
        }
    }

    pub(crate) fn with_tab_remainders(mut self, mut remainders: Vec<(usize, usize)>) -> Self {
        remainders.sort_unstable();
        self.tab_remainders = remainders;
        self
    }

    /// Columns of the tab at `offset` that count as content, when block
    /// structure consumed only part of it.
    pub fn tab_remainder(&self, offset: usize) -> Option<usize> {
        self.tab_remainders
            .binary_search_by_key(&offset, |(start, _)| *start)
            .ok()
            .map(|index| self.tab_remainders[index].1)
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn root(&self) -> &AstNode {
        &self.root
    }

    pub fn into_root(self) -> AstNode {
        self.root
    }

    /// The source slice covered by `node`.
    pub fn node_text(&self, node: &AstNode) -> &'a str {
        node.text(self.text)
    }

    pub fn descendants(&self) -> Descendants<'_> {
        self.root.descendants()
    }

    /// Drives `visitor` over the tree without recursion.
    pub fn accept<'d, V: Visitor<'d>>(&'d self, visitor: &mut V) {
        enum Step<'n> {
            Enter(&'n AstNode, usize),
            Leave(&'n AstNode, usize),
        }

        let mut work = vec![Step::Enter(&self.root, 0)];
        while let Some(step) = work.pop() {
            match step {
                Step::Enter(node, depth) => {
                    let descend = visitor.enter(node, depth);
                    work.push(Step::Leave(node, depth));
                    if descend {
                        for child in node.children().iter().rev() {
                            work.push(Step::Enter(child, depth + 1));
                        }
                    }
                }
                Step::Leave(node, depth) => visitor.leave(node, depth),
            }
        }
    }

    /// The chain of nodes whose range contains `offset`, outermost first.
    ///
    /// Intended for placing decorations by source position.
    pub fn nodes_at(&self, offset: usize) -> Vec<&AstNode> {
        let mut path = Vec::new();
        let mut current = &self.root;
        if !contains(&current.range(), offset) {
            return path;
        }
        loop {
            path.push(current);
            match current
                .children()
                .iter()
                .find(|child| contains(&child.range(), offset))
            {
                Some(child) => current = child,
                None => return path,
            }
        }
    }

    /// Checks the structural range invariants: every child lies inside its
    /// parent, siblings are ordered and disjoint, and no range leaves the
    /// source buffer.
    pub fn check_ranges(&self) -> Result<(), String> {
        let len = self.text.len();
        for node in self.descendants() {
            let range = node.range();
            if range.start > range.end || range.end > len {
                return Err(format!("{:?} range {:?} outside 0..{}", node.kind(), range, len));
            }
            let mut previous_end = range.start;
            for child in node.children() {
                let child_range = child.range();
                if child_range.start < previous_end || child_range.end > range.end {
                    return Err(format!(
                        "{:?} child {:?} at {:?} escapes parent {:?} or overlaps a sibling",
                        node.kind(),
                        child.kind(),
                        child_range,
                        range
                    ));
                }
                previous_end = child_range.end;
            }
        }
        Ok(())
    }
}

fn contains(range: &Range<usize>, offset: usize) -> bool {
    range.start <= offset && offset < range.end
}

/// Looseness of a list from its direct children.
///
/// A list is loose if a blank line separates two content children of the
/// list itself or of one of its items. Deeper blank lines do not count.
pub(crate) fn is_loose(children: &[AstNode]) -> bool {
    has_blank_line_between_content(children)
        || children
            .iter()
            .filter(|child| child.kind() == types::LIST_ITEM)
            .any(|item| has_blank_line_between_content(item.children()))
}

fn has_blank_line_between_content(children: &[AstNode]) -> bool {
    use crate::element::tokens;

    let mut seen_content = false;
    let mut eols = 0;
    let mut pending_blank = false;

    for child in children {
        let kind = child.kind();
        if kind == tokens::EOL {
            eols += 1;
            if eols >= 2 && seen_content {
                pending_blank = true;
            }
            continue;
        }
        if kind == tokens::WHITE_SPACE
            || kind == tokens::BLOCK_QUOTE
            || kind == tokens::LIST_BULLET
            || kind == tokens::LIST_NUMBER
        {
            continue;
        }
        if pending_blank {
            return true;
        }
        seen_content = true;
        eols = 0;
    }
    false
}
