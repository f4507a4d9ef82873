//! Reference definitions, keyed by normalized label.
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::debug;

use crate::ast::AstNode;
use crate::element::{tokens, types};

use super::link_syntax::{destination_text, label_text, title_text};

/// Target of a reference definition, with escapes and entities resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInfo {
    pub destination: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LinkMap {
    entries: HashMap<String, LinkInfo>,
}

/// Trims, collapses inner whitespace runs to one space and case-folds.
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .to_uppercase()
}

impl LinkMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects every LINK_DEFINITION below `root`. The first definition of a
    /// label wins.
    pub fn from_tree(text: &str, root: &AstNode) -> Self {
        let mut map = Self::new();
        let mut ignored = 0;

        for definition in root
            .descendants()
            .filter(|node| node.kind() == types::LINK_DEFINITION)
        {
            let (Some(label), Some(destination)) = (
                definition.find_child(types::LINK_LABEL),
                definition.find_child(types::LINK_DESTINATION),
            ) else {
                continue;
            };
            let info = LinkInfo {
                destination: destination_text(&content_text(text, destination)),
                title: definition
                    .find_child(types::LINK_TITLE)
                    .map(|title| title_text(&content_text(text, title))),
            };
            if !map.insert(label_text(&content_text(text, label)), info) {
                ignored += 1;
            }
        }

        debug!(definitions = map.len(), duplicates = ignored, "link map built");
        map
    }

    /// Adds a definition unless its label is already taken. Returns whether
    /// it was added.
    pub fn insert(&mut self, label: &str, info: LinkInfo) -> bool {
        let key = normalize_label(label);
        if key.is_empty() {
            return false;
        }
        match self.entries.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(info);
                true
            }
        }
    }

    pub fn get(&self, label: &str) -> Option<&LinkInfo> {
        self.entries.get(&normalize_label(label))
    }

    pub fn contains(&self, label: &str) -> bool {
        self.get(label).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Text of `node` without block-quote markers and without the indentation
/// that follows a line ending.
pub(crate) fn content_text(text: &str, node: &AstNode) -> String {
    let mut out = String::new();
    let mut line_start = false;

    for leaf in node.descendants().filter(|n| n.is_leaf()) {
        let kind = leaf.kind();
        if kind == tokens::BLOCK_QUOTE {
            continue;
        }
        if kind == tokens::WHITE_SPACE && line_start {
            continue;
        }
        line_start = kind == tokens::EOL;
        out.push_str(leaf.text(text));
    }
    out
}
