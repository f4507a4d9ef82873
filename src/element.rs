//! Element type registry.
//!
//! Every token and node in a parsed document is tagged with an [`ElementType`].
//! Token types are produced by the lexer (or by block/inline parsers retyping
//! lexer output) and never have children; composite types always do.
//!
//! The registry is the set of constants in [`types`] and [`tokens`]. Flavours
//! may define further types with [`ElementType::composite`] and
//! [`ElementType::token`] in `const` position.
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Serialize, Serializer};

/// Whether an element type tags leaf tokens or composite nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Token,
    Composite,
}

/// Interned tag identifying a token or node kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementType {
    name: &'static str,
    kind: ElementKind,
}

impl ElementType {
    pub const fn token(name: &'static str) -> Self {
        Self {
            name,
            kind: ElementKind::Token,
        }
    }

    pub const fn composite(name: &'static str) -> Self {
        Self {
            name,
            kind: ElementKind::Composite,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn is_token(&self) -> bool {
        self.kind == ElementKind::Token
    }

    pub fn is_composite(&self) -> bool {
        self.kind == ElementKind::Composite
    }
}

impl fmt::Debug for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ElementKind::Token => write!(f, "token:{}", self.name),
            ElementKind::Composite => write!(f, "{}", self.name),
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(feature = "serde")]
impl Serialize for ElementType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}

/// Composite node types.
pub mod types {
    use super::ElementType;

    pub const MARKDOWN_FILE: ElementType = ElementType::composite("MARKDOWN_FILE");
    pub const PARAGRAPH: ElementType = ElementType::composite("PARAGRAPH");
    pub const BLOCK_QUOTE: ElementType = ElementType::composite("BLOCK_QUOTE");
    pub const UNORDERED_LIST: ElementType = ElementType::composite("UNORDERED_LIST");
    pub const ORDERED_LIST: ElementType = ElementType::composite("ORDERED_LIST");
    pub const LIST_ITEM: ElementType = ElementType::composite("LIST_ITEM");

    pub const ATX_1: ElementType = ElementType::composite("ATX_1");
    pub const ATX_2: ElementType = ElementType::composite("ATX_2");
    pub const ATX_3: ElementType = ElementType::composite("ATX_3");
    pub const ATX_4: ElementType = ElementType::composite("ATX_4");
    pub const ATX_5: ElementType = ElementType::composite("ATX_5");
    pub const ATX_6: ElementType = ElementType::composite("ATX_6");
    pub const SETEXT_1: ElementType = ElementType::composite("SETEXT_1");
    pub const SETEXT_2: ElementType = ElementType::composite("SETEXT_2");
    pub const ATX_CONTENT: ElementType = ElementType::composite("ATX_CONTENT");
    pub const SETEXT_CONTENT: ElementType = ElementType::composite("SETEXT_CONTENT");

    pub const CODE_FENCE: ElementType = ElementType::composite("CODE_FENCE");
    pub const CODE_BLOCK: ElementType = ElementType::composite("CODE_BLOCK");
    pub const HTML_BLOCK: ElementType = ElementType::composite("HTML_BLOCK");
    pub const LINK_DEFINITION: ElementType = ElementType::composite("LINK_DEFINITION");

    pub const EMPH: ElementType = ElementType::composite("EMPH");
    pub const STRONG: ElementType = ElementType::composite("STRONG");
    pub const STRIKETHROUGH: ElementType = ElementType::composite("STRIKETHROUGH");
    pub const CODE_SPAN: ElementType = ElementType::composite("CODE_SPAN");
    pub const INLINE_LINK: ElementType = ElementType::composite("INLINE_LINK");
    pub const FULL_REFERENCE_LINK: ElementType = ElementType::composite("FULL_REFERENCE_LINK");
    pub const SHORT_REFERENCE_LINK: ElementType = ElementType::composite("SHORT_REFERENCE_LINK");
    pub const LINK_TEXT: ElementType = ElementType::composite("LINK_TEXT");
    pub const LINK_LABEL: ElementType = ElementType::composite("LINK_LABEL");
    pub const LINK_DESTINATION: ElementType = ElementType::composite("LINK_DESTINATION");
    pub const LINK_TITLE: ElementType = ElementType::composite("LINK_TITLE");
    pub const IMAGE: ElementType = ElementType::composite("IMAGE");
    pub const AUTOLINK: ElementType = ElementType::composite("AUTOLINK");
    pub const INLINE_HTML: ElementType = ElementType::composite("INLINE_HTML");
    pub const HARD_LINE_BREAK: ElementType = ElementType::composite("HARD_LINE_BREAK");

    /// Heading composite for an ATX level (clamped to 1..=6).
    pub fn atx(level: usize) -> ElementType {
        match level {
            0 | 1 => ATX_1,
            2 => ATX_2,
            3 => ATX_3,
            4 => ATX_4,
            5 => ATX_5,
            _ => ATX_6,
        }
    }
}

/// Leaf token types.
pub mod tokens {
    use super::ElementType;

    pub const TEXT: ElementType = ElementType::token("TEXT");
    pub const WHITE_SPACE: ElementType = ElementType::token("WHITE_SPACE");
    pub const EOL: ElementType = ElementType::token("EOL");

    // Block structure markers, assigned by the marker processor.
    pub const BLOCK_QUOTE: ElementType = ElementType::token("BLOCK_QUOTE");
    pub const LIST_BULLET: ElementType = ElementType::token("LIST_BULLET");
    pub const LIST_NUMBER: ElementType = ElementType::token("LIST_NUMBER");
    pub const ATX_HEADER: ElementType = ElementType::token("ATX_HEADER");
    pub const SETEXT_1: ElementType = ElementType::token("SETEXT_1");
    pub const SETEXT_2: ElementType = ElementType::token("SETEXT_2");
    pub const HORIZONTAL_RULE: ElementType = ElementType::token("HORIZONTAL_RULE");
    pub const CODE_FENCE_START: ElementType = ElementType::token("CODE_FENCE_START");
    pub const CODE_FENCE_END: ElementType = ElementType::token("CODE_FENCE_END");
    pub const FENCE_LANG: ElementType = ElementType::token("FENCE_LANG");
    pub const CODE_FENCE_CONTENT: ElementType = ElementType::token("CODE_FENCE_CONTENT");
    pub const CODE_LINE: ElementType = ElementType::token("CODE_LINE");
    pub const HTML_BLOCK_CONTENT: ElementType = ElementType::token("HTML_BLOCK_CONTENT");

    // Inline tokens.
    pub const EMPH: ElementType = ElementType::token("EMPH");
    pub const TILDE: ElementType = ElementType::token("TILDE");
    pub const BACKTICK: ElementType = ElementType::token("BACKTICK");
    pub const ESCAPED_BACKTICKS: ElementType = ElementType::token("ESCAPED_BACKTICKS");
    pub const ESCAPED_CHAR: ElementType = ElementType::token("ESCAPED_CHAR");
    pub const BACKSLASH: ElementType = ElementType::token("BACKSLASH");
    pub const ENTITY: ElementType = ElementType::token("ENTITY");
    pub const LBRACKET: ElementType = ElementType::token("LBRACKET");
    pub const RBRACKET: ElementType = ElementType::token("RBRACKET");
    pub const LPAREN: ElementType = ElementType::token("LPAREN");
    pub const RPAREN: ElementType = ElementType::token("RPAREN");
    pub const EXCLAMATION_MARK: ElementType = ElementType::token("EXCLAMATION_MARK");
    pub const LT: ElementType = ElementType::token("LT");
    pub const GT: ElementType = ElementType::token("GT");
    pub const COLON: ElementType = ElementType::token("COLON");
    pub const SINGLE_QUOTE: ElementType = ElementType::token("SINGLE_QUOTE");
    pub const DOUBLE_QUOTE: ElementType = ElementType::token("DOUBLE_QUOTE");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_different_kind_are_distinct() {
        assert_ne!(types::BLOCK_QUOTE, tokens::BLOCK_QUOTE);
        assert_eq!(types::BLOCK_QUOTE.name(), tokens::BLOCK_QUOTE.name());
        assert!(tokens::BLOCK_QUOTE.is_token());
        assert!(types::BLOCK_QUOTE.is_composite());
    }

    #[test]
    fn atx_levels_are_clamped() {
        assert_eq!(types::atx(1), types::ATX_1);
        assert_eq!(types::atx(6), types::ATX_6);
        assert_eq!(types::atx(9), types::ATX_6);
    }

    #[test]
    fn debug_marks_tokens() {
        assert_eq!(format!("{:?}", tokens::EOL), "token:EOL");
        assert_eq!(format!("{:?}", types::PARAGRAPH), "PARAGRAPH");
    }
}
