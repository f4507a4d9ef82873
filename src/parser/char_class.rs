//! Character classes used by the delimiter flanking rules.
use unicode_categories::UnicodeCategories;

/// Unicode whitespace as the flanking rules see it. Line boundaries and the
/// edges of an inline span count as whitespace, so callers map `None` to
/// `true`.
pub fn is_whitespace(c: Option<char>) -> bool {
    match c {
        None => true,
        Some(c) => c.is_whitespace(),
    }
}

/// ASCII punctuation or any character in a Unicode punctuation (P*) or
/// symbol (S*) category.
pub fn is_punctuation(c: Option<char>) -> bool {
    match c {
        None => false,
        Some(c) => c.is_ascii_punctuation() || c.is_punctuation() || c.is_symbol(),
    }
}
