//! Character references and backslash escapes.
use std::collections::HashMap;

use entities::ENTITIES;
use lazy_static::lazy_static;

lazy_static! {
    /// HTML5 named references with their terminating `;`, keyed by the
    /// full reference (`&amp;`).
    static ref NAMED_ENTITIES: HashMap<&'static str, &'static str> = ENTITIES
        .iter()
        .filter(|entity| entity.entity.ends_with(';'))
        .map(|entity| (entity.entity, entity.characters))
        .collect();
}

/// Decodes a complete reference such as `&amp;`, `&#35;` or `&#x22;`.
///
/// Numeric references outside the Unicode scalar range (and `&#0;`) decode to
/// U+FFFD. Unknown names return `None`.
pub fn decode_entity(reference: &str) -> Option<String> {
    let body = reference.strip_prefix('&')?.strip_suffix(';')?;
    if let Some(number) = body.strip_prefix('#') {
        let value = match number.strip_prefix(['x', 'X']) {
            Some(hex) if (1..=6).contains(&hex.len()) => u32::from_str_radix(hex, 16).ok()?,
            None if (1..=7).contains(&number.len()) => number.parse::<u32>().ok()?,
            _ => return None,
        };
        let decoded = match value {
            0 => '\u{fffd}',
            _ => char::from_u32(value).unwrap_or('\u{fffd}'),
        };
        return Some(decoded.to_string());
    }

    NAMED_ENTITIES
        .get(reference)
        .map(|value| (*value).to_string())
}

/// Resolves backslash escapes of ASCII punctuation and decodable character
/// references.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(index) = rest.find(['\\', '&']) {
        out.push_str(&rest[..index]);
        rest = &rest[index..];

        if let Some(after) = rest.strip_prefix('\\') {
            match after.chars().next() {
                Some(c) if c.is_ascii_punctuation() => {
                    out.push(c);
                    rest = &after[c.len_utf8()..];
                }
                _ => {
                    out.push('\\');
                    rest = after;
                }
            }
            continue;
        }

        let decoded = rest
            .find(';')
            .filter(|end| *end <= 33)
            .and_then(|end| decode_entity(&rest[..=end]).map(|value| (value, end)));
        match decoded {
            Some((value, end)) => {
                out.push_str(&value);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}
