//! Link grammar shared by reference definitions and inline links.
//!
//! All matchers return byte offsets relative to the input they were given.
use std::ops::Range;

use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while};
use nom::combinator::{not, opt, recognize};
use nom::error::{Error, ErrorKind};
use nom::sequence::{pair, preceded, tuple};

use crate::entities::unescape;

const MAX_LABEL_CHARS: usize = 999;
const MAX_PAREN_DEPTH: usize = 32;

/// A `[label]: destination "title"` definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DefinitionMatch {
    pub label: Range<usize>,
    pub destination: Range<usize>,
    pub title: Option<Range<usize>>,
    /// End of the definition's last line, before its line ending.
    pub end: usize,
}

/// The `(destination "title")` tail of an inline link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InlineLinkTail {
    pub destination: Option<Range<usize>>,
    pub title: Option<Range<usize>>,
    /// Offset just past the closing parenthesis.
    pub end: usize,
}

fn fail(input: &str) -> nom::Err<Error<&str>> {
    nom::Err::Error(Error::new(input, ErrorKind::Verify))
}

fn offset(input: &str, rest: &str) -> usize {
    input.len() - rest.len()
}

fn spaces(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| c == ' ' || c == '\t')(input)
}

fn line_ending(input: &str) -> IResult<&str, &str> {
    alt((tag("\r\n"), tag("\n"), tag("\r")))(input)
}

/// Optional spaces, at most one line ending, optional spaces.
fn spnl(input: &str) -> IResult<&str, &str> {
    recognize(tuple((spaces, opt(pair(line_ending, spaces)))))(input)
}

/// `[label]`: no unescaped brackets, at most 999 characters, not blank.
pub(crate) fn link_label(input: &str) -> IResult<&str, &str> {
    let body = input.strip_prefix('[').ok_or_else(|| fail(input))?;
    let mut chars = body.char_indices();
    let mut count = 0;

    while let Some((index, c)) = chars.next() {
        count += 1;
        if count > MAX_LABEL_CHARS {
            return Err(fail(input));
        }
        match c {
            '\\' => {
                if chars.clone().next().is_some_and(|(_, next)| next.is_ascii_punctuation()) {
                    chars.next();
                }
            }
            '[' => return Err(fail(input)),
            ']' => {
                if body[..index].trim().is_empty() {
                    return Err(fail(input));
                }
                let len = index + 2;
                return Ok((&input[len..], &input[..len]));
            }
            _ => {}
        }
    }
    Err(fail(input))
}

/// `<…>` destination, brackets included in the match.
fn angle_destination(input: &str) -> IResult<&str, &str> {
    let body = input.strip_prefix('<').ok_or_else(|| fail(input))?;
    let mut chars = body.char_indices();

    while let Some((index, c)) = chars.next() {
        match c {
            '\\' => {
                if chars.clone().next().is_some_and(|(_, next)| next.is_ascii_punctuation()) {
                    chars.next();
                }
            }
            '>' => {
                let len = index + 2;
                return Ok((&input[len..], &input[..len]));
            }
            '<' | '\n' | '\r' => return Err(fail(input)),
            _ => {}
        }
    }
    Err(fail(input))
}

/// Destination without angle brackets: no spaces or control characters,
/// parentheses balanced.
fn bare_destination(input: &str) -> IResult<&str, &str> {
    let mut depth = 0usize;
    let mut end = input.len();
    let mut chars = input.char_indices();

    while let Some((index, c)) = chars.next() {
        match c {
            '\\' => {
                if chars.clone().next().is_some_and(|(_, next)| next.is_ascii_punctuation()) {
                    chars.next();
                }
            }
            '(' => {
                depth += 1;
                if depth > MAX_PAREN_DEPTH {
                    return Err(fail(input));
                }
            }
            ')' if depth == 0 => {
                end = index;
                break;
            }
            ')' => depth -= 1,
            c if c == ' ' || c.is_ascii_control() => {
                end = index;
                break;
            }
            _ => {}
        }
    }

    if end == 0 || depth != 0 {
        return Err(fail(input));
    }
    Ok((&input[end..], &input[..end]))
}

/// An unclosed `<` never falls back to the bare form.
fn link_destination(input: &str) -> IResult<&str, &str> {
    alt((angle_destination, preceded(not(tag("<")), bare_destination)))(input)
}

/// `"title"`, `'title'` or `(title)`, delimiters included. Titles may span
/// lines but never contain a blank line.
pub(crate) fn link_title(input: &str) -> IResult<&str, &str> {
    let close = match input.chars().next() {
        Some('"') => '"',
        Some('\'') => '\'',
        Some('(') => ')',
        _ => return Err(fail(input)),
    };
    let body = &input[1..];
    let mut chars = body.char_indices();

    while let Some((index, c)) = chars.next() {
        match c {
            '\\' => {
                if chars.clone().next().is_some_and(|(_, next)| next.is_ascii_punctuation()) {
                    chars.next();
                }
            }
            c if c == close => {
                let len = index + 2;
                return Ok((&input[len..], &input[..len]));
            }
            '(' if close == ')' => return Err(fail(input)),
            '\n' | '\r' => {
                let next_line = body[index + 1..].trim_start_matches([' ', '\t']);
                if next_line.is_empty() || next_line.starts_with(['\n', '\r']) {
                    return Err(fail(input));
                }
            }
            _ => {}
        }
    }
    Err(fail(input))
}

/// Number of bytes of trailing spaces if `input` is blank up to the next
/// line ending (or its end).
fn blank_to_line_end(input: &str) -> Option<usize> {
    let (rest, spaces) = spaces(input).ok()?;
    (rest.is_empty() || rest.starts_with(['\n', '\r'])).then_some(spaces.len())
}

/// Matches one reference definition at the start of `input`.
pub(crate) fn link_definition(input: &str) -> Option<DefinitionMatch> {
    let (rest, label) = link_label(input).ok()?;
    let rest = rest.strip_prefix(':')?;
    let (rest, _) = spnl(rest).ok()?;

    let destination_start = offset(input, rest);
    let (rest, destination) = link_destination(rest).ok()?;
    let destination = destination_start..destination_start + destination.len();

    if let Ok((after_space, separator)) = spnl(rest)
        && !separator.is_empty()
        && let Ok((after_title, title)) = link_title(after_space)
        && let Some(trailing) = blank_to_line_end(after_title)
    {
        let title_start = offset(input, after_space);
        return Some(DefinitionMatch {
            label: 0..label.len(),
            destination,
            title: Some(title_start..title_start + title.len()),
            end: offset(input, after_title) + trailing,
        });
    }

    let trailing = blank_to_line_end(rest)?;
    Some(DefinitionMatch {
        label: 0..label.len(),
        destination,
        title: None,
        end: offset(input, rest) + trailing,
    })
}

/// Matches `(destination "title")` at the start of `input`.
pub(crate) fn inline_link_tail(input: &str) -> Option<InlineLinkTail> {
    let rest = input.strip_prefix('(')?;
    let (rest, _) = spnl(rest).ok()?;
    if let Some(rest) = rest.strip_prefix(')') {
        return Some(InlineLinkTail {
            destination: None,
            title: None,
            end: offset(input, rest),
        });
    }

    let destination_start = offset(input, rest);
    let (rest, destination) = link_destination(rest).ok()?;
    let destination = Some(destination_start..destination_start + destination.len());

    let (mut rest, separator) = spnl(rest).ok()?;
    let mut title = None;
    if !separator.is_empty()
        && let Ok((after_title, raw_title)) = link_title(rest)
    {
        let title_start = offset(input, rest);
        title = Some(title_start..title_start + raw_title.len());
        rest = spnl(after_title).ok()?.0;
    }

    let rest = rest.strip_prefix(')')?;
    Some(InlineLinkTail {
        destination,
        title,
        end: offset(input, rest),
    })
}

/// Destination text with angle brackets removed and escapes resolved.
pub fn destination_text(raw: &str) -> String {
    let inner = raw
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(raw);
    unescape(inner)
}

/// Title text with delimiters removed and escapes resolved.
pub fn title_text(raw: &str) -> String {
    let mut chars = raw.chars();
    chars.next();
    chars.next_back();
    unescape(chars.as_str())
}

/// Label text between the brackets, unnormalized.
pub fn label_text(raw: &str) -> &str {
    raw.strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_with_title() {
        let input = "[Foo Bar]: /url \"title\"  \nrest";
        let def = link_definition(input).expect("definition");
        assert_eq!(&input[def.label.clone()], "[Foo Bar]");
        assert_eq!(&input[def.destination.clone()], "/url");
        assert_eq!(def.title.map(|t| &input[t]), Some("\"title\""));
        assert_eq!(&input[def.end..], "\nrest");
    }

    #[test]
    fn definition_title_on_next_line() {
        let input = "[a]:\n<b c>\n'd'";
        let def = link_definition(input).expect("definition");
        assert_eq!(&input[def.destination.clone()], "<b c>");
        assert_eq!(def.title.map(|t| &input[t]), Some("'d'"));
        assert_eq!(def.end, input.len());
    }

    #[test]
    fn definition_rejects_trailing_garbage() {
        assert!(link_definition("[a]: /u \"t\" x").is_none());
        assert!(link_definition("[a]: /u x").is_none());
        assert!(link_definition("[a]:").is_none());
        assert!(link_definition("[]: /u").is_none());
    }

    #[test]
    fn definition_falls_back_when_title_line_is_not_a_title() {
        let input = "[a]: /u\n\"unterminated";
        let def = link_definition(input).expect("definition");
        assert!(def.title.is_none());
        assert_eq!(def.end, 7);
    }

    #[test]
    fn inline_tail_variants() {
        let tail = inline_link_tail("(/u \"t\") more").expect("tail");
        assert_eq!(tail.destination, Some(1..3));
        assert_eq!(tail.title, Some(4..7));
        assert_eq!(tail.end, 8);

        let empty = inline_link_tail("()").expect("empty tail");
        assert_eq!((empty.destination, empty.end), (None, 2));

        let nested = inline_link_tail("(a(b)c)").expect("balanced parens");
        assert_eq!(nested.destination, Some(1..6));

        assert!(inline_link_tail("(not a uri)").is_none());
        assert_eq!(
            inline_link_tail("(<not a uri>)").and_then(|t| t.destination),
            Some(1..12)
        );
    }

    #[test]
    fn unclosed_angle_destination_is_rejected() {
        assert!(inline_link_tail("(<b)c").is_none());
        assert!(inline_link_tail(r"(<foo\>)").is_none());
        assert!(link_definition("[a]: <b").is_none());
        assert_eq!(
            inline_link_tail("(<url>)").and_then(|t| t.destination),
            Some(1..6)
        );
    }

    #[test]
    fn titles_cannot_contain_blank_lines() {
        assert!(link_title("\"a\n\nb\"").is_err());
        assert!(link_title("\"a\nb\"").is_ok());
        assert!(link_title("(a(b)").is_err());
    }

    #[test]
    fn text_helpers() {
        assert_eq!(destination_text("<a b>"), "a b");
        assert_eq!(destination_text(r"/u\*"), "/u*");
        assert_eq!(title_text("\"a &amp; b\""), "a & b");
        assert_eq!(label_text("[Foo]"), "Foo");
    }
}
