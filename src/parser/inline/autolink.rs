//! Autolinks: `<scheme:target>` and `<user@example.com>`.
use std::ops::RangeInclusive;

use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::{take_while, take_while_m_n, take_while1};
use nom::character::complete::{char, satisfy};
use nom::combinator::{recognize, value};
use nom::error::{Error, ErrorKind};
use nom::multi::separated_list1;
use nom::sequence::{delimited, tuple};

use crate::element::{tokens, types};
use crate::parser::sequential::{
    Claim, ParseContext, ParsingResult, SequentialNode, indices, partition, position_of,
};
use crate::parser::token_cache::TokenCache;

use super::link::{in_link_tail, link_tails};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AutolinkKind {
    Uri,
    Email,
}

fn uri(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        satisfy(|c| c.is_ascii_alphabetic()),
        take_while_m_n(1, 31, |c: char| {
            c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-')
        }),
        char(':'),
        take_while(|c: char| !c.is_ascii_control() && !matches!(c, ' ' | '<' | '>')),
    )))(input)
}

fn domain_label(input: &str) -> IResult<&str, &str> {
    let (rest, label) = take_while_m_n(1, 63, |c: char| c.is_ascii_alphanumeric() || c == '-')(input)?;
    if label.starts_with('-') || label.ends_with('-') {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Verify)));
    }
    Ok((rest, label))
}

fn email(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        take_while1(|c: char| c.is_ascii_alphanumeric() || ".!#$%&'*+/=?^_`{|}~-".contains(c)),
        char('@'),
        separated_list1(char('.'), domain_label),
    )))(input)
}

/// An autolink at the start of `input`, angle brackets included.
pub(crate) fn autolink(input: &str) -> IResult<&str, AutolinkKind> {
    delimited(
        char('<'),
        alt((value(AutolinkKind::Uri, uri), value(AutolinkKind::Email, email))),
        char('>'),
    )(input)
}

pub(crate) fn parse(
    cache: &TokenCache<'_>,
    list: &[RangeInclusive<usize>],
    _context: &ParseContext<'_>,
) -> ParsingResult {
    let indices = indices(list);
    let tails = link_tails(cache, &indices);
    let mut nodes = Vec::new();
    let mut claims = Vec::new();
    let mut position = 0;

    while position < indices.len() {
        let index = indices[position];
        position += 1;
        if cache.kind(index) != Some(tokens::LT) || in_link_tail(&tails, cache.start(index)) {
            continue;
        }

        // Backslash escapes do not apply inside an autolink, so the closing
        // `>` may be the second half of an escape token.
        let input = cache.text_from(index);
        let Ok((rest, _)) = autolink(input) else {
            continue;
        };
        let end = cache.start(index) + input.len() - rest.len();
        let Some(last) = cache
            .index_ending_at(end)
            .filter(|last| cache.token_text(*last).ends_with('>'))
        else {
            continue;
        };
        let Some(last_position) = position_of(&indices, last) else {
            continue;
        };

        nodes.push(SequentialNode::new(types::AUTOLINK, index..=last));
        claims.push(Claim::whole(index..=last));
        position = last_position + 1;
    }

    ParsingResult {
        further: partition(&indices, &claims),
        nodes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(input: &str) -> Option<AutolinkKind> {
        autolink(input).ok().map(|(_, kind)| kind)
    }

    #[test]
    fn uris() {
        assert_eq!(kind("<http://foo.bar.baz/test?q=hello&id=22&boolean>"), Some(AutolinkKind::Uri));
        assert_eq!(kind("<irc://foo.bar:2233/baz>"), Some(AutolinkKind::Uri));
        assert_eq!(kind("<a+b+c:d>"), Some(AutolinkKind::Uri));
        assert_eq!(kind("<http://foo.bar/baz bim>"), None);
        assert_eq!(kind("<m:abc>"), None);
    }

    #[test]
    fn emails() {
        assert_eq!(kind("<foo@bar.example.com>"), Some(AutolinkKind::Email));
        assert_eq!(kind("<foo+special@Bar.baz-bar0.com>"), Some(AutolinkKind::Email));
        assert_eq!(kind("<foo@-bar.com>"), None);
    }
}
