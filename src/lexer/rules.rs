use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::{tag, tag_no_case, take_while_m_n, take_while1};
use nom::character::complete::{anychar, char, satisfy};
use nom::combinator::{map, recognize, value};
use nom::sequence::{pair, preceded, tuple};

use crate::element::{ElementType, tokens};

/// One token at block granularity: line endings, whitespace runs, and
/// everything else as TEXT runs.
pub(super) fn block_token(input: &str) -> IResult<&str, ElementType> {
    alt((parse_newline, parse_whitespace, parse_block_text, parse_any_char))(input)
}

/// One token at inline granularity.
pub(super) fn inline_token(input: &str) -> IResult<&str, ElementType> {
    alt((
        parse_newline,
        parse_whitespace,
        parse_escape,
        parse_backticks,
        parse_entity,
        parse_punctuation,
        parse_inline_text,
        parse_any_char,
    ))(input)
}

pub(super) fn parse_newline(input: &str) -> IResult<&str, ElementType> {
    value(tokens::EOL, alt((tag("\r\n"), tag("\n"), tag("\r"))))(input)
}

pub(super) fn parse_whitespace(input: &str) -> IResult<&str, ElementType> {
    value(tokens::WHITE_SPACE, take_while1(|c: char| c == ' ' || c == '\t'))(input)
}

fn parse_block_text(input: &str) -> IResult<&str, ElementType> {
    value(
        tokens::TEXT,
        take_while1(|c: char| !matches!(c, ' ' | '\t' | '\n' | '\r')),
    )(input)
}

fn parse_inline_text(input: &str) -> IResult<&str, ElementType> {
    value(
        tokens::TEXT,
        take_while1(|c: char| !matches!(c, ' ' | '\t' | '\n' | '\r') && !is_inline_special(c)),
    )(input)
}

fn parse_any_char(input: &str) -> IResult<&str, ElementType> {
    value(tokens::TEXT, anychar)(input)
}

pub(super) fn parse_escape(input: &str) -> IResult<&str, ElementType> {
    alt((
        value(
            tokens::ESCAPED_BACKTICKS,
            preceded(char('\\'), take_while1(|c: char| c == '`')),
        ),
        value(
            tokens::ESCAPED_CHAR,
            preceded(char('\\'), satisfy(|c| c.is_ascii_punctuation())),
        ),
        value(tokens::BACKSLASH, char('\\')),
    ))(input)
}

fn parse_backticks(input: &str) -> IResult<&str, ElementType> {
    value(tokens::BACKTICK, take_while1(|c: char| c == '`'))(input)
}

pub(super) fn parse_entity(input: &str) -> IResult<&str, ElementType> {
    value(
        tokens::ENTITY,
        recognize(tuple((
            char('&'),
            alt((
                recognize(pair(
                    tag_no_case("#x"),
                    take_while_m_n(1, 6, |c: char| c.is_ascii_hexdigit()),
                )),
                recognize(pair(
                    char('#'),
                    take_while_m_n(1, 7, |c: char| c.is_ascii_digit()),
                )),
                recognize(pair(
                    satisfy(|c| c.is_ascii_alphabetic()),
                    take_while_m_n(0, 31, |c: char| c.is_ascii_alphanumeric()),
                )),
            )),
            char(';'),
        ))),
    )(input)
}

fn parse_punctuation(input: &str) -> IResult<&str, ElementType> {
    map(satisfy(is_inline_special), punctuation_kind)(input)
}

fn punctuation_kind(c: char) -> ElementType {
    match c {
        '*' | '_' => tokens::EMPH,
        '~' => tokens::TILDE,
        '[' => tokens::LBRACKET,
        ']' => tokens::RBRACKET,
        '(' => tokens::LPAREN,
        ')' => tokens::RPAREN,
        '!' => tokens::EXCLAMATION_MARK,
        '<' => tokens::LT,
        '>' => tokens::GT,
        ':' => tokens::COLON,
        '\'' => tokens::SINGLE_QUOTE,
        '"' => tokens::DOUBLE_QUOTE,
        _ => tokens::TEXT,
    }
}

fn is_inline_special(c: char) -> bool {
    matches!(
        c,
        '\\' | '`'
            | '&'
            | '*'
            | '_'
            | '~'
            | '['
            | ']'
            | '('
            | ')'
            | '!'
            | '<'
            | '>'
            | ':'
            | '\''
            | '"'
    )
}
