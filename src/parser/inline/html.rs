//! Raw inline HTML: tags, comments, processing instructions, declarations
//! and CDATA sections.
use std::ops::RangeInclusive;

use lazy_static::lazy_static;
use regex::Regex;

use crate::element::{tokens, types};
use crate::parser::sequential::{
    Claim, ParseContext, ParsingResult, SequentialNode, indices, partition, position_of,
};
use crate::parser::token_cache::TokenCache;

use super::link::{in_link_tail, link_tails};

lazy_static! {
    static ref RAW_HTML: Regex = Regex::new(concat!(
        r#"^(?:"#,
        r#"<[A-Za-z][A-Za-z0-9-]*"#,
        r#"(?:\s+[A-Za-z_:][A-Za-z0-9_.:-]*(?:\s*=\s*(?:[^\s"'=<>`]+|'[^']*'|"[^"]*"))?)*"#,
        r#"\s*/?>"#,
        r#"|</[A-Za-z][A-Za-z0-9-]*\s*>"#,
        r#"|<!-->|<!--->|<!--(?s:.*?)-->"#,
        r#"|<\?(?s:.*?)\?>"#,
        r#"|<![A-Za-z][^>]*>"#,
        r#"|<!\[CDATA\[(?s:.*?)\]\]>"#,
        r#")"#
    ))
    .unwrap();
}

/// Length of the raw HTML construct at the start of `input`.
pub(crate) fn raw_html_len(input: &str) -> Option<usize> {
    RAW_HTML.find(input).map(|found| found.end())
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
        let Some(length) = raw_html_len(cache.text_from(index)) else {
            continue;
        };
        let Some(last) = cache
            .index_ending_at(cache.start(index) + length)
            .filter(|last| cache.kind(*last) == Some(tokens::GT))
        else {
            continue;
        };
        let Some(last_position) = position_of(&indices, last) else {
            continue;
        };

        nodes.push(SequentialNode::new(types::INLINE_HTML, index..=last));
        claims.push(Claim::whole(index..=last));
        position = last_position + 1;
    }

    ParsingResult {
        further: partition(&indices, &claims),
        nodes,
    }
}
