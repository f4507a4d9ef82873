//! Emphasis and strong emphasis with `*` and `_`.
//!
//! Delimiter runs are classified by the flanking rules and then paired from
//! the innermost closer outwards. Openers give up their rightmost delimiters
//! and closers their leftmost, so `***a***` becomes `<em><strong>a</strong></em>`.
use std::ops::RangeInclusive;

use crate::element::{tokens, types};
use crate::parser::char_class::{is_punctuation, is_whitespace};
use crate::parser::sequential::{ParseContext, ParsingResult, SequentialNode, indices};
use crate::parser::token_cache::TokenCache;

/// Flanking of a delimiter run, from the characters around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Flanking {
    pub left: bool,
    pub right: bool,
}

impl Flanking {
    pub(crate) fn classify(before: Option<char>, after: Option<char>) -> Self {
        let left = !is_whitespace(after)
            && (!is_punctuation(after) || is_whitespace(before) || is_punctuation(before));
        let right = !is_whitespace(before)
            && (!is_punctuation(before) || is_whitespace(after) || is_punctuation(after));
        Self { left, right }
    }
}

#[derive(Debug)]
struct Delimiter {
    marker: char,
    /// Token indices of the run.
    tokens: Vec<usize>,
    /// Unused tokens are `tokens[lo..hi]`.
    lo: usize,
    hi: usize,
    can_open: bool,
    can_close: bool,
}

impl Delimiter {
    fn remaining(&self) -> usize {
        self.hi - self.lo
    }

    fn deactivate(&mut self) {
        self.lo = self.hi;
    }
}

/// Groups adjacent EMPH tokens with the same character into runs.
fn delimiter_runs(cache: &TokenCache<'_>, indices: &[usize]) -> Vec<Delimiter> {
    let mut runs: Vec<Delimiter> = Vec::new();
    let mut previous: Option<usize> = None;

    for &index in indices {
        if cache.kind(index) != Some(tokens::EMPH) {
            previous = None;
            continue;
        }
        let Some(marker) = cache.token_text(index).chars().next() else {
            continue;
        };
        let extends = previous.is_some_and(|previous| {
            previous + 1 == index && cache.end(previous) == cache.start(index)
        });
        match runs.last_mut() {
            Some(run) if extends && run.marker == marker => {
                run.tokens.push(index);
                run.hi += 1;
            }
            _ => runs.push(Delimiter {
                marker,
                tokens: vec![index],
                lo: 0,
                hi: 1,
                can_open: false,
                can_close: false,
            }),
        }
        previous = Some(index);
    }

    for run in &mut runs {
        let first = run.tokens[0];
        let last = run.tokens[run.tokens.len() - 1];
        let before = cache.char_before(cache.start(first));
        let after = cache.char_at(cache.end(last));
        let flanking = Flanking::classify(before, after);
        if run.marker == '_' {
            run.can_open = flanking.left && (!flanking.right || is_punctuation(before));
            run.can_close = flanking.right && (!flanking.left || is_punctuation(after));
        } else {
            run.can_open = flanking.left;
            run.can_close = flanking.right;
        }
    }
    runs
}

pub(crate) fn parse(
    cache: &TokenCache<'_>,
    list: &[RangeInclusive<usize>],
    _context: &ParseContext<'_>,
) -> ParsingResult {
    let mut delimiters = delimiter_runs(cache, &indices(list));
    let mut nodes = Vec::new();
    let originals: Vec<usize> = delimiters.iter().map(|d| d.tokens.len()).collect();

    // Lowest opener index worth searching, by marker, closer's ability to
    // open and original run length modulo 3.
    let mut bottoms = [[[0usize; 3]; 2]; 2];
    let mut closer = 0;

    while closer < delimiters.len() {
        if !delimiters[closer].can_close || delimiters[closer].remaining() == 0 {
            closer += 1;
            continue;
        }

        let marker = delimiters[closer].marker;
        let slot = (
            usize::from(marker == '_'),
            usize::from(delimiters[closer].can_open),
            originals[closer] % 3,
        );
        let bottom = bottoms[slot.0][slot.1][slot.2];

        let mut found = None;
        let mut candidate = closer;
        while candidate > bottom {
            candidate -= 1;
            let opener = &delimiters[candidate];
            if opener.marker != marker || !opener.can_open || opener.remaining() == 0 {
                continue;
            }
            let both_sided = opener.can_close || delimiters[closer].can_open;
            let sum = originals[candidate] + originals[closer];
            if both_sided
                && sum % 3 == 0
                && !(originals[candidate] % 3 == 0 && originals[closer] % 3 == 0)
            {
                continue;
            }
            found = Some(candidate);
            break;
        }

        let Some(opener) = found else {
            bottoms[slot.0][slot.1][slot.2] = closer;
            if !delimiters[closer].can_open {
                delimiters[closer].deactivate();
            }
            closer += 1;
            continue;
        };

        let used = if delimiters[opener].remaining() >= 2 && delimiters[closer].remaining() >= 2 {
            2
        } else {
            1
        };
        let first = {
            let opener = &mut delimiters[opener];
            opener.hi -= used;
            opener.tokens[opener.hi]
        };
        let last = {
            let closer = &mut delimiters[closer];
            closer.lo += used;
            closer.tokens[closer.lo - 1]
        };
        let kind = if used == 2 { types::STRONG } else { types::EMPH };
        nodes.push(SequentialNode::new(kind, first..=last));

        for between in &mut delimiters[opener + 1..closer] {
            between.deactivate();
        }
        if delimiters[closer].remaining() == 0 {
            closer += 1;
        }
    }

    ParsingResult {
        nodes,
        further: vec![list.to_vec()],
    }
}
