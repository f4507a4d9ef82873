//! GFM strikethrough: `~text~` and `~~text~~`.
use std::ops::RangeInclusive;

use crate::element::{tokens, types};
use crate::parser::inline::emphasis::Flanking;
use crate::parser::sequential::{
    Claim, ParseContext, ParsingResult, SequentialNode, indices, partition,
};
use crate::parser::token_cache::TokenCache;

#[derive(Debug, Clone, Copy)]
struct TildeRun {
    first: usize,
    last: usize,
    length: usize,
    can_open: bool,
    can_close: bool,
}

fn tilde_runs(cache: &TokenCache<'_>, indices: &[usize]) -> Vec<TildeRun> {
    let mut runs: Vec<TildeRun> = Vec::new();
    let mut previous: Option<usize> = None;

    for &index in indices {
        if cache.kind(index) != Some(tokens::TILDE) {
            previous = None;
            continue;
        }
        let extends = previous.is_some_and(|previous| {
            previous + 1 == index && cache.end(previous) == cache.start(index)
        });
        match runs.last_mut() {
            Some(run) if extends => {
                run.last = index;
                run.length += 1;
            }
            _ => runs.push(TildeRun {
                first: index,
                last: index,
                length: 1,
                can_open: false,
                can_close: false,
            }),
        }
        previous = Some(index);
    }

    for run in &mut runs {
        let flanking = Flanking::classify(
            cache.char_before(cache.start(run.first)),
            cache.char_at(cache.end(run.last)),
        );
        run.can_open = flanking.left;
        run.can_close = flanking.right;
    }
    runs.retain(|run| run.length <= 2);
    runs
}

pub(crate) fn parse(
    cache: &TokenCache<'_>,
    list: &[RangeInclusive<usize>],
    _context: &ParseContext<'_>,
) -> ParsingResult {
    let indices = indices(list);
    let mut nodes = Vec::new();
    let mut claims = Vec::new();
    let mut openers: Vec<TildeRun> = Vec::new();

    for run in tilde_runs(cache, &indices) {
        if run.can_close
            && let Some(found) = openers.iter().rposition(|opener| opener.length == run.length)
        {
            let opener = openers[found];
            openers.truncate(found);
            let outer = opener.first..=run.last;
            nodes.push(SequentialNode::new(types::STRIKETHROUGH, outer.clone()));
            claims.push(Claim::with_inner(outer, opener.last + 1..=run.first - 1));
            continue;
        }
        if run.can_open {
            openers.push(run);
        }
    }

    ParsingResult {
        further: partition(&indices, &claims),
        nodes,
    }
}
