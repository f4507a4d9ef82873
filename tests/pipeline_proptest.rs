//! Property-based tests over generated markdown.
//!
//! Whatever the input, parsing terminates with ranges that tile the text,
//! and rendering terminates with balanced, reproducible HTML.
use proptest::prelude::*;

use notemark::{Flavour, HtmlValidator, parse, render, types};

/// Generate block-level line prefixes
fn prefix_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("> ".to_string()),
        Just("- ".to_string()),
        Just("  ".to_string()),
        Just("    ".to_string()),
        Just("1. ".to_string()),
        Just("# ".to_string()),
        Just("\t".to_string()),
    ]
}

/// Generate inline content rich in delimiters
fn inline_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            "[a-z]{1,6}",
            Just(" ".to_string()),
            Just("*".to_string()),
            Just("_".to_string()),
            Just("~".to_string()),
            Just("`".to_string()),
            Just("[".to_string()),
            Just("]".to_string()),
            Just("(".to_string()),
            Just(")".to_string()),
            Just("!".to_string()),
            Just("<".to_string()),
            Just(">".to_string()),
            Just("\\".to_string()),
            Just("&amp;".to_string()),
            Just("  ".to_string()),
        ],
        0..12,
    )
    .prop_map(|parts| parts.concat())
}

/// Generate whole-line constructs
fn line_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => (prefix_strategy(), inline_strategy()).prop_map(|(prefix, body)| prefix + &body),
        1 => Just(String::new()),
        1 => Just("```".to_string()),
        1 => Just("---".to_string()),
        1 => Just("===".to_string()),
        1 => Just("[a]: /url 'title'".to_string()),
        1 => Just("<div>".to_string()),
    ]
}

/// Generate container prefixes that each open one block quote or list item
fn container_strategy() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(prop_oneof![Just("> "), Just("- "), Just("1. ")], 1..4)
}

/// Generate single-line leaf blocks that cannot be read as a list marker
fn leaf_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("***"),
        Just("___"),
        Just("* * *"),
        Just("# heading"),
        Just("```"),
        Just("    code"),
        Just("plain"),
    ]
}

fn document_strategy() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(line_strategy(), 1..16),
        prop_oneof![Just("\n"), Just("\r\n")],
    )
        .prop_map(|(lines, eol)| lines.join(eol))
}

proptest! {
    #[test]
    fn parse_ranges_tile_the_text(text in document_strategy()) {
        for flavour in [Flavour::commonmark(), Flavour::gfm()] {
            let doc = parse(&text, &flavour);
            prop_assert_eq!(doc.root().range(), 0..text.len());
            prop_assert!(doc.check_ranges().is_ok(), "{:?}", doc.check_ranges());
        }
    }

    #[test]
    fn arbitrary_text_never_panics(text in "\\PC{0,64}") {
        let flavour = Flavour::gfm();
        let doc = parse(&text, &flavour);
        prop_assert!(doc.check_ranges().is_ok());
        let _ = render(&doc, &flavour, Some("https://example.com/"));
    }

    #[test]
    fn leaf_blocks_stay_inside_their_containers(
        containers in container_strategy(),
        leaf in leaf_strategy(),
    ) {
        let text = containers.concat() + leaf;
        let doc = parse(&text, &Flavour::commonmark());
        prop_assert!(doc.check_ranges().is_ok(), "{:?}", doc.check_ranges());

        // The last byte belongs to the leaf; every container must hold it.
        let path = doc.nodes_at(text.len() - 1);
        let depth = path
            .iter()
            .filter(|node| node.kind() == types::BLOCK_QUOTE || node.kind() == types::LIST_ITEM)
            .count();
        prop_assert_eq!(depth, containers.len(), "{:?}", text);
        for node in path {
            prop_assert!(node.range().end == text.len(), "{:?} in {:?}", node.kind(), text);
        }
    }

    #[test]
    fn rendering_is_idempotent(text in document_strategy()) {
        let flavour = Flavour::gfm();
        let doc = parse(&text, &flavour);
        let first = render(&doc, &flavour, None);
        prop_assert_eq!(render(&doc, &flavour, None), first);
    }

    #[test]
    fn rendered_tags_are_balanced(text in document_strategy()) {
        // Raw HTML is emitted verbatim, so keep it out of this property.
        let text = text.replace('<', "");
        let flavour = Flavour::commonmark();
        let html = render(&parse(&text, &flavour), &flavour, None);
        prop_assert!(
            HtmlValidator::validate_well_formed(&html).is_ok(),
            "{:?} rendered {:?}",
            text,
            html
        );
    }
}
