use super::*;
use crate::ast::AstNode;
use crate::element::{ElementType, tokens};
use crate::error::{DefaultErrorHandler, RecoveryKind};

fn composites(node: &AstNode) -> Vec<ElementType> {
    node.children()
        .iter()
        .filter(|child| !child.is_leaf())
        .map(AstNode::kind)
        .collect()
}

fn first<'n>(node: &'n AstNode, kind: ElementType) -> &'n AstNode {
    node.descendants()
        .find(|candidate| candidate.kind() == kind)
        .unwrap_or_else(|| panic!("no {} below {}", kind, node.kind()))
}

#[test]
fn parses_heading_and_paragraph() {
    let doc = parse("# Heading\n\nSome text here.", &Flavour::commonmark());

    assert_eq!(doc.root().kind(), types::MARKDOWN_FILE);
    assert_eq!(composites(doc.root()), vec![types::ATX_1, types::PARAGRAPH]);
    let content = first(doc.root(), types::ATX_CONTENT);
    assert_eq!(doc.node_text(content), "Heading");
    let paragraph = first(doc.root(), types::PARAGRAPH);
    assert_eq!(doc.node_text(paragraph), "Some text here.");
}

#[test]
fn parses_multiple_headings() {
    let doc = parse("# Level 1\n## Level 2\n### Level 3", &Flavour::commonmark());
    assert_eq!(
        composites(doc.root()),
        vec![types::ATX_1, types::ATX_2, types::ATX_3]
    );
}

#[test]
fn parses_code_blocks() {
    let doc = parse("```rust\nfn main() {}\n```", &Flavour::commonmark());

    assert_eq!(composites(doc.root()), vec![types::CODE_FENCE]);
    let fence = first(doc.root(), types::CODE_FENCE);
    let lang = fence.find_child(tokens::FENCE_LANG).expect("info string");
    assert_eq!(doc.node_text(lang), "rust");
    assert!(fence.find_child(tokens::CODE_FENCE_END).is_some());
}

#[test]
fn list_looseness() {
    let flavour = Flavour::commonmark();

    let tight = parse("- a\n- b", &flavour);
    let list = first(tight.root(), types::UNORDERED_LIST);
    assert_eq!(list.loose(), Some(false));
    assert_eq!(composites(list), vec![types::LIST_ITEM, types::LIST_ITEM]);

    let loose = parse("- a\n\n- b", &flavour);
    assert_eq!(first(loose.root(), types::UNORDERED_LIST).loose(), Some(true));
}

#[test]
fn loose_inner_list_keeps_outer_tight() {
    let doc = parse("- a\n  - b\n\n    c\n- d", &Flavour::commonmark());
    let outer = first(doc.root(), types::UNORDERED_LIST);
    let inner = first(&outer.children()[0], types::UNORDERED_LIST);

    assert_eq!(outer.loose(), Some(false));
    assert_eq!(inner.loose(), Some(true));
}

#[test]
fn inline_nodes_replace_host_tokens() {
    let doc = parse("*a* **b** `c`", &Flavour::commonmark());
    let paragraph = first(doc.root(), types::PARAGRAPH);
    assert_eq!(
        composites(paragraph),
        vec![types::EMPH, types::STRONG, types::CODE_SPAN]
    );
    assert_eq!(doc.node_text(first(paragraph, types::STRONG)), "**b**");
}

#[test]
fn quoted_paragraph_keeps_markers() {
    let doc = parse("> *a\n> b*", &Flavour::commonmark());
    let emph = first(doc.root(), types::EMPH);
    assert_eq!(doc.node_text(emph), "*a\n> b*");
    assert!(emph.children().iter().any(|child| child.kind() == tokens::BLOCK_QUOTE));
    assert!(doc.check_ranges().is_ok());
}

#[test]
fn reference_links_use_definitions() {
    let doc = parse("[foo]\n\n[foo]: /url", &Flavour::commonmark());
    assert_eq!(
        composites(doc.root()),
        vec![types::PARAGRAPH, types::LINK_DEFINITION]
    );
    let link = first(doc.root(), types::SHORT_REFERENCE_LINK);
    assert_eq!(doc.node_text(link), "[foo]");
}

#[test]
fn strikethrough_needs_gfm() {
    let text = "~~gone~~";
    let plain = parse(text, &Flavour::commonmark());
    assert!(plain.descendants().all(|node| node.kind() != types::STRIKETHROUGH));

    let gfm = parse(text, &Flavour::gfm());
    assert_eq!(doc_kinds(&gfm, types::STRIKETHROUGH), 1);
}

fn doc_kinds(doc: &Document<'_>, kind: ElementType) -> usize {
    doc.descendants().filter(|node| node.kind() == kind).count()
}

#[test]
fn empty_input() {
    let doc = parse("", &Flavour::commonmark());
    assert_eq!(doc.root().range(), 0..0);
    assert!(doc.root().children().is_empty());
}

#[test]
fn ranges_tile_the_source() {
    let flavour = Flavour::gfm();
    for text in [
        "plain",
        "# h #\n\n> q\n> - a\n>   b\n\n1) x\n2) y",
        "```\nunclosed",
        "<div>\n\n*x*",
        "[a]: <b> 'c'\n[a]\n\n![i](j \"k\")",
        "a  \nb\\\nc ~~d~~ <http://e> `f`",
        "\t- tab\n\r\n   ***\n",
    ] {
        let doc = parse(text, &flavour);
        assert!(doc.check_ranges().is_ok(), "{:?}: {:?}", text, doc.check_ranges());
        assert_eq!(doc.root().range(), 0..text.len());
        let covered: usize = doc.root().children().iter().map(|child| child.range().len()).sum();
        assert_eq!(covered, text.len(), "children must tile {:?}", text);
    }
}

#[test]
fn diagnostics_reach_the_handler() {
    let mut handler = DefaultErrorHandler::new();
    let doc = parse_with_error_handler(
        "[a][missing]\n\n> > > > x",
        &Flavour::commonmark(),
        &ParserConfig::default().with_max_nesting_depth(2),
        &mut handler,
    );

    assert_eq!(handler.count_by_kind(RecoveryKind::UnresolvableReference), 1);
    assert_eq!(handler.count_by_kind(RecoveryKind::DepthExceeded), 1);
    assert!(doc.descendants().all(|node| node.kind() != types::FULL_REFERENCE_LINK));

    let context = |kind| {
        handler
            .errors
            .iter()
            .find(|error| error.kind == kind)
            .and_then(|error| error.context.clone())
    };
    assert_eq!(context(RecoveryKind::UnresolvableReference).as_deref(), Some("[a][missing]"));
    assert_eq!(context(RecoveryKind::DepthExceeded).as_deref(), Some("> > > > x"));
}
