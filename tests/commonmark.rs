//! CommonMark-style examples run through the full pipeline.
//!
//! Set `COMMONMARK_SECTION` to run only the examples of one section.
use std::env;

use notemark::{Flavour, HtmlValidator, MarkdownEngine};

/// Represents a single example: markdown in, reference HTML out.
#[derive(Debug, Clone, Copy)]
struct Example {
    section: &'static str,
    markdown: &'static str,
    expected_html: &'static str,
}

const fn example(
    section: &'static str,
    markdown: &'static str,
    expected_html: &'static str,
) -> Example {
    Example {
        section,
        markdown,
        expected_html,
    }
}

const EXAMPLES: &[Example] = &[
    example(
        "Tabs",
        "- foo\n\n\tbar",
        "<ul>\n<li>\n<p>foo</p>\n<p>bar</p>\n</li>\n</ul>\n",
    ),
    example(
        "Tabs",
        ">\t\tfoo",
        "<blockquote>\n<pre><code>  foo\n</code></pre>\n</blockquote>\n",
    ),
    example(
        "Tabs",
        "-\t\tfoo",
        "<ul>\n<li>\n<pre><code>  foo\n</code></pre>\n</li>\n</ul>\n",
    ),
    example(
        "Tabs",
        " - foo\n   - bar\n\t - baz",
        "<ul>\n<li>foo\n<ul>\n<li>bar\n<ul>\n<li>baz</li>\n</ul>\n</li>\n</ul>\n</li>\n</ul>\n",
    ),
    example("Thematic breaks", "***\n---\n___", "<hr />\n<hr />\n<hr />\n"),
    example("Thematic breaks", "+++", "<p>+++</p>\n"),
    example("Thematic breaks", "- - -", "<hr />\n"),
    example(
        "Thematic breaks",
        "> ---",
        "<blockquote>\n<hr />\n</blockquote>\n",
    ),
    example("Thematic breaks", "- ***", "<ul>\n<li>\n<hr />\n</li>\n</ul>\n"),
    example(
        "Thematic breaks",
        "- a\n- * * *",
        "<ul>\n<li>a</li>\n<li>\n<hr />\n</li>\n</ul>\n",
    ),
    example(
        "ATX headings",
        "# foo\n## foo\n### foo\n#### foo\n##### foo\n###### foo",
        "<h1>foo</h1>\n<h2>foo</h2>\n<h3>foo</h3>\n<h4>foo</h4>\n<h5>foo</h5>\n<h6>foo</h6>\n",
    ),
    example("ATX headings", "####### foo", "<p>####### foo</p>\n"),
    example("ATX headings", "#5 bolt\n\n#hashtag", "<p>#5 bolt</p>\n<p>#hashtag</p>\n"),
    example(
        "ATX headings",
        "# foo *bar* \\*baz\\*",
        "<h1>foo <em>bar</em> *baz*</h1>\n",
    ),
    example("ATX headings", "## foo ##", "<h2>foo</h2>\n"),
    example(
        "Setext headings",
        "Foo *bar*\n=========\n\nFoo *bar*\n---------",
        "<h1>Foo <em>bar</em></h1>\n<h2>Foo <em>bar</em></h2>\n",
    ),
    example(
        "Indented code blocks",
        "    a simple\n      indented code block",
        "<pre><code>a simple\n  indented code block\n</code></pre>\n",
    ),
    example(
        "Fenced code blocks",
        "```\n<\n >\n```",
        "<pre><code>&lt;\n &gt;\n</code></pre>\n",
    ),
    example(
        "Fenced code blocks",
        "```ruby\ndef foo(x)\n  return 3\nend\n```",
        "<pre><code class=\"language-ruby\">def foo(x)\n  return 3\nend\n</code></pre>\n",
    ),
    example(
        "HTML blocks",
        "<div>\n*hello*\n</div>",
        "<div>\n*hello*\n</div>\n",
    ),
    example(
        "HTML blocks",
        "<!-- Foo\n\nbar\n   baz -->\nokay",
        "<!-- Foo\n\nbar\n   baz -->\n<p>okay</p>\n",
    ),
    example(
        "Link reference definitions",
        "[foo]: /url \"title\"\n\n[foo]",
        "<p><a href=\"/url\" title=\"title\">foo</a></p>\n",
    ),
    example("Paragraphs", "aaa\n\nbbb", "<p>aaa</p>\n<p>bbb</p>\n"),
    example("Paragraphs", "  aaa\n bbb", "<p>aaa\nbbb</p>\n"),
    example(
        "Block quotes",
        "> # Foo\n> bar\n> baz",
        "<blockquote>\n<h1>Foo</h1>\n<p>bar\nbaz</p>\n</blockquote>\n",
    ),
    example(
        "Lists",
        "- foo\n- bar\n+ baz",
        "<ul>\n<li>foo</li>\n<li>bar</li>\n</ul>\n<ul>\n<li>baz</li>\n</ul>\n",
    ),
    example(
        "Lists",
        "1. foo\n2. bar\n3) baz",
        "<ol>\n<li>foo</li>\n<li>bar</li>\n</ol>\n<ol start=\"3\">\n<li>baz</li>\n</ol>\n",
    ),
    example(
        "Lists",
        "- foo\n\n- bar\n\n\n- baz",
        "<ul>\n<li>\n<p>foo</p>\n</li>\n<li>\n<p>bar</p>\n</li>\n<li>\n<p>baz</p>\n</li>\n</ul>\n",
    ),
    example(
        "Lists",
        "- a\n  - b\n    - c",
        "<ul>\n<li>a\n<ul>\n<li>b\n<ul>\n<li>c</li>\n</ul>\n</li>\n</ul>\n</li>\n</ul>\n",
    ),
    example("Code spans", "`foo`", "<p><code>foo</code></p>\n"),
    example(
        "Code spans",
        "`` foo ` bar ``",
        "<p><code>foo ` bar</code></p>\n",
    ),
    example("Code spans", "` `` `", "<p><code>``</code></p>\n"),
    example("Emphasis", "*foo bar*", "<p><em>foo bar</em></p>\n"),
    example("Emphasis", "a * foo bar*", "<p>a * foo bar*</p>\n"),
    example("Emphasis", "foo*bar*", "<p>foo<em>bar</em></p>\n"),
    example("Emphasis", "_foo_bar", "<p>_foo_bar</p>\n"),
    example("Emphasis", "**foo bar**", "<p><strong>foo bar</strong></p>\n"),
    example(
        "Emphasis",
        "*foo**bar**baz*",
        "<p><em>foo<strong>bar</strong>baz</em></p>\n",
    ),
    example(
        "Emphasis",
        "***strong emph***",
        "<p><em><strong>strong emph</strong></em></p>\n",
    ),
    example(
        "Links",
        "[link](/uri \"title\")",
        "<p><a href=\"/uri\" title=\"title\">link</a></p>\n",
    ),
    example("Links", "[link]()", "<p><a href=\"\">link</a></p>\n"),
    example("Links", "[link](<url>)", "<p><a href=\"url\">link</a></p>\n"),
    example(
        "Links",
        "[link](<foo bar>)",
        "<p><a href=\"foo%20bar\">link</a></p>\n",
    ),
    example("Links", "[a](<b)c", "<p>[a](&lt;b)c</p>\n"),
    example("Links", "[link](<foo\\>)", "<p>[link](&lt;foo&gt;)</p>\n"),
    example(
        "Links",
        "[foo]: /url1\n\n[foo][bar](/u)",
        "<p>[foo]<a href=\"/u\">bar</a></p>\n",
    ),
    example(
        "Links",
        "[link [foo [bar]]](/uri)",
        "<p><a href=\"/uri\">link [foo [bar]]</a></p>\n",
    ),
    example(
        "Links",
        "[link *foo **bar** `#`*](/uri)",
        "<p><a href=\"/uri\">link <em>foo <strong>bar</strong> <code>#</code></em></a></p>\n",
    ),
    example(
        "Links",
        "[foo [bar](/uri)](/uri)",
        "<p>[foo <a href=\"/uri\">bar</a>](/uri)</p>\n",
    ),
    example(
        "Images",
        "![foo](/url \"title\")",
        "<p><img src=\"/url\" alt=\"foo\" title=\"title\" /></p>\n",
    ),
    example(
        "Images",
        "![foo *bar*](/url)",
        "<p><img src=\"/url\" alt=\"foo bar\" /></p>\n",
    ),
    example(
        "Images",
        "![foo](<url>)",
        "<p><img src=\"url\" alt=\"foo\" /></p>\n",
    ),
    example(
        "Autolinks",
        "<http://foo.bar.baz>",
        "<p><a href=\"http://foo.bar.baz\">http://foo.bar.baz</a></p>\n",
    ),
    example(
        "Autolinks",
        "<foo@bar.example.com>",
        "<p><a href=\"mailto:foo@bar.example.com\">foo@bar.example.com</a></p>\n",
    ),
    example(
        "Autolinks",
        "<https://example.com/\\[\\>",
        "<p><a href=\"https://example.com/%5C%5B%5C\">https://example.com/\\[\\</a></p>\n",
    ),
    example(
        "Autolinks",
        "[a](<http://b.c>)",
        "<p><a href=\"http://b.c\">a</a></p>\n",
    ),
    example("Raw HTML", "<a><bab><c2c>", "<p><a><bab><c2c></p>\n"),
    example("Hard line breaks", "foo  \nbaz", "<p>foo<br />\nbaz</p>\n"),
    example("Hard line breaks", "foo\\\nbaz", "<p>foo<br />\nbaz</p>\n"),
    example(
        "Entity references",
        "&amp; &copy; &#35;",
        "<p>&amp; © #</p>\n",
    ),
    example(
        "Entity references",
        "&nbsp; &AElig; &Dcaron;\n&frac34; &HilbertSpace; &DifferentialD;\n&ClockwiseContourIntegral; &ngE;",
        "<p>\u{a0} Æ Ď\n¾ ℋ ⅆ\n∲ ≧̸</p>\n",
    ),
    example(
        "Entity references",
        "&x; &#; &#x;\n&MadeUpEntity;",
        "<p>&amp;x; &amp;#; &amp;#x;\n&amp;MadeUpEntity;</p>\n",
    ),
    example(
        "Backslash escapes",
        "\\*not emphasized*",
        "<p>*not emphasized*</p>\n",
    ),
];

const GFM_EXAMPLES: &[Example] = &[
    example(
        "Strikethrough",
        "~~Hi~~ Hello, world!",
        "<p><del>Hi</del> Hello, world!</p>\n",
    ),
    example(
        "Strikethrough",
        "This ~~has a\n\nnew paragraph~~.",
        "<p>This ~~has a</p>\n<p>new paragraph~~.</p>\n",
    ),
];

fn normalize_html(html: &str) -> String {
    let trimmed = html.trim();
    let mut normalized = String::new();
    let mut last_was_space = false;
    for ch in trimmed.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                normalized.push(' ');
                last_was_space = true;
            }
        } else {
            normalized.push(ch);
            last_was_space = false;
        }
    }
    normalized.replace("> <", "><")
}

fn should_run_example(example: &Example) -> bool {
    match env::var("COMMONMARK_SECTION") {
        Ok(filter) => example
            .section
            .to_lowercase()
            .contains(&filter.to_lowercase()),
        Err(_) => true,
    }
}

fn run_examples(engine: &MarkdownEngine, examples: &[Example]) {
    for example in examples.iter().filter(|example| should_run_example(example)) {
        let html = engine.to_html(example.markdown);

        assert_eq!(
            normalize_html(&html),
            normalize_html(example.expected_html),
            "HTML mismatch ({})\nMarkdown:\n{}\nExpected HTML:\n{}\nActual HTML:\n{}",
            example.section,
            example.markdown,
            example.expected_html,
            html
        );
    }
}

#[test]
fn test_commonmark_full_pipeline() {
    run_examples(&MarkdownEngine::new(Flavour::commonmark()), EXAMPLES);
}

#[test]
fn test_gfm_extensions() {
    run_examples(&MarkdownEngine::new(Flavour::gfm()), GFM_EXAMPLES);
}

#[test]
fn test_gfm_is_a_superset_on_examples() {
    let engine = MarkdownEngine::new(Flavour::gfm());
    run_examples(&engine, EXAMPLES);
}

#[test]
fn test_examples_render_balanced_html() {
    let engine = MarkdownEngine::new(Flavour::commonmark());
    for example in EXAMPLES {
        // Raw HTML passes through unbalanced on purpose.
        if example.section.contains("HTML") {
            continue;
        }
        let html = engine.to_html(example.markdown);
        if let Err(message) = HtmlValidator::validate_well_formed(&html) {
            panic!("{} ({}): {}\n{}", example.section, example.markdown, message, html);
        }
    }
}
