//! Line-level recognizers for block starts.
//!
//! Each recognizer looks at the rest of a line starting at its first
//! non-space character and returns offsets relative to that slice.
use std::ops::Range;

use lazy_static::lazy_static;
use regex::Regex;

/// Block-start rules. A flavour lists them in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlockStart {
    BlockQuote,
    AtxHeading,
    FencedCode,
    HtmlBlock,
    SetextHeading,
    ThematicBreak,
    ListItem,
    IndentedCode,
}

impl BlockStart {
    /// CommonMark precedence.
    pub const COMMONMARK: [BlockStart; 8] = [
        BlockStart::BlockQuote,
        BlockStart::AtxHeading,
        BlockStart::FencedCode,
        BlockStart::HtmlBlock,
        BlockStart::SetextHeading,
        BlockStart::ThematicBreak,
        BlockStart::ListItem,
        BlockStart::IndentedCode,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AtxMatch {
    pub level: usize,
    pub content: Option<Range<usize>>,
    pub closing: Option<Range<usize>>,
}

pub(crate) fn atx_heading(line: &str) -> Option<AtxMatch> {
    let level = line.bytes().take_while(|b| *b == b'#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let after = &line[level..];
    if !(after.is_empty() || after.starts_with([' ', '\t'])) {
        return None;
    }

    let content_start = level + (after.len() - after.trim_start_matches([' ', '\t']).len());
    let mut content_end = line.trim_end_matches([' ', '\t']).len().max(content_start);
    let mut closing = None;

    let body = &line[content_start..content_end];
    let without_hashes = body.trim_end_matches('#');
    if without_hashes.len() < body.len()
        && (without_hashes.is_empty() || without_hashes.ends_with([' ', '\t']))
    {
        closing = Some(content_start + without_hashes.len()..content_end);
        content_end = content_start + without_hashes.trim_end_matches([' ', '\t']).len();
    }

    Some(AtxMatch {
        level,
        content: (content_end > content_start).then_some(content_start..content_end),
        closing,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FenceOpen {
    pub fence: char,
    pub length: usize,
    pub info: Option<Range<usize>>,
}

pub(crate) fn fence_open(line: &str) -> Option<FenceOpen> {
    let fence = match line.chars().next() {
        Some(c @ ('`' | '~')) => c,
        _ => return None,
    };
    let length = line.chars().take_while(|c| *c == fence).count();
    if length < 3 {
        return None;
    }

    let rest = &line[length..];
    let trimmed = rest.trim_matches([' ', '\t']);
    if fence == '`' && trimmed.contains('`') {
        return None;
    }
    let info = (!trimmed.is_empty()).then(|| {
        let start = length + (rest.len() - rest.trim_start_matches([' ', '\t']).len());
        start..start + trimmed.len()
    });

    Some(FenceOpen {
        fence,
        length,
        info,
    })
}

/// Length of a closing fence run, if `line` closes a fence of `fence` and at
/// least `length` characters.
pub(crate) fn fence_close(line: &str, fence: char, length: usize) -> Option<usize> {
    let run = line.chars().take_while(|c| *c == fence).count();
    let trailing_blank = line[run..].trim_matches([' ', '\t']).is_empty();
    (run >= length && trailing_blank).then_some(run)
}

/// Setext underline: a run of `=` (level 1) or `-` (level 2), then only
/// spaces. Returns the level and the run length.
pub(crate) fn setext_underline(line: &str) -> Option<(usize, usize)> {
    let marker = line.chars().next()?;
    let level = match marker {
        '=' => 1,
        '-' => 2,
        _ => return None,
    };
    let run = line.chars().take_while(|c| *c == marker).count();
    line[run..]
        .trim_matches([' ', '\t'])
        .is_empty()
        .then_some((level, run))
}

/// Thematic break: three or more of the same `*`, `-` or `_`, optionally
/// separated by spaces. Returns the length without trailing whitespace.
pub(crate) fn thematic_break(line: &str) -> Option<usize> {
    let marker = match line.chars().next() {
        Some(c @ ('*' | '-' | '_')) => c,
        _ => return None,
    };
    let mut count = 0;
    for c in line.chars() {
        match c {
            c if c == marker => count += 1,
            ' ' | '\t' => {}
            _ => return None,
        }
    }
    (count >= 3).then(|| line.trim_end_matches([' ', '\t']).len())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ListMarker {
    pub ordered: bool,
    /// Bullet character, or the delimiter (`.` / `)`) of an ordered marker.
    pub delimiter: char,
    pub start: u64,
    pub length: usize,
}

pub(crate) fn list_marker(line: &str) -> Option<ListMarker> {
    let marker = match line.chars().next()? {
        c @ ('-' | '+' | '*') => ListMarker {
            ordered: false,
            delimiter: c,
            start: 1,
            length: 1,
        },
        c if c.is_ascii_digit() => {
            let digits = line.bytes().take_while(u8::is_ascii_digit).count();
            if digits > 9 {
                return None;
            }
            let delimiter = match line[digits..].chars().next() {
                Some(d @ ('.' | ')')) => d,
                _ => return None,
            };
            ListMarker {
                ordered: true,
                delimiter,
                start: line[..digits].parse().ok()?,
                length: digits + 1,
            }
        }
        _ => return None,
    };

    let after = &line[marker.length..];
    (after.is_empty() || after.starts_with([' ', '\t'])).then_some(marker)
}

/// The seven CommonMark HTML block kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HtmlBlockKind {
    Raw,
    Comment,
    ProcessingInstruction,
    Declaration,
    CData,
    Block,
    Other,
}

lazy_static! {
    static ref RAW_START: Regex =
        Regex::new(r"(?i)^<(?:script|pre|style|textarea)(?:[ \t>]|$)").unwrap();
    static ref RAW_END: Regex = Regex::new(r"(?i)</(?:script|pre|style|textarea)>").unwrap();
    static ref DECLARATION_START: Regex = Regex::new(r"^<![A-Za-z]").unwrap();
    static ref BLOCK_TAG_START: Regex = Regex::new(
        r"(?i)^</?(?:address|article|aside|base|basefont|blockquote|body|caption|center|col|colgroup|dd|details|dialog|dir|div|dl|dt|fieldset|figcaption|figure|footer|form|frame|frameset|h1|h2|h3|h4|h5|h6|head|header|hr|html|iframe|legend|li|link|main|menu|menuitem|nav|noframes|ol|optgroup|option|p|param|search|section|summary|table|tbody|td|tfoot|th|thead|title|tr|track|ul)(?:[ \t]|/?>|$)"
    )
    .unwrap();
    static ref ANY_TAG_LINE: Regex = Regex::new(
        r#"^(?:<[A-Za-z][A-Za-z0-9-]*(?:[ \t]+[A-Za-z_:][A-Za-z0-9_.:-]*(?:[ \t]*=[ \t]*(?:[^ \t"'=<>`]+|'[^']*'|"[^"]*"))?)*[ \t]*/?>|</[A-Za-z][A-Za-z0-9-]*[ \t]*>)[ \t]*$"#
    )
    .unwrap();
}

impl HtmlBlockKind {
    /// Recognizes an HTML block start at the beginning of `line`.
    pub(crate) fn start(line: &str) -> Option<Self> {
        if !line.starts_with('<') {
            return None;
        }
        if RAW_START.is_match(line) {
            Some(Self::Raw)
        } else if line.starts_with("<!--") {
            Some(Self::Comment)
        } else if line.starts_with("<?") {
            Some(Self::ProcessingInstruction)
        } else if line.starts_with("<![CDATA[") {
            Some(Self::CData)
        } else if DECLARATION_START.is_match(line) {
            Some(Self::Declaration)
        } else if BLOCK_TAG_START.is_match(line) {
            Some(Self::Block)
        } else if ANY_TAG_LINE.is_match(line) {
            Some(Self::Other)
        } else {
            None
        }
    }

    /// Whether `line` satisfies this kind's end condition.
    pub(crate) fn ends_on(self, line: &str) -> bool {
        match self {
            Self::Raw => RAW_END.is_match(line),
            Self::Comment => line.contains("-->"),
            Self::ProcessingInstruction => line.contains("?>"),
            Self::Declaration => line.contains('>'),
            Self::CData => line.contains("]]>"),
            Self::Block | Self::Other => false,
        }
    }

    /// Kinds 6 and 7 end at the first blank line.
    pub(crate) fn ends_at_blank_line(self) -> bool {
        matches!(self, Self::Block | Self::Other)
    }

    pub(crate) fn can_interrupt_paragraph(self) -> bool {
        self != Self::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atx_headings() {
        let m = atx_heading("## Title ##  ").expect("heading");
        assert_eq!(m.level, 2);
        assert_eq!(m.content, Some(3..8));
        assert_eq!(m.closing, Some(9..11));

        let empty = atx_heading("#").expect("empty heading");
        assert_eq!((empty.content, empty.closing), (None, None));

        let only_closing = atx_heading("### ###").expect("closing only");
        assert_eq!(only_closing.content, None);
        assert_eq!(only_closing.closing, Some(4..7));

        assert_eq!(atx_heading("# foo#").and_then(|m| m.content), Some(2..6));
        assert!(atx_heading("#5 bolt").is_none());
        assert!(atx_heading("####### x").is_none());
    }

    #[test]
    fn fences() {
        let open = fence_open("```rust  ").expect("fence");
        assert_eq!((open.fence, open.length, open.info), ('`', 3, Some(3..7)));
        assert!(fence_open("``` a`b").is_none());
        assert!(fence_open("~~").is_none());
        assert_eq!(fence_open("~~~ a`b").map(|f| f.length), Some(3));

        assert_eq!(fence_close("````  ", '`', 3), Some(4));
        assert_eq!(fence_close("``", '`', 3), None);
        assert_eq!(fence_close("``` x", '`', 3), None);
    }

    #[test]
    fn thematic_breaks_and_setext() {
        assert_eq!(thematic_break("* * *  "), Some(5));
        assert_eq!(thematic_break("--"), None);
        assert_eq!(thematic_break("_-_"), None);
        assert_eq!(setext_underline("=== "), Some((1, 3)));
        assert_eq!(setext_underline("- -"), None);
    }

    #[test]
    fn list_markers() {
        assert_eq!(
            list_marker("12) x"),
            Some(ListMarker {
                ordered: true,
                delimiter: ')',
                start: 12,
                length: 3
            })
        );
        assert_eq!(list_marker("-").map(|m| m.delimiter), Some('-'));
        assert!(list_marker("-x").is_none());
        assert!(list_marker("1234567890. x").is_none());
    }

    #[test]
    fn html_block_kinds() {
        assert_eq!(HtmlBlockKind::start("<pre class=\"x\">"), Some(HtmlBlockKind::Raw));
        assert_eq!(HtmlBlockKind::start("<!-- c"), Some(HtmlBlockKind::Comment));
        assert_eq!(HtmlBlockKind::start("<div>"), Some(HtmlBlockKind::Block));
        assert_eq!(HtmlBlockKind::start("</DIV"), Some(HtmlBlockKind::Block));
        assert_eq!(HtmlBlockKind::start("<custom-tag a=\"1\">"), Some(HtmlBlockKind::Other));
        assert_eq!(HtmlBlockKind::start("<custom-tag> text"), None);
        assert!(HtmlBlockKind::Raw.ends_on("x </script> y"));
        assert!(!HtmlBlockKind::Other.can_interrupt_paragraph());
    }
}
