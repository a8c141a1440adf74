//! Inline markup rules for a single line outside code blocks.
//!
//! A line is held as a sequence of pieces: plain characters, or tags that an
//! earlier rule emitted. Tags are opaque to later rules, so a link URL or a
//! tag attribute is never re-interpreted, and every span a rule wraps must
//! contain only balanced tags. Together this keeps the output well-nested.

use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Char(char),
    Open(String),
    Close(&'static str),
}

/// A delimiter-pair rule such as `**bold**`.
#[derive(Debug, Clone, Copy)]
struct Span {
    mark: char,
    /// 2 for doubled marks, 1 for single marks that must not touch another mark.
    width: usize,
    open: &'static str,
    close: &'static str,
    /// Content may not start or end with whitespace, so `2 * 3 * 4` stays literal.
    flanking: bool,
}

const BOLD: Span = Span {
    mark: '*',
    width: 2,
    open: "<b>",
    close: "</b>",
    flanking: false,
};

const ITALIC: Span = Span {
    mark: '*',
    width: 1,
    open: "<i>",
    close: "</i>",
    flanking: true,
};

const UNDERLINE: Span = Span {
    mark: '_',
    width: 2,
    open: "<u>",
    close: "</u>",
    flanking: false,
};

const STRIKETHROUGH: Span = Span {
    mark: '~',
    width: 2,
    open: "<s>",
    close: "</s>",
    flanking: false,
};

const MONOSPACE: Span = Span {
    mark: '`',
    width: 1,
    open: "<code>",
    close: "</code>",
    flanking: false,
};

#[derive(Debug, Clone, Copy)]
enum Rule {
    /// `#`..`######` + whitespace + text at line start.
    Heading,
    /// `[text](url)`.
    Link,
    Span(Span),
    /// Any run of `#` + one space + text at line start that no heading took.
    HashBullet,
}

/// Application order. A later rule only sees characters no earlier rule consumed.
const RULES: [Rule; 8] = [
    Rule::Heading,
    Rule::Link,
    Rule::Span(BOLD),
    Rule::Span(ITALIC),
    Rule::Span(UNDERLINE),
    Rule::Span(STRIKETHROUGH),
    Rule::Span(MONOSPACE),
    Rule::HashBullet,
];

/// Render one already-escaped line.
pub(super) fn render_line(line: &str) -> String {
    let mut pieces: Vec<Piece> = line.chars().map(Piece::Char).collect();
    for rule in RULES {
        rule.apply(&mut pieces);
    }
    serialize(&pieces)
}

impl Rule {
    fn apply(self, pieces: &mut Vec<Piece>) {
        match self {
            Rule::Heading => heading(pieces),
            Rule::Link => link(pieces),
            Rule::Span(span) => span.apply(pieces),
            Rule::HashBullet => hash_bullet(pieces),
        }
    }
}

fn heading(pieces: &mut Vec<Piece>) {
    let hashes = leading_hashes(pieces);
    if !(1..=6).contains(&hashes) {
        return;
    }
    let spaces = pieces[hashes..]
        .iter()
        .take_while(|p| matches!(p, Piece::Char(c) if c.is_whitespace()))
        .count();
    if spaces == 0 || hashes + spaces == pieces.len() {
        return;
    }

    let content = pieces.split_off(hashes + spaces);
    pieces.clear();
    pieces.push(Piece::Open("<b>".to_string()));
    pieces.push(Piece::Open("<u>".to_string()));
    pieces.extend(content);
    pieces.push(Piece::Close("</u>"));
    pieces.push(Piece::Close("</b>"));
}

fn hash_bullet(pieces: &mut Vec<Piece>) {
    let hashes = leading_hashes(pieces);
    if hashes == 0 || !is_char(pieces, hashes, ' ') || hashes + 1 == pieces.len() {
        return;
    }
    let end = pieces.len();
    wrap(
        pieces,
        0..end,
        hashes + 1..end,
        Piece::Open("<b>".to_string()),
        "</b>",
    );
}

fn link(pieces: &mut Vec<Piece>) {
    let mut i = 0;
    while i < pieces.len() {
        if is_char(pieces, i, '[') {
            if let Some((text_end, url_end)) = find_link(pieces, i) {
                let href = attribute_value(&pieces[text_end + 2..url_end]);
                i = wrap(
                    pieces,
                    i..url_end + 1,
                    i + 1..text_end,
                    Piece::Open(format!("<a href=\"{href}\">")),
                    "</a>",
                );
                continue;
            }
        }
        i += 1;
    }
}

/// Positions of the `]` ending the text and the `)` ending the URL.
fn find_link(pieces: &[Piece], open: usize) -> Option<(usize, usize)> {
    let text_end = (open + 1..pieces.len())
        .find(|&j| is_char(pieces, j, ']') && is_char(pieces, j + 1, '('))?;
    let url_end = (text_end + 2..pieces.len()).find(|&k| is_char(pieces, k, ')'))?;

    let text = &pieces[open + 1..text_end];
    let url = &pieces[text_end + 2..url_end];
    let url_is_plain = url.iter().all(|p| matches!(p, Piece::Char(_)));
    if text.is_empty() || url.is_empty() || !url_is_plain || !is_balanced(text) {
        return None;
    }
    Some((text_end, url_end))
}

fn attribute_value(pieces: &[Piece]) -> String {
    let mut value = String::new();
    for piece in pieces {
        match piece {
            Piece::Char('"') => value.push_str("&quot;"),
            Piece::Char(c) => value.push(*c),
            Piece::Open(_) | Piece::Close(_) => {}
        }
    }
    value
}

impl Span {
    fn apply(&self, pieces: &mut Vec<Piece>) {
        let mut i = 0;
        while i < pieces.len() {
            if self.delimits(pieces, i) {
                let start = i + self.width;
                if let Some(end) = self.find_closer(pieces, start) {
                    i = wrap(
                        pieces,
                        i..end + self.width,
                        start..end,
                        Piece::Open(self.open.to_string()),
                        self.close,
                    );
                    continue;
                }
            }
            i += 1;
        }
    }

    fn delimits(&self, pieces: &[Piece], at: usize) -> bool {
        if self.width == 2 {
            return is_char(pieces, at, self.mark) && is_char(pieces, at + 1, self.mark);
        }
        is_char(pieces, at, self.mark)
            && !(at > 0 && is_char(pieces, at - 1, self.mark))
            && !is_char(pieces, at + 1, self.mark)
    }

    /// Earliest closing delimiter after non-empty, tag-balanced content.
    fn find_closer(&self, pieces: &[Piece], start: usize) -> Option<usize> {
        let mut depth = 0usize;
        for j in start..pieces.len() {
            if j > start
                && depth == 0
                && self.delimits(pieces, j)
                && self.flanks(&pieces[start..j])
            {
                return Some(j);
            }
            match &pieces[j] {
                Piece::Open(_) => depth += 1,
                // A close tag for something opened before the span: nothing
                // further right can be balanced.
                Piece::Close(_) if depth == 0 => return None,
                Piece::Close(_) => depth -= 1,
                Piece::Char(_) => {}
            }
        }
        None
    }

    fn flanks(&self, content: &[Piece]) -> bool {
        if !self.flanking {
            return true;
        }
        let is_space = |p: Option<&Piece>| matches!(p, Some(Piece::Char(c)) if c.is_whitespace());
        !is_space(content.first()) && !is_space(content.last())
    }
}

/// Replace `span` with `open`, the pieces in `inner`, and `close`.
/// Returns the index just past the inserted close tag.
fn wrap(
    pieces: &mut Vec<Piece>,
    span: Range<usize>,
    inner: Range<usize>,
    open: Piece,
    close: &'static str,
) -> usize {
    let mut replacement = Vec::with_capacity(inner.len() + 2);
    replacement.push(open);
    replacement.extend_from_slice(&pieces[inner]);
    replacement.push(Piece::Close(close));
    let end = span.start + replacement.len();
    pieces.splice(span, replacement);
    end
}

fn leading_hashes(pieces: &[Piece]) -> usize {
    pieces
        .iter()
        .take_while(|p| matches!(p, Piece::Char('#')))
        .count()
}

fn is_char(pieces: &[Piece], at: usize, want: char) -> bool {
    matches!(pieces.get(at), Some(Piece::Char(c)) if *c == want)
}

fn is_balanced(pieces: &[Piece]) -> bool {
    let mut depth = 0usize;
    for piece in pieces {
        match piece {
            Piece::Open(_) => depth += 1,
            Piece::Close(_) if depth == 0 => return false,
            Piece::Close(_) => depth -= 1,
            Piece::Char(_) => {}
        }
    }
    depth == 0
}

fn serialize(pieces: &[Piece]) -> String {
    let mut out = String::with_capacity(pieces.len());
    for piece in pieces {
        match piece {
            Piece::Char(c) => out.push(*c),
            Piece::Open(tag) => out.push_str(tag),
            Piece::Close(tag) => out.push_str(tag),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_spans() {
        assert_eq!(render_line("**bold** and *it*"), "<b>bold</b> and <i>it</i>");
        assert_eq!(
            render_line("__u__ ~~s~~ `c`"),
            "<u>u</u> <s>s</s> <code>c</code>"
        );
    }

    #[test]
    fn test_headings() {
        assert_eq!(render_line("# Title"), "<b><u>Title</u></b>");
        assert_eq!(render_line("###### Six"), "<b><u>Six</u></b>");
        assert_eq!(render_line("####### Seven"), "<b>Seven</b>");
        assert_eq!(render_line("#hashtag"), "#hashtag");
        assert_eq!(render_line("# "), "# ");
        assert_eq!(render_line("## **Big** news"), "<b><u><b>Big</b> news</u></b>");
    }

    #[test]
    fn test_link_url_is_not_reinterpreted() {
        assert_eq!(
            render_line("[site](https://a.b/c_d__e__f)"),
            "<a href=\"https://a.b/c_d__e__f\">site</a>"
        );
        assert_eq!(
            render_line("[x](http://a.com/\"q\")"),
            "<a href=\"http://a.com/&quot;q&quot;\">x</a>"
        );
        assert_eq!(render_line("[**b**](u)"), "<a href=\"u\"><b>b</b></a>");
    }

    #[test]
    fn test_incomplete_links_stay_literal() {
        assert_eq!(render_line("[](x)"), "[](x)");
        assert_eq!(render_line("[a]()"), "[a]()");
        assert_eq!(render_line("[a](b"), "[a](b");
    }

    #[test]
    fn test_spaced_asterisks_are_not_italic() {
        assert_eq!(render_line("2 * 3 * 4"), "2 * 3 * 4");
        assert_eq!(render_line("* item"), "* item");
    }

    #[test]
    fn test_nested_spans() {
        assert_eq!(render_line("**a *b* c**"), "<b>a <i>b</i> c</b>");
    }

    #[test]
    fn test_crossing_spans_stay_well_nested() {
        assert_eq!(render_line("**a __b** c__"), "<b>a __b</b> c__");
    }

    #[test]
    fn test_unmatched_delimiters_stay_literal() {
        assert_eq!(render_line("a ** b"), "a ** b");
        assert_eq!(render_line("snake_case_name"), "snake_case_name");
        assert_eq!(render_line("~~open"), "~~open");
    }

    #[test]
    fn test_backtick_run_is_not_monospace() {
        assert_eq!(render_line("use ```x``` here"), "use ```x``` here");
    }
}
