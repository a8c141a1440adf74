//! Markdown-like model output to Telegram HTML.
//!
//! Rendering runs in three passes over the escaped text:
//! 1. `&`, `<` and `>` are entity-escaped, so nothing the model wrote can
//!    become a tag.
//! 2. Lines are split into fenced code blocks and ordinary lines. Fence
//!    lines and block bodies never see inline rules.
//! 3. Ordinary lines go through the inline rules in [`inline`]; blocks
//!    become `<pre>` elements.
//!
//! The output only ever contains `b`, `i`, `u`, `s`, `code`, `pre` and `a`
//! tags, properly nested.

mod inline;

/// Entity-escape the three characters Telegram's HTML parser treats specially.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render model output as Telegram HTML.
pub fn render(raw: &str) -> String {
    let escaped = escape_html(raw);
    let mut lines: Vec<String> = Vec::new();
    let mut block: Option<CodeBlock<'_>> = None;

    for line in escaped.split('\n') {
        match block.take() {
            Some(mut open) => match closing_fence(line) {
                Some(trailing) => lines.push(open.close(trailing)),
                None => {
                    open.body.push(line);
                    block = Some(open);
                }
            },
            None => match opening_fence(line) {
                Some(info) => block = Some(CodeBlock::open(info)),
                None => lines.push(inline::render_line(line)),
            },
        }
    }

    // An unterminated block runs to the end of the text.
    if let Some(open) = block {
        lines.push(open.close(""));
    }
    lines.join("\n")
}

struct CodeBlock<'a> {
    lang: Option<String>,
    body: Vec<&'a str>,
}

impl<'a> CodeBlock<'a> {
    fn open(info: &str) -> Self {
        let lang = info
            .split_whitespace()
            .next()
            .map(|word| word.replace('"', "&quot;"));
        Self {
            lang,
            body: Vec::new(),
        }
    }

    fn close(self, trailing: &str) -> String {
        let body = self.body.join("\n");
        let mut out = match &self.lang {
            Some(lang) => format!("<pre lang=\"{lang}\">{body}</pre>"),
            None => format!("<pre>{body}</pre>"),
        };
        let trailing = trailing.trim();
        if !trailing.is_empty() {
            out.push('\n');
            out.push_str(&inline::render_line(trailing));
        }
        out
    }
}

/// Info string of a line that opens a fenced block.
///
/// Any line starting with three backticks opens a block. An info string that
/// itself contains a backtick (```` ```x``` ````) carries no language.
fn opening_fence(line: &str) -> Option<&str> {
    let info = line.strip_prefix("```")?;
    if info.contains('`') { Some("") } else { Some(info) }
}

/// Text after the backticks of a line that closes a fenced block.
fn closing_fence(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("```")?;
    Some(rest.trim_start_matches('`'))
}
