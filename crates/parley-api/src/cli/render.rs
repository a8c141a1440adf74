//! `parley render`: preview what the bot would send for a model reply.

use std::fmt::Write as _;
use std::path::Path;

use console::style;
use tokio::io::AsyncReadExt;

use parley_core::delivery::split;
use parley_core::render::render;

pub async fn run(file: Option<&Path>, limit: usize) -> anyhow::Result<()> {
    let input = match file {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
    };
    print!("{}", format_chunks(&input, limit, true));
    Ok(())
}

/// Render `input` and lay out the chunks with a header line each.
pub fn format_chunks(input: &str, limit: usize, styled: bool) -> String {
    let markup = render(input);
    let chunks = split(&markup, limit);
    let total = chunks.len();

    let mut out = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        let header = format!(
            "--- chunk {}/{total} ({} units) ---",
            i + 1,
            chunk.encode_utf16().count()
        );
        if styled {
            let _ = writeln!(out, "{}", style(header).dim());
        } else {
            let _ = writeln!(out, "{header}");
        }
        let _ = writeln!(out, "{chunk}");
    }
    out
}
