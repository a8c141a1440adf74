//! Splitting rendered replies into platform-sized chunks and sending them.
//!
//! Lengths are measured in UTF-16 code units, which is how Telegram counts
//! message length. A boundary never falls inside a character, a tag or an
//! entity; when a single tag or entity is longer than the limit the split
//! falls back to the hard position.
//!
//! Elements are not balanced per chunk: a boundary may fall between `<b>`
//! and its `</b>`, and Telegram rejects such a chunk when it is sent with
//! HTML parse mode. The failure surfaces through [`deliver`].

use std::future::Future;

use tracing::debug;

use parley_types::chat::ChatId;

/// Telegram's per-message length cap.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

/// Split `markup` into consecutive slices of at most `limit` UTF-16 units.
///
/// Concatenating the result gives back `markup` exactly. An empty input
/// produces no chunks. A limit of 0 is treated as 1; a single character
/// wider than the limit still becomes its own chunk.
pub fn split(markup: &str, limit: usize) -> Vec<&str> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut rest = markup;

    while !rest.is_empty() {
        let hard = hard_boundary(rest, limit);
        if hard == rest.len() {
            chunks.push(rest);
            break;
        }
        let cut = markup_safe_boundary(&rest[..hard]).unwrap_or(hard);
        let (chunk, tail) = rest.split_at(cut);
        chunks.push(chunk);
        rest = tail;
    }
    chunks
}

/// Byte offset of the longest prefix that fits in `limit` units.
fn hard_boundary(text: &str, limit: usize) -> usize {
    let mut units = 0;
    for (idx, c) in text.char_indices() {
        let width = c.len_utf16();
        if units + width > limit {
            // Always make progress, even if the first character alone is too wide.
            return if idx == 0 { c.len_utf8() } else { idx };
        }
        units += width;
    }
    text.len()
}

/// Pull the cut back to the start of a tag or entity left open at the end
/// of `prefix`. `None` when no adjustment is possible or needed.
fn markup_safe_boundary(prefix: &str) -> Option<usize> {
    let open_tag = prefix
        .rfind('<')
        .filter(|&at| !prefix[at..].contains('>'));
    let open_entity = prefix
        .rfind('&')
        .filter(|&at| !prefix[at..].contains(';'));

    let cut = match (open_tag, open_entity) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) | (None, Some(a)) => a,
        (None, None) => return None,
    };
    (cut > 0).then_some(cut)
}

/// Send `chunks` in order, stopping at the first failure.
///
/// Returns how many chunks were sent. Already-sent chunks are not retracted
/// when a later one fails.
pub async fn deliver<F, Fut, E>(chat_id: ChatId, chunks: &[&str], mut send: F) -> Result<usize, E>
where
    F: FnMut(ChatId, String) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    for (index, chunk) in chunks.iter().enumerate() {
        send(chat_id, (*chunk).to_string()).await?;
        debug!(chat_id = %chat_id, index, total = chunks.len(), "chunk delivered");
    }
    Ok(chunks.len())
}
