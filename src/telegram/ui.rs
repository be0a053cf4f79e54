//! HTML formatting helpers for Telegram messages.
//!
//! All output uses HTML parse mode (never MarkdownV2).

/// Escape special HTML characters in log- or user-provided text.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Plural suffix for a count: `1 death`, `2 deaths`.
pub fn plural(count: u64, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}
