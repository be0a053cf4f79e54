//! Log framing removal.
//!
//! Server log lines look like `[12:00:01] [Server thread/INFO]: Alice was slain by Zombie`.
//! [`transform_line`] strips the bracketed time token, the bracketed
//! source/level token, and the `: ` separator. Lines without that prefix pass
//! through unchanged.

use std::sync::LazyLock;

use regex::Regex;

static FRAMING_PREFIX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\[[^\]\r\n]*\] \[[^\]\r\n]*\]: ").ok());

/// Remove the leading `[time] [source/LEVEL]: ` prefix from a raw log line.
///
/// Never fails: unparsable prefixes degrade to pass-through.
pub fn transform_line(raw: &str) -> &str {
    let Some(re) = FRAMING_PREFIX.as_ref() else {
        return raw;
    };
    match re.find(raw) {
        Some(prefix) => &raw[prefix.end()..],
        None => raw,
    }
}

/// First whitespace-delimited token of a transformed line, if any.
pub fn leading_token(transformed: &str) -> Option<&str> {
    transformed.split_whitespace().next()
}
