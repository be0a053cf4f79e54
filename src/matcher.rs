//! Two-factor line classification.
//!
//! A line counts only when it contains an event phrase AND a known subject.
//! Lines carrying the bot-disconnect marker are rejected before either
//! pattern class is consulted.

use crate::patterns::PatternSet;
use crate::transform::{leading_token, transform_line};

/// Default marker for bot disconnect noise.
pub const DEFAULT_DISCONNECT_MARKER: &str = "lost connection";

/// Outcome of classifying one raw line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// Whether the line is an accepted event.
    pub is_match: bool,
    /// Subject the event is attributed to, as written in the log.
    pub subject_name: Option<String>,
}

impl MatchResult {
    fn rejected() -> Self {
        Self {
            is_match: false,
            subject_name: None,
        }
    }
}

/// Applies a [`PatternSet`] to raw log lines.
#[derive(Debug, Clone)]
pub struct Matcher {
    disconnect_marker: String,
    require_subject_prefix: bool,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(DEFAULT_DISCONNECT_MARKER, true)
    }
}

impl Matcher {
    /// Create a matcher.
    ///
    /// With `require_subject_prefix` the transformed line must also begin
    /// with a known subject name, so a line that merely mentions a subject
    /// is not attributed to whoever is named first.
    pub fn new(disconnect_marker: &str, require_subject_prefix: bool) -> Self {
        Self {
            disconnect_marker: disconnect_marker.trim().to_lowercase(),
            require_subject_prefix,
        }
    }

    /// Whether the line carries the bot-disconnect marker (case-insensitive).
    pub fn is_excluded(&self, raw: &str) -> bool {
        !self.disconnect_marker.is_empty() && raw.to_lowercase().contains(&self.disconnect_marker)
    }

    /// Classify a raw line against a pattern snapshot.
    pub fn matches(&self, raw: &str, patterns: &PatternSet) -> MatchResult {
        if self.is_excluded(raw) {
            return MatchResult::rejected();
        }

        if !patterns.matches_event(raw) || !patterns.matches_subject(raw) {
            return MatchResult::rejected();
        }

        let transformed = transform_line(raw).trim();
        if self.require_subject_prefix && !patterns.starts_with_subject(transformed) {
            return MatchResult::rejected();
        }

        match leading_token(transformed) {
            Some(subject) => MatchResult {
                is_match: true,
                subject_name: Some(subject.to_owned()),
            },
            None => MatchResult::rejected(),
        }
    }
}
