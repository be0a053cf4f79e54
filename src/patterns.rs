//! Compiled pattern snapshots.
//!
//! A [`PatternSet`] is immutable once built. The tailer swaps whole snapshots
//! behind an `Arc` so a batch of lines is always classified against one
//! consistent set.

use std::sync::Arc;

use regex::{RegexSet, RegexSetBuilder};
use tracing::warn;

use crate::error::TailError;
use crate::provider::ConfigProvider;

/// Immutable snapshot of compiled event and subject patterns.
#[derive(Debug, Clone)]
pub struct PatternSet {
    events: RegexSet,
    subjects: RegexSet,
    subject_names: Vec<String>,
    debug_subject_count: usize,
    responses: Vec<String>,
}

impl PatternSet {
    /// Compile a snapshot from raw strings.
    ///
    /// Each string is escaped and matched as a case-insensitive literal
    /// substring. Blank entries are dropped so an empty string can never
    /// match every line. Debug subjects are unioned into the subject set.
    ///
    /// # Errors
    ///
    /// Returns [`TailError::ConfigLoad`] if the compiled set exceeds the
    /// regex size limits.
    pub fn compile(
        event_patterns: &[String],
        subjects: &[String],
        debug_subjects: &[String],
        responses: Vec<String>,
    ) -> Result<Self, TailError> {
        let events = literal_set(event_patterns)
            .map_err(|e| TailError::config_load("event patterns", e))?;

        let debug_names = non_blank(debug_subjects);
        let mut subject_names = non_blank(subjects);
        let debug_subject_count = debug_names.len();
        subject_names.extend(debug_names);

        let subject_set =
            literal_set(&subject_names).map_err(|e| TailError::config_load("subject patterns", e))?;

        Ok(Self {
            events,
            subjects: subject_set,
            subject_names,
            debug_subject_count,
            responses: responses
                .into_iter()
                .map(|r| r.trim().to_owned())
                .filter(|r| !r.is_empty())
                .collect(),
        })
    }

    /// A snapshot that matches nothing.
    pub fn empty() -> Self {
        Self {
            events: RegexSet::empty(),
            subjects: RegexSet::empty(),
            subject_names: Vec::new(),
            debug_subject_count: 0,
            responses: Vec::new(),
        }
    }

    /// Whether any event pattern occurs anywhere in `line`.
    pub fn matches_event(&self, line: &str) -> bool {
        self.events.is_match(line)
    }

    /// Whether any subject pattern (whitelist or debug) occurs anywhere in `line`.
    pub fn matches_subject(&self, line: &str) -> bool {
        self.subjects.is_match(line)
    }

    /// Whether `text` starts with a known subject name, ignoring case.
    pub fn starts_with_subject(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.subject_names
            .iter()
            .any(|name| lowered.starts_with(&name.to_lowercase()))
    }

    /// Whether either pattern class is empty, in which case nothing can match.
    pub fn is_inert(&self) -> bool {
        self.events.is_empty() || self.subjects.is_empty()
    }

    /// Number of compiled event patterns.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Number of compiled subject patterns, debug subjects included.
    pub fn subject_count(&self) -> usize {
        self.subjects.len()
    }

    /// Number of debug subjects in the subject union.
    pub fn debug_subject_count(&self) -> usize {
        self.debug_subject_count
    }

    /// Notification title templates carried with this snapshot.
    pub fn responses(&self) -> &[String] {
        &self.responses
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::empty()
    }
}

fn non_blank(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .collect()
}

fn literal_set(values: &[String]) -> Result<RegexSet, regex::Error> {
    let escaped: Vec<String> = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(regex::escape)
        .collect();
    RegexSetBuilder::new(escaped).case_insensitive(true).build()
}

/// Load all four sources and compile a new snapshot.
///
/// Response templates only decorate notifications, so a failed template
/// load keeps `fallback_responses` instead of failing the snapshot.
///
/// # Errors
///
/// Returns the first [`TailError::ConfigLoad`] raised while loading or
/// compiling event, subject, or debug subject patterns.
pub async fn load_snapshot(
    provider: &dyn ConfigProvider,
    fallback_responses: &[String],
) -> Result<PatternSet, TailError> {
    let events = provider.load_event_patterns().await?;
    let subjects = provider.load_subject_names().await?;
    let debug = provider.load_debug_subject_names().await?;
    let responses = match provider.load_response_templates().await {
        Ok(responses) => responses,
        Err(e) => {
            warn!(error = %e, "response templates unavailable, keeping previous titles");
            fallback_responses.to_vec()
        }
    };
    PatternSet::compile(&events, &subjects, &debug, responses)
}

/// Refresh `current` from the provider, keeping the previous snapshot on failure.
///
/// Returns `true` when a new snapshot was installed.
pub async fn refresh(current: &mut Arc<PatternSet>, provider: &dyn ConfigProvider) -> bool {
    let loaded = load_snapshot(provider, current.responses()).await;
    match loaded {
        Ok(next) => {
            if next.is_inert() {
                warn!(
                    events = next.event_count(),
                    subjects = next.subject_count(),
                    "event or subject list is empty, no line can match"
                );
            }
            *current = Arc::new(next);
            true
        }
        Err(e) => {
            warn!(error = %e, "pattern refresh failed, reusing previous snapshot");
            false
        }
    }
}
