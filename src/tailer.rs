//! Polling loop that ties the pipeline together.
//!
//! One cycle: poll metadata, handle rotation, read complete lines, refresh
//! patterns, then classify, dedup, count, and notify each line in order.
//! The loop only suspends between cycles, so shutdown never interrupts a
//! batch midway.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::cursor::{read_complete_lines, Cursor};
use crate::dedup::DedupWindow;
use crate::error::TailError;
use crate::matcher::Matcher;
use crate::notifier::{build_notification, send_with_timeout, NotificationStyle, Notifier};
use crate::patterns::{self, PatternSet};
use crate::provider::ConfigProvider;
use crate::store::CounterStore;
use crate::transform::transform_line;

/// Back-off after the log file went missing.
pub const NOT_FOUND_BACKOFF: Duration = Duration::from_secs(1);
/// Pause after a rotation before reading the new file.
pub const ROTATION_SETTLE: Duration = Duration::from_secs(1);
/// Back-off when there was nothing new to read.
pub const IDLE_BACKOFF: Duration = Duration::from_millis(100);
/// Back-off after a read or store failure.
pub const ERROR_BACKOFF: Duration = Duration::from_secs(1);
/// Consecutive failed store writes between "tailing is blocked" reports.
pub const STORE_STALL_REPORT_EVERY: u32 = 60;
/// Default bound on a single notifier call.
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Mutable state owned by one tailer instance.
#[derive(Debug, Default)]
pub struct TailerState {
    /// Position in the tailed file.
    pub cursor: Cursor,
    /// Lines already emitted in the current epoch.
    pub dedup: DedupWindow,
    /// Last successfully loaded pattern snapshot.
    pub patterns: Arc<PatternSet>,
    /// Store writes that failed in a row; zero after the next successful write.
    pub store_failures: u32,
}

impl TailerState {
    fn reset_after_missing(&mut self) {
        self.cursor.reset();
        self.dedup.clear();
    }
}

/// Result of one cycle, which also selects the following back-off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The log file does not exist.
    NotFound,
    /// A new epoch started.
    Rotated {
        /// The new epoch number.
        epoch: u64,
    },
    /// No complete lines were available.
    Idle,
    /// Lines were consumed.
    Processed {
        /// Lines consumed this cycle.
        lines: usize,
        /// Events counted this cycle.
        emitted: usize,
    },
    /// A counter write failed; the failed line will be retried.
    StoreFailed {
        /// Events counted before the failure.
        emitted: usize,
    },
    /// Reading failed; the same range will be retried.
    ReadFailed,
}

impl CycleOutcome {
    /// How long to sleep before the next cycle.
    pub fn backoff(&self) -> Duration {
        match self {
            Self::NotFound => NOT_FOUND_BACKOFF,
            Self::Rotated { .. } => ROTATION_SETTLE,
            Self::Idle => IDLE_BACKOFF,
            Self::Processed { .. } => Duration::ZERO,
            Self::StoreFailed { .. } | Self::ReadFailed => ERROR_BACKOFF,
        }
    }
}

/// Collaborators and settings for a [`Tailer`].
pub struct TailerDeps {
    /// Source of pattern strings.
    pub provider: Arc<dyn ConfigProvider>,
    /// Counter store shared with the command surface.
    pub store: Arc<CounterStore>,
    /// Notification sink.
    pub notifier: Arc<dyn Notifier>,
    /// Line classifier.
    pub matcher: Matcher,
    /// Static notification styling.
    pub style: NotificationStyle,
    /// Bound on each notifier call.
    pub notify_timeout: Duration,
}

/// Tails one log file.
pub struct Tailer {
    path: PathBuf,
    state: TailerState,
    deps: TailerDeps,
}

impl Tailer {
    /// Create a tailer for `path` with fresh state.
    pub fn new(path: PathBuf, deps: TailerDeps) -> Self {
        Self {
            path,
            state: TailerState::default(),
            deps,
        }
    }

    /// Current state, for inspection.
    pub fn state(&self) -> &TailerState {
        &self.state
    }

    /// Run until `shutdown` carries `true` or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(path = %self.path.display(), "tailer started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let delay = self.poll_once().await.backoff();
            if delay.is_zero() {
                continue;
            }

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(path = %self.path.display(), "tailer stopped");
    }

    /// Execute one cycle without sleeping.
    pub async fn poll_once(&mut self) -> CycleOutcome {
        let poll = match self.state.cursor.poll(&self.path) {
            Ok(poll) => poll,
            Err(TailError::SourceNotFound { .. }) => {
                debug!(path = %self.path.display(), "log file not found");
                self.state.reset_after_missing();
                return CycleOutcome::NotFound;
            }
            Err(e) => {
                warn!(error = %e, "failed to inspect log file");
                return CycleOutcome::ReadFailed;
            }
        };

        if poll.new_epoch {
            let epoch = self.state.cursor.epoch();
            let released = self.state.dedup.len();
            self.state.dedup.clear();
            info!(
                path = %self.path.display(),
                epoch,
                offset = self.state.cursor.offset(),
                released,
                "log file rotated or truncated, starting new epoch"
            );
            return CycleOutcome::Rotated { epoch };
        }

        let batch = match read_complete_lines(
            &self.path,
            poll.bytes_to_read,
            self.state.cursor.identity(),
        ) {
            Ok(batch) => batch,
            Err(TailError::SourceNotFound { .. }) => {
                self.state.reset_after_missing();
                return CycleOutcome::NotFound;
            }
            Err(e @ TailError::SourceRotated { .. }) => {
                info!(error = %e, "file replaced during read, deferring to next poll");
                return CycleOutcome::ReadFailed;
            }
            Err(e) => {
                warn!(error = %e, offset = self.state.cursor.offset(), "failed to read log file");
                return CycleOutcome::ReadFailed;
            }
        };

        if batch.discarded_oversized {
            warn!(
                offset = self.state.cursor.offset(),
                bytes = batch.consumed,
                "discarding unterminated oversized line fragment"
            );
        }

        if batch.lines.is_empty() {
            self.state.cursor.advance(batch.consumed);
            return CycleOutcome::Idle;
        }

        patterns::refresh(&mut self.state.patterns, self.deps.provider.as_ref()).await;
        let snapshot = Arc::clone(&self.state.patterns);

        let mut emitted = 0usize;
        let mut consumed_lines = 0usize;

        for line in &batch.lines {
            match self.process_line(&line.text, &snapshot).await {
                Ok(counted) => {
                    if counted && self.state.store_failures > 0 {
                        info!(
                            attempts = self.state.store_failures,
                            "counter store accepting writes again"
                        );
                        self.state.store_failures = 0;
                    }
                    if counted {
                        emitted = emitted.saturating_add(1);
                    }
                    consumed_lines = consumed_lines.saturating_add(1);
                    self.state
                        .cursor
                        .advance(line.end_offset.saturating_sub(self.state.cursor.offset()));
                }
                Err(e) => {
                    self.state.store_failures = self.state.store_failures.saturating_add(1);
                    let attempts = self.state.store_failures;
                    error!(error = %e, attempts, "failed to record event, will retry line");
                    if attempts.checked_rem(STORE_STALL_REPORT_EVERY) == Some(0) {
                        error!(
                            attempts,
                            offset = self.state.cursor.offset(),
                            "tailing is blocked on the counter store"
                        );
                    }
                    return CycleOutcome::StoreFailed { emitted };
                }
            }
        }

        CycleOutcome::Processed {
            lines: consumed_lines,
            emitted,
        }
    }

    /// Classify and, if new, count and announce one line.
    ///
    /// Returns whether the line was counted. A store failure releases the
    /// dedup mark and is returned so the caller stops before this line.
    async fn process_line(&mut self, raw: &str, patterns: &PatternSet) -> Result<bool, TailError> {
        if raw.trim().is_empty() {
            return Ok(false);
        }

        let result = self.deps.matcher.matches(raw, patterns);
        if !result.is_match {
            return Ok(false);
        }
        let Some(subject) = result.subject_name else {
            return Ok(false);
        };

        if !self.state.dedup.should_emit(raw) {
            debug!(subject = %subject, "duplicate line in epoch, skipping");
            return Ok(false);
        }

        let record = match self.deps.store.increment(&subject).await {
            Ok(record) => record,
            Err(e) => {
                self.state.dedup.forget(raw);
                return Err(e);
            }
        };

        let transformed = transform_line(raw);
        info!(
            subject = %record.subject,
            total = record.total_count,
            period = record.period_count,
            line = %transformed.trim(),
            "event recorded"
        );

        let event = build_notification(transformed, &record, patterns.responses(), &self.deps.style);
        if let Err(e) =
            send_with_timeout(self.deps.notifier.as_ref(), &event, self.deps.notify_timeout).await
        {
            warn!(error = %e, subject = %record.subject, "notification dropped");
        }

        Ok(true)
    }
}
