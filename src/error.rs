//! Error taxonomy for the tailing pipeline.
//!
//! Every variant except [`TailError::StoreInit`] is recovered inside a single
//! tailer cycle. Store initialisation failures abort startup.

use std::path::PathBuf;

/// Errors produced by the tailing, matching, and counting pipeline.
#[derive(Debug, thiserror::Error)]
pub enum TailError {
    /// The tailed log file does not exist.
    #[error("log file not found: {}", path.display())]
    SourceNotFound {
        /// Path that was polled.
        path: PathBuf,
    },

    /// The file identity or size changed between metadata poll and read.
    #[error("log file rotated during read: {}", path.display())]
    SourceRotated {
        /// Path that was read.
        path: PathBuf,
    },

    /// I/O failure while inspecting or reading the log file.
    #[error("failed to read {}: {source}", path.display())]
    TransientRead {
        /// Path being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A pattern or response source could not be loaded.
    #[error("failed to load {source_name}: {reason}")]
    ConfigLoad {
        /// Which source failed (e.g. "event patterns").
        source_name: String,
        /// Human-readable failure reason.
        reason: String,
    },

    /// The notification sink rejected or failed to accept an event.
    #[error("notification delivery failed: {0}")]
    SinkDelivery(String),

    /// Persisting a counter increment failed.
    #[error("failed to record death for {subject}: {source}")]
    StoreWrite {
        /// Subject whose counter was being incremented.
        subject: String,
        /// Underlying database error.
        #[source]
        source: sqlx::Error,
    },

    /// The counter store could not be opened or created.
    #[error("failed to open counter store at {}: {reason}", path.display())]
    StoreInit {
        /// Database path.
        path: PathBuf,
        /// Human-readable failure reason.
        reason: String,
    },
}

impl TailError {
    /// Build a [`TailError::ConfigLoad`] from any displayable cause.
    pub fn config_load(source_name: &str, reason: impl std::fmt::Display) -> Self {
        Self::ConfigLoad {
            source_name: source_name.to_owned(),
            reason: reason.to_string(),
        }
    }
}
