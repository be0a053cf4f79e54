//! Pattern and response sources.
//!
//! The tailer asks a [`ConfigProvider`] for fresh string lists on every cycle
//! that has lines to classify. [`JsonFileProvider`] re-reads the JSON files
//! each time so edits take effect without a restart.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::TailError;

/// Source of raw pattern strings and response templates.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Phrases that mark an interesting event (e.g. death messages).
    async fn load_event_patterns(&self) -> Result<Vec<String>, TailError>;
    /// Whitelisted subject names.
    async fn load_subject_names(&self) -> Result<Vec<String>, TailError>;
    /// Debug/test subject names, unioned into the whitelist for matching.
    async fn load_debug_subject_names(&self) -> Result<Vec<String>, TailError>;
    /// Notification title templates.
    async fn load_response_templates(&self) -> Result<Vec<String>, TailError>;
}

/// File locations for [`JsonFileProvider`].
#[derive(Debug, Clone, Default)]
pub struct SourcePaths {
    /// `{"deathMessages": [...]}` file.
    pub event_patterns: Option<PathBuf>,
    /// `[{"name": ...}, ...]` whitelist file.
    pub subjects: Option<PathBuf>,
    /// `[{"name": ...}, ...]` debug subject file.
    pub debug_subjects: Option<PathBuf>,
    /// `{"humbledResponses": [...]}` file.
    pub responses: Option<PathBuf>,
}

/// Reads pattern sources from JSON files on every call.
///
/// An unset path yields an empty list; an unreadable or malformed file
/// yields [`TailError::ConfigLoad`].
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    paths: SourcePaths,
}

#[derive(Deserialize)]
struct EventPatternFile {
    #[serde(default, rename = "deathMessages")]
    death_messages: Vec<String>,
}

#[derive(Deserialize)]
struct ResponseFile {
    #[serde(default, rename = "humbledResponses")]
    humbled_responses: Vec<String>,
}

#[derive(Deserialize)]
struct NamedEntry {
    #[serde(default)]
    name: String,
}

impl JsonFileProvider {
    /// Create a provider over the given source files.
    pub fn new(paths: SourcePaths) -> Self {
        Self { paths }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        source_name: &str,
        path: &Path,
    ) -> Result<T, TailError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| TailError::config_load(source_name, format!("{}: {e}", path.display())))?;
        serde_json::from_str(&contents)
            .map_err(|e| TailError::config_load(source_name, format!("{}: {e}", path.display())))
    }

    async fn load_names(source_name: &str, path: Option<&Path>) -> Result<Vec<String>, TailError> {
        let Some(path) = path else {
            return Ok(Vec::new());
        };
        let entries: Vec<NamedEntry> = Self::read_json(source_name, path).await?;
        Ok(entries.into_iter().map(|entry| entry.name).collect())
    }
}

#[async_trait]
impl ConfigProvider for JsonFileProvider {
    async fn load_event_patterns(&self) -> Result<Vec<String>, TailError> {
        let Some(path) = self.paths.event_patterns.as_deref() else {
            return Ok(Vec::new());
        };
        let file: EventPatternFile = Self::read_json("event patterns", path).await?;
        Ok(file.death_messages)
    }

    async fn load_subject_names(&self) -> Result<Vec<String>, TailError> {
        Self::load_names("subject whitelist", self.paths.subjects.as_deref()).await
    }

    async fn load_debug_subject_names(&self) -> Result<Vec<String>, TailError> {
        Self::load_names("debug subjects", self.paths.debug_subjects.as_deref()).await
    }

    async fn load_response_templates(&self) -> Result<Vec<String>, TailError> {
        let Some(path) = self.paths.responses.as_deref() else {
            return Ok(Vec::new());
        };
        let file: ResponseFile = Self::read_json("response templates", path).await?;
        Ok(file.humbled_responses)
    }
}

/// Fixed in-memory lists, used by tests.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    /// Event phrases.
    pub event_patterns: Vec<String>,
    /// Whitelisted subjects.
    pub subjects: Vec<String>,
    /// Debug subjects.
    pub debug_subjects: Vec<String>,
    /// Response templates.
    pub responses: Vec<String>,
}

#[async_trait]
impl ConfigProvider for StaticProvider {
    async fn load_event_patterns(&self) -> Result<Vec<String>, TailError> {
        Ok(self.event_patterns.clone())
    }

    async fn load_subject_names(&self) -> Result<Vec<String>, TailError> {
        Ok(self.subjects.clone())
    }

    async fn load_debug_subject_names(&self) -> Result<Vec<String>, TailError> {
        Ok(self.debug_subjects.clone())
    }

    async fn load_response_templates(&self) -> Result<Vec<String>, TailError> {
        Ok(self.responses.clone())
    }
}
