//! Configuration loading and validation.
//!
//! Loads `humbler.toml` with per-section defaults, then applies environment
//! overrides (a `.env` in the working directory is honoured by the binary).
//! Precedence: env vars > config file > defaults.
//!
//! Secrets are never stored in the file; it names the environment variables
//! that hold them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::matcher::DEFAULT_DISCONNECT_MARKER;
use crate::notifier::{NotificationStyle, DEFAULT_COLOR, DEFAULT_FOOTER};
use crate::provider::SourcePaths;

/// Top-level Humbler configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HumblerConfig {
    /// The tailed log file.
    #[serde(default)]
    pub log: LogConfig,

    /// Counter store location.
    #[serde(default)]
    pub store: StoreConfig,

    /// Pattern and response source files.
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Optional season scoping for period counts.
    #[serde(default)]
    pub season: SeasonConfig,

    /// Notification sinks and styling.
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Line classification options.
    #[serde(default)]
    pub matching: MatchingConfig,
}

/// The tailed log file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    /// Path of the append-only, externally rotated log.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Counter store location.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// JSON source files. Unset entries load as empty lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcesConfig {
    /// `{"deathMessages": [...]}`.
    #[serde(default)]
    pub event_patterns: Option<PathBuf>,
    /// `[{"name": ...}]` whitelist.
    #[serde(default)]
    pub subjects: Option<PathBuf>,
    /// `[{"name": ...}]` debug subjects.
    #[serde(default)]
    pub debug_subjects: Option<PathBuf>,
    /// `{"humbledResponses": [...]}`.
    #[serde(default)]
    pub responses: Option<PathBuf>,
}

impl SourcesConfig {
    /// Paths for the JSON provider.
    pub fn to_source_paths(&self) -> SourcePaths {
        SourcePaths {
            event_patterns: self.event_patterns.clone(),
            subjects: self.subjects.clone(),
            debug_subjects: self.debug_subjects.clone(),
            responses: self.responses.clone(),
        }
    }
}

/// Season scoping.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeasonConfig {
    /// Label period counts are scoped to (e.g. "6"). Unset disables seasons.
    #[serde(default)]
    pub label: Option<String>,
}

/// Notification sinks and styling.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    /// Footer text on every notification.
    #[serde(default = "default_footer")]
    pub footer: String,

    /// 24-bit colour hint.
    #[serde(default = "default_color")]
    pub color: u32,

    /// Seconds before a notifier call counts as failed.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Environment variable holding the webhook URL.
    #[serde(default = "default_webhook_url_env")]
    pub webhook_url_env: String,

    /// Environment variable holding the Telegram bot token.
    #[serde(default = "default_telegram_token_env")]
    pub telegram_token_env: String,

    /// Telegram chat IDs that receive notifications.
    #[serde(default)]
    pub telegram_chats: Vec<i64>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            footer: default_footer(),
            color: default_color(),
            timeout_secs: default_timeout_secs(),
            webhook_url_env: default_webhook_url_env(),
            telegram_token_env: default_telegram_token_env(),
            telegram_chats: Vec::new(),
        }
    }
}

impl NotifyConfig {
    /// Static notification styling.
    pub fn style(&self) -> NotificationStyle {
        NotificationStyle {
            color: self.color,
            footer: self.footer.clone(),
        }
    }

    /// Bound on each notifier call.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Line classification options.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    /// Lines containing this text (case-insensitive) never count.
    #[serde(default = "default_disconnect_marker")]
    pub disconnect_marker: String,

    /// Require the de-framed line to begin with a known subject.
    #[serde(default = "default_true")]
    pub require_subject_prefix: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            disconnect_marker: default_disconnect_marker(),
            require_subject_prefix: true,
        }
    }
}

impl HumblerConfig {
    /// Validate that configuration values are within sane bounds.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            (1..=60).contains(&self.notify.timeout_secs),
            "notify.timeout_secs must be in 1..=60"
        );
        anyhow::ensure!(
            self.notify.color <= 0x00FF_FFFF,
            "notify.color must fit in 24 bits"
        );
        anyhow::ensure!(
            !self.store.path.as_os_str().is_empty(),
            "store.path must not be empty"
        );
        Ok(())
    }

    /// The tailed log path, required by `start`.
    ///
    /// # Errors
    ///
    /// Returns an error if neither `log.path` nor `LOG_FILE_PATH` is set.
    pub fn log_path(&self) -> anyhow::Result<&Path> {
        self.log
            .path
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("log.path (or LOG_FILE_PATH) must be set"))
    }

    /// Apply environment variable overrides.
    ///
    /// Takes a resolver function so tests need not mutate the process env.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("LOG_FILE_PATH") {
            self.log.path = Some(PathBuf::from(v));
        }
        if let Some(v) = non_empty("DB_FILE_PATH") {
            self.store.path = PathBuf::from(v);
        }
        if let Some(v) = non_empty("JSON_DEATH_MESSAGES") {
            self.sources.event_patterns = Some(PathBuf::from(v));
        }
        if let Some(v) = non_empty("JSON_USER_WHITELIST") {
            self.sources.subjects = Some(PathBuf::from(v));
        }
        if let Some(v) = non_empty("JSON_DEBUG_BOTS") {
            self.sources.debug_subjects = Some(PathBuf::from(v));
        }
        if let Some(v) = non_empty("JSON_HUMBLED_RESPONSES") {
            self.sources.responses = Some(PathBuf::from(v));
        }
        if let Some(v) = non_empty("MINECRAFT_SEASON") {
            self.season.label = Some(v.trim().to_owned());
        }
    }
}

/// Load configuration from `path` (missing file means defaults), apply
/// process environment overrides, and validate.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed, or if
/// validation fails.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<HumblerConfig> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// [`load_config`] with a custom environment resolver.
///
/// # Errors
///
/// See [`load_config`].
pub fn load_config_with(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<HumblerConfig> {
    let mut config = match path {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("failed to parse config at {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file found, using defaults");
                HumblerConfig::default()
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read config at {}", path.display()));
            }
        },
        None => HumblerConfig::default(),
    };

    config.apply_overrides(env);
    config.validate()?;
    Ok(config)
}

/// Resolve the default state directory (`~/.humbler/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".humbler"))
}

/// Pick the config file: explicit path, `./humbler.toml`, or `~/.humbler/humbler.toml`.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }
    let local = PathBuf::from("humbler.toml");
    if local.exists() {
        return Some(local);
    }
    config_dir()
        .ok()
        .map(|dir| dir.join("humbler.toml"))
        .filter(|p| p.exists())
}

// Default value functions for serde.

fn default_store_path() -> PathBuf {
    PathBuf::from("deaths.db")
}

fn default_footer() -> String {
    DEFAULT_FOOTER.to_owned()
}

fn default_color() -> u32 {
    DEFAULT_COLOR
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_webhook_url_env() -> String {
    "DISCORD_WEBHOOK_URL".to_owned()
}

fn default_telegram_token_env() -> String {
    "HUMBLER_TELEGRAM_TOKEN".to_owned()
}

fn default_disconnect_marker() -> String {
    DEFAULT_DISCONNECT_MARKER.to_owned()
}

fn default_true() -> bool {
    true
}
