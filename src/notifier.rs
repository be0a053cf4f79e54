//! Outbound event notifications.
//!
//! The tailer hands each accepted event to a [`Notifier`]. Delivery is
//! best-effort: the tailer bounds every send with a timeout, logs failures,
//! and never retries.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::Serialize;
use serde_json::json;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::{info, warn};

use crate::error::TailError;
use crate::store::DeathRecord;
use crate::telegram::ui::escape_html;

/// Title used when no response templates are configured.
pub const FALLBACK_TITLE: &str = "Humbled!";

/// Default embed colour.
pub const DEFAULT_COLOR: u32 = 0x00B7_FF00;

/// Default footer text.
pub const DEFAULT_FOOTER: &str = "Brought to you by the Humbler gang.";

/// A structured notification for one accepted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Short headline.
    pub title: String,
    /// Event text with counts.
    pub description: String,
    /// 24-bit colour hint for sinks that support it.
    pub color_hint: u32,
    /// Footer line.
    pub footer: String,
}

/// Sink for [`Notification`]s.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    async fn send(&self, event: &Notification) -> Result<(), TailError>;
}

/// Static parts of every notification.
#[derive(Debug, Clone)]
pub struct NotificationStyle {
    /// Colour hint.
    pub color: u32,
    /// Footer text.
    pub footer: String,
}

impl Default for NotificationStyle {
    fn default() -> Self {
        Self {
            color: DEFAULT_COLOR,
            footer: DEFAULT_FOOTER.to_owned(),
        }
    }
}

/// Build the notification for an accepted event.
///
/// The title is a random pick from `responses`. The description carries
/// the season count when the record has a season label.
pub fn build_notification(
    transformed: &str,
    record: &DeathRecord,
    responses: &[String],
    style: &NotificationStyle,
) -> Notification {
    let title = responses
        .choose(&mut rand::thread_rng())
        .map(|r| r.trim().to_owned())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| FALLBACK_TITLE.to_owned());

    let transformed = transformed.trim();
    let description = match record.period_label.as_deref() {
        Some(season) => format!(
            "{transformed} (Season {season} Deaths: {period}, Total Deaths: {total})",
            period = record.period_count,
            total = record.total_count,
        ),
        None => format!(
            "{transformed} (Total Deaths: {total})",
            total = record.total_count
        ),
    };

    Notification {
        title,
        description,
        color_hint: style.color,
        footer: style.footer.clone(),
    }
}

/// Send with a deadline; a timeout counts as a failed delivery.
///
/// # Errors
///
/// Returns [`TailError::SinkDelivery`] on sink failure or timeout.
pub async fn send_with_timeout(
    notifier: &dyn Notifier,
    event: &Notification,
    timeout: Duration,
) -> Result<(), TailError> {
    match tokio::time::timeout(timeout, notifier.send(event)).await {
        Ok(result) => result,
        Err(_) => Err(TailError::SinkDelivery(format!(
            "timed out after {}ms",
            timeout.as_millis()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Webhook
// ---------------------------------------------------------------------------

/// Posts rich embeds to a chat webhook URL.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookNotifier")
            .field("url", &"[REDACTED]")
            .finish()
    }
}

impl WebhookNotifier {
    /// Create a notifier for `url`, with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build webhook client: {e}"))?;
        Ok(Self { client, url })
    }

    /// JSON body for one notification.
    pub fn payload(event: &Notification) -> serde_json::Value {
        json!({
            "embeds": [{
                "type": "rich",
                "title": event.title,
                "description": event.description,
                "color": event.color_hint,
                "footer": { "text": event.footer },
            }]
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, event: &Notification) -> Result<(), TailError> {
        let response = self
            .client
            .post(&self.url)
            .json(&Self::payload(event))
            .send()
            .await
            .map_err(|e| TailError::SinkDelivery(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TailError::SinkDelivery(format!("webhook returned {status}")));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Telegram
// ---------------------------------------------------------------------------

/// Sends notifications as HTML messages to Telegram chats.
///
/// Uses the teloxide `Bot` directly (send-only, no dispatcher).
pub struct TelegramNotifier {
    bot: Bot,
    chats: Vec<i64>,
}

impl TelegramNotifier {
    /// Create a notifier for the given bot token and chat IDs.
    pub fn new(bot_token: &str, chats: Vec<i64>) -> Self {
        Self {
            bot: Bot::new(bot_token),
            chats,
        }
    }

    /// Render a notification as Telegram HTML.
    pub fn render(event: &Notification) -> String {
        format!(
            "<b>{title}</b>\n\n{description}\n\n<i>{footer}</i>",
            title = escape_html(&event.title),
            description = escape_html(&event.description),
            footer = escape_html(&event.footer),
        )
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, event: &Notification) -> Result<(), TailError> {
        if self.chats.is_empty() {
            return Ok(());
        }
        let text = Self::render(event);
        let mut any_sent = false;
        for &chat in &self.chats {
            match self
                .bot
                .send_message(ChatId(chat), &text)
                .parse_mode(ParseMode::Html)
                .await
            {
                Ok(_) => any_sent = true,
                Err(e) => warn!(chat, error = %e, "failed to send Telegram message"),
            }
        }
        if !any_sent {
            return Err(TailError::SinkDelivery(
                "failed to send Telegram message to any configured chat".to_owned(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Log + fan-out
// ---------------------------------------------------------------------------

/// Writes notifications to the log. Used when no sink is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, event: &Notification) -> Result<(), TailError> {
        info!(title = %event.title, description = %event.description, "humbling");
        Ok(())
    }
}

/// Delivers to every inner sink; succeeds if at least one succeeds.
pub struct FanoutNotifier {
    sinks: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    /// Combine several sinks.
    pub fn new(sinks: Vec<Arc<dyn Notifier>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    async fn send(&self, event: &Notification) -> Result<(), TailError> {
        let mut last_err = None;
        let mut any_sent = false;
        for sink in &self.sinks {
            match sink.send(event).await {
                Ok(()) => any_sent = true,
                Err(e) => {
                    warn!(error = %e, "notification sink failed");
                    last_err = Some(e);
                }
            }
        }
        match (any_sent, last_err) {
            (false, Some(e)) => Err(e),
            _ => Ok(()),
        }
    }
}
