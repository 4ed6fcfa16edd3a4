//! Push notifications via an ntfy-style topic endpoint.
//!
//! Best effort: an unconfigured topic is a silent no-op, delivery failures
//! are logged and swallowed, nothing is retried.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::NotifyConfig;
use crate::error::NotifyError;

/// Maximum characters per summary bullet.
pub const MAX_ITEM_CHARS: usize = 120;

/// Urgency of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Default,
    High,
}

impl Priority {
    fn header_value(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::High => "high",
        }
    }
}

/// A single push notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub priority: Priority,
    pub tags: Vec<String>,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            priority: Priority::Default,
            tags: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// Delivery of run summaries and crash reports.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Send and swallow any failure.
pub async fn send_best_effort(notifier: &dyn Notifier, notification: &Notification) {
    if let Err(e) = notifier.send(notification).await {
        warn!(error = %e, title = %notification.title, "Notification failed");
    }
}

/// Truncate to `max` characters, marking the cut with `…`.
pub fn truncate_item(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}

/// Render a bulleted list, each bullet truncated to `MAX_ITEM_CHARS`.
pub fn bullet_list<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|item| format!("• {}", truncate_item(item.as_ref(), MAX_ITEM_CHARS)))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── ntfy ────────────────────────────────────────────────────────────

/// Posts to `<server>/<topic>`. No topic means every send is skipped.
pub struct NtfyNotifier {
    http: reqwest::Client,
    server: String,
    topic: Option<String>,
}

impl NtfyNotifier {
    pub fn new(http: reqwest::Client, config: &NotifyConfig) -> Self {
        Self {
            http,
            server: config.server.clone(),
            topic: config.topic.clone(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.topic.is_some()
    }
}

#[async_trait]
impl Notifier for NtfyNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let Some(topic) = self.topic.as_deref() else {
            debug!(title = %notification.title, "No notification topic configured, skipping");
            return Ok(());
        };

        let mut request = self
            .http
            .post(format!("{}/{topic}", self.server))
            .header("Title", notification.title.as_str())
            .header("Priority", notification.priority.header_value())
            .body(notification.body.clone());
        if !notification.tags.is_empty() {
            request = request.header("Tags", notification.tags.join(","));
        }

        let resp = request.send().await.map_err(|e| NotifyError::SendFailed {
            topic: topic.to_string(),
            reason: e.to_string(),
        })?;
        if !resp.status().is_success() {
            return Err(NotifyError::SendFailed {
                topic: topic.to_string(),
                reason: format!("HTTP {}", resp.status()),
            });
        }
        debug!(topic = %topic, title = %notification.title, "Notification sent");
        Ok(())
    }
}
