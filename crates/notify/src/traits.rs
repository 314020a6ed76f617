//! The reminder delivery seam: the `Notifier` trait and its error type.

use std::collections::HashMap;

/// Why a channel could not deliver a reminder.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel unavailable: {0}")]
    Unavailable(String),
}

/// A rendered reminder ready for delivery.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Notification {
    /// Short headline (e.g. "💊 Apoquel for Biscuit").
    pub title: String,
    /// Longer message body.
    pub message: String,
    /// Additional metadata (pet, entry, due time, status).
    pub metadata: HashMap<String, String>,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// A place reminders can be sent: the terminal, a webhook.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one reminder.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Send a harmless sample reminder, used by `pawcare test-notify`.
    async fn test(&self) -> Result<(), NotifyError> {
        let test_notification = Notification::new(
            "[TEST] pawcare reminder",
            "This is a test reminder from pawcare.",
        )
        .with_meta("event", "test");
        self.send(&test_notification).await
    }

    /// Human-readable name for this channel (e.g., "console", "webhook").
    fn channel_name(&self) -> &str;
}

/// Outcome of one channel's delivery attempt.
#[derive(Debug)]
pub struct DispatchResult {
    pub channel: String,
    pub subject: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}
