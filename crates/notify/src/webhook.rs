//! HTTP webhook notifier.
//!
//! Delivers reminders as JSON payloads to a configured URL, e.g. a phone
//! push relay or a home-automation hook.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Method;
use serde::Serialize;

use crate::traits::{Notification, Notifier, NotifyError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON body sent for every reminder. Metadata keys are lifted to the top
/// level so receivers can template on `pet` or `due_at` directly.
#[derive(Debug, Serialize)]
struct ReminderPayload<'a> {
    source: &'static str,
    title: &'a str,
    message: &'a str,
    #[serde(flatten)]
    metadata: &'a HashMap<String, String>,
}

impl<'a> From<&'a Notification> for ReminderPayload<'a> {
    fn from(n: &'a Notification) -> Self {
        Self {
            source: "pawcare",
            title: &n.title,
            message: &n.message,
            metadata: &n.metadata,
        }
    }
}

/// Posts reminders to an HTTP endpoint.
///
/// `${VAR}` references in the URL and header values are expanded from the
/// environment once, when the notifier is built.
#[derive(Debug)]
pub struct WebhookNotifier {
    url: String,
    method: Method,
    headers: Vec<(String, String)>,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(
        url: &str,
        method: Option<Method>,
        headers: HashMap<String, String>,
    ) -> Result<Self, NotifyError> {
        let url = expand_env(url)?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(NotifyError::Config(format!(
                "webhook url must be http(s): {url}"
            )));
        }

        let mut headers = headers
            .into_iter()
            .map(|(name, value)| Ok((name, expand_env(&value)?)))
            .collect::<Result<Vec<_>, NotifyError>>()?;
        headers.sort();

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            url,
            method: method.unwrap_or(Method::POST),
            headers,
            client,
        })
    }

    /// Build from the `[webhook]` table of the config file. The method name
    /// is case-insensitive.
    pub fn from_config(
        url: &str,
        method: Option<&str>,
        headers: Option<HashMap<String, String>>,
    ) -> Result<Self, NotifyError> {
        let method = method
            .map(|m| {
                Method::from_bytes(m.trim().to_uppercase().as_bytes())
                    .map_err(|_| NotifyError::Config(format!("invalid HTTP method: {m}")))
            })
            .transpose()?;
        Self::new(url, method, headers.unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let request = self
            .headers
            .iter()
            .fold(
                self.client.request(self.method.clone(), &self.url),
                |req, (name, value)| req.header(name.as_str(), value.as_str()),
            )
            .json(&ReminderPayload::from(notification));

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Unavailable(format!(
                "webhook answered {status}: {}",
                body.trim()
            )));
        }

        tracing::debug!(url = %self.url, %status, "Webhook reminder delivered");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}

/// Replace each `${NAME}` with the value of environment variable `NAME`.
fn expand_env(input: &str) -> Result<String, NotifyError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let close = after.find('}').ok_or_else(|| {
            NotifyError::Config(format!("unterminated ${{...}} in: {input}"))
        })?;
        let name = &after[..close];
        let value = std::env::var(name)
            .map_err(|_| NotifyError::Config(format!("environment variable {name} is not set")))?;
        out.push_str(&value);
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
