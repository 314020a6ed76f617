//! Fans a rendered reminder out to every configured channel.
//!
//! Channels are tried in order; a failing channel is logged and the rest
//! still receive the reminder.

use std::future::Future;
use std::time::Instant;

use crate::traits::{DispatchResult, Notification, Notifier, NotifyError};

#[derive(Default)]
pub struct Dispatcher {
    channels: Vec<Box<dyn Notifier>>,
}

impl Dispatcher {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_defaults(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    /// Append a channel.
    pub fn add_default(&mut self, channel: Box<dyn Notifier>) {
        self.channels.push(channel);
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.channel_name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Deliver a reminder about `subject` (a pet id) to every channel.
    pub async fn dispatch(&self, subject: &str, notification: &Notification) -> Vec<DispatchResult> {
        if self.channels.is_empty() {
            tracing::debug!(subject, "No notification channels configured");
            return Vec::new();
        }
        let mut results = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            results.push(deliver(channel.as_ref(), subject, channel.send(notification)).await);
        }
        results
    }

    /// Send each channel's test notification.
    pub async fn test_all(&self) -> Vec<DispatchResult> {
        let mut results = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            results.push(deliver(channel.as_ref(), "test", channel.test()).await);
        }
        results
    }
}

async fn deliver(
    channel: &dyn Notifier,
    subject: &str,
    send: impl Future<Output = Result<(), NotifyError>>,
) -> DispatchResult {
    let started = Instant::now();
    let outcome = send.await;
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let name = channel.channel_name();

    let error = match outcome {
        Ok(()) => {
            tracing::info!(subject, channel = name, duration_ms, "Reminder delivered");
            None
        }
        Err(e) => {
            tracing::warn!(subject, channel = name, error = %e, duration_ms, "Reminder delivery failed");
            Some(e.to_string())
        }
    };

    DispatchResult {
        channel: name.to_string(),
        subject: subject.to_string(),
        success: error.is_none(),
        error,
        duration_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingChannel {
        name: &'static str,
        sends: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Notifier for CountingChannel {
        async fn send(&self, _notification: &Notification) -> Result<(), NotifyError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(NotifyError::Unavailable("relay offline".to_string()))
            } else {
                Ok(())
            }
        }

        fn channel_name(&self) -> &str {
            self.name
        }
    }

    fn channel(name: &'static str, sends: &Arc<AtomicUsize>, fail: bool) -> Box<dyn Notifier> {
        Box::new(CountingChannel {
            name,
            sends: Arc::clone(sends),
            fail,
        })
    }

    fn reminder() -> Notification {
        Notification::new("💊 Apoquel for Biscuit", "1 tab due at 08:00")
    }

    #[tokio::test]
    async fn every_channel_receives_the_reminder() {
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::with_defaults(vec![channel("a", &a, false), channel("b", &b, false)]);

        let results = dispatcher.dispatch("pet-1", &reminder()).await;
        assert!(results.iter().all(|r| r.success && r.subject == "pet-1"));
        assert_eq!((a.load(Ordering::SeqCst), b.load(Ordering::SeqCst)), (1, 1));
        assert_eq!(dispatcher.channel_names(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn failing_channel_does_not_block_the_next() {
        let broken = Arc::new(AtomicUsize::new(0));
        let ok = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::with_defaults(vec![channel("broken", &broken, true)]);
        dispatcher.add_default(channel("ok", &ok, false));

        let results = dispatcher.dispatch("pet-1", &reminder()).await;
        assert!(!results[0].success);
        assert!(results[0].error.as_deref().unwrap_or_default().contains("relay offline"));
        assert!(results[1].success);
        assert_eq!(ok.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_uses_each_channel() {
        let sends = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::with_defaults(vec![channel("a", &sends, false), channel("b", &sends, true)]);

        let results = dispatcher.test_all().await;
        assert_eq!(sends.load(Ordering::SeqCst), 2);
        assert_eq!(results.iter().filter(|r| r.success).count(), 1);
    }

    #[tokio::test]
    async fn empty_dispatcher_sends_nothing() {
        let dispatcher = Dispatcher::empty();
        assert!(dispatcher.is_empty());
        assert!(dispatcher.dispatch("nobody", &reminder()).await.is_empty());
    }
}
