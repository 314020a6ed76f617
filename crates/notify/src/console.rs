//! Console notifier: prints reminders to the terminal.

use std::io::Write;

use crate::traits::{Notification, Notifier, NotifyError};

/// Writes `[title] message` lines to stdout.
#[derive(Debug, Default)]
pub struct ConsoleNotifier {
    /// Ring the terminal bell before each reminder.
    bell: bool,
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bell(mut self, bell: bool) -> Self {
        self.bell = bell;
        self
    }

    /// Format a notification as a single console line.
    pub fn format_line(notification: &Notification) -> String {
        format!("[{}] {}", notification.title, notification.message)
    }

    fn write_line(&self, notification: &Notification) -> std::io::Result<()> {
        let mut stdout = std::io::stdout().lock();
        if self.bell {
            write!(stdout, "\x07")?;
        }
        writeln!(stdout, "{}", Self::format_line(notification))?;
        stdout.flush()
    }
}

#[async_trait::async_trait]
impl Notifier for ConsoleNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.write_line(notification)
            .map_err(|e| NotifyError::Unavailable(e.to_string()))
    }

    fn channel_name(&self) -> &str {
        "console"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_format() {
        let n = Notification::new("💊 Apoquel for Biscuit", "1 tab due at 08:00 (overdue)");
        assert_eq!(
            ConsoleNotifier::format_line(&n),
            "[💊 Apoquel for Biscuit] 1 tab due at 08:00 (overdue)"
        );
    }

    #[tokio::test]
    async fn send_succeeds() {
        let notifier = ConsoleNotifier::new();
        assert_eq!(notifier.channel_name(), "console");
        notifier
            .send(&Notification::new("title", "message"))
            .await
            .unwrap();
    }
}
