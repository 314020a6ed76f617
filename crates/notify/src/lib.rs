//! Reminder delivery for pawcare.
//!
//! This crate provides:
//! - `Notifier` trait, the abstract `notify(title, message)` capability
//! - Console and webhook notifier implementations
//! - Minijinja rendering of reminder titles and messages
//! - Dispatcher that fans a reminder out to every configured channel

pub mod console;
pub mod dispatcher;
pub mod templating;
pub mod traits;
pub mod webhook;

pub use console::ConsoleNotifier;
pub use dispatcher::Dispatcher;
pub use templating::{ReminderContext, ReminderRenderer};
pub use traits::{DispatchResult, Notification, Notifier, NotifyError};
pub use webhook::WebhookNotifier;
