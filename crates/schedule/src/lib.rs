//! Recurrence, status and reminder scheduling for pet care schedules.
//!
//! Dependency order, leaves first: [`recurrence`] → [`status`] →
//! [`suppression`] → [`poller`]. [`due`] combines the first two into
//! registry-wide queries for display.

pub mod due;
pub mod poller;
pub mod recurrence;
pub mod status;
pub mod suppression;

pub use due::{due_today, get_due_occurrences, mark_taken, settle, settle_all, DueItem};
pub use poller::{LedgerReader, LedgerSnapshot, NotificationRecord, Poller, PollerHandle, TickReport};
pub use recurrence::{enumerate_due, is_completed, next_due, Occurrence, Occurrences, UNANCHORED_SEQUENCE};
pub use status::{classify, Status};
pub use suppression::{in_quiet_hours, should_notify, suppression_reason, SuppressionReason};
