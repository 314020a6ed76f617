//! Display status of an occurrence relative to the current time.

use pawcare_core::{ScheduleEntry, Timestamp};

use crate::recurrence::{is_completed, Occurrence};

/// Display status of one occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Taken,
    Overdue,
    DueToday,
    Upcoming,
    /// A one-time dose due on a later day.
    OneTimePending,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::Taken => "taken",
            Status::Overdue => "overdue",
            Status::DueToday => "due today",
            Status::Upcoming => "upcoming",
            Status::OneTimePending => "pending",
        }
    }

    /// Statuses that may trigger a live reminder.
    pub fn is_actionable(self) -> bool {
        matches!(self, Status::Overdue | Status::DueToday)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Label an occurrence of `entry` as seen at `now`.
///
/// `Taken` wins while the entry's taken mark still covers the occurrence;
/// once a newer occurrence is due, that one classifies as overdue or due.
pub fn classify(entry: &ScheduleEntry, occurrence: &Occurrence, now: Timestamp) -> Status {
    if is_completed(entry, occurrence) {
        return Status::Taken;
    }
    if occurrence.due_at < now {
        return Status::Overdue;
    }
    if occurrence.due_at.date() == now.date() {
        return Status::DueToday;
    }
    if entry.recurrence.is_one_time() {
        Status::OneTimePending
    } else {
        Status::Upcoming
    }
}
