//! Snooze and quiet-hours gating of live reminders.
//!
//! The policy is per pet and knows nothing about which occurrence asked.

use chrono::NaiveTime;

use pawcare_core::{QuietHours, SuppressionWindow, Timestamp};

/// Why reminders for a pet are held back right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressionReason {
    Snoozed { until: Timestamp },
    QuietHours(QuietHours),
}

impl std::fmt::Display for SuppressionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuppressionReason::Snoozed { until } => {
                write!(f, "snoozed until {}", until.format("%Y-%m-%d %H:%M"))
            }
            SuppressionReason::QuietHours(q) => write!(
                f,
                "quiet hours {}-{}",
                q.start.format("%H:%M"),
                q.end.format("%H:%M")
            ),
        }
    }
}

/// Whether `time` falls in `[start, end)`, wrapping midnight when
/// `start > end`. An empty interval (`start == end`) contains nothing.
pub fn in_quiet_hours(quiet: &QuietHours, time: NaiveTime) -> bool {
    if quiet.wraps_midnight() {
        time >= quiet.start || time < quiet.end
    } else {
        quiet.start <= time && time < quiet.end
    }
}

/// The active suppression for `window` at `now`, if any. Snooze wins.
pub fn suppression_reason(window: &SuppressionWindow, now: Timestamp) -> Option<SuppressionReason> {
    if let Some(until) = window.snooze_until {
        if now < until {
            return Some(SuppressionReason::Snoozed { until });
        }
    }
    window
        .quiet_hours
        .filter(|q| in_quiet_hours(q, now.time()))
        .map(SuppressionReason::QuietHours)
}

pub fn should_notify(window: &SuppressionWindow, now: Timestamp) -> bool {
    suppression_reason(window, now).is_none()
}
