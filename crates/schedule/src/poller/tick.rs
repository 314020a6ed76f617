use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use pawcare_core::{time::format_timestamp, Pet, ScheduleEntry, Timestamp};
use pawcare_notify::{Notification, ReminderContext, ReminderRenderer};

use super::Poller;
use crate::recurrence::{enumerate_due, Occurrence};
use crate::status::{classify, Status};
use crate::suppression::suppression_reason;

/// Counters for one poll tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub pets_checked: usize,
    /// Overdue or due occurrences inside the lookahead window.
    pub candidates: usize,
    pub suppressed: usize,
    pub already_notified: usize,
    pub notified: usize,
    pub channel_failures: usize,
}

impl TickReport {
    pub fn log(&self) {
        if self.notified > 0 || self.channel_failures > 0 {
            info!(
                pets = self.pets_checked,
                notified = self.notified,
                suppressed = self.suppressed,
                failures = self.channel_failures,
                "Poll tick"
            );
        } else {
            debug!(
                pets = self.pets_checked,
                candidates = self.candidates,
                suppressed = self.suppressed,
                "Poll tick"
            );
        }
    }
}

impl Poller {
    /// Run one poll pass as of `now`.
    ///
    /// Works on a registry snapshot, so entries edited or removed by the
    /// foreground mid-tick are seen on the next tick. Channel failures are
    /// logged and counted; they never abort the pass.
    pub async fn tick_at(&mut self, now: Timestamp) -> TickReport {
        let registry = self.snapshot();
        let lookahead = self.config.lookahead();
        self.ledger.roll_day(now.date(), lookahead);

        let window_start = now.checked_sub_signed(lookahead).unwrap_or(NaiveDateTime::MIN);
        let window_end = now.checked_add_signed(lookahead).unwrap_or(NaiveDateTime::MAX);
        let mut report = TickReport::default();

        for pet in registry.pets().filter(|p| p.has_reminders()) {
            report.pets_checked += 1;
            let suppressed = suppression_reason(&pet.suppression, now);

            for entry in pet.schedules.iter().filter(|e| e.reminder_enabled) {
                for occurrence in enumerate_due(entry, window_start, window_end) {
                    let status = classify(entry, &occurrence, now);
                    if !status.is_actionable() {
                        continue;
                    }
                    report.candidates += 1;

                    if let Some(reason) = suppressed {
                        debug!(pet = %pet.id, entry = %occurrence.entry_ref, %reason, "Reminder suppressed");
                        report.suppressed += 1;
                        continue;
                    }
                    if !self.ledger.record(&occurrence) {
                        report.already_notified += 1;
                        continue;
                    }

                    let notification = self.render(pet, entry, &occurrence, status);
                    let results = self.dispatcher.dispatch(pet.id.as_str(), &notification).await;
                    report.notified += 1;
                    report.channel_failures += results.iter().filter(|r| !r.success).count();
                }
            }
        }

        report
    }

    fn render(
        &self,
        pet: &Pet,
        entry: &ScheduleEntry,
        occurrence: &Occurrence,
        status: Status,
    ) -> Notification {
        let ctx = ReminderContext {
            pet: pet.name.clone(),
            label: entry.label.clone(),
            dose: entry.dose_or_amount.clone(),
            kind: entry.kind.to_string(),
            due_at: format_timestamp(&occurrence.due_at),
            status: status.label().to_string(),
            recurrence: entry.recurrence.to_string(),
        };
        self.renderer.render(&ctx).unwrap_or_else(|e| {
            warn!(error = %e, "Reminder template failed, using built-in text");
            ReminderRenderer::render_fallback(&ctx)
        })
    }
}
