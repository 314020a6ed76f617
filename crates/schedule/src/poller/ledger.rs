use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use chrono::{Duration, NaiveDate, NaiveTime};

use pawcare_core::EntryRef;

use crate::recurrence::{sequence_of, Occurrence};

/// Occurrences already notified on one calendar day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub day: Option<NaiveDate>,
    pub fired: HashSet<(EntryRef, i64)>,
}

impl LedgerSnapshot {
    pub fn contains(&self, occurrence: &Occurrence) -> bool {
        self.fired
            .contains(&(occurrence.entry_ref.clone(), occurrence.sequence_index))
    }

    pub fn len(&self) -> usize {
        self.fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }
}

/// The poller's record of delivered reminders.
///
/// Only the poller writes to it. Readers get a [`LedgerReader`] and copy
/// the whole set out under a short read lock.
#[derive(Debug, Default)]
pub struct NotificationRecord {
    state: Arc<RwLock<LedgerSnapshot>>,
}

impl NotificationRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reader(&self) -> LedgerReader {
        LedgerReader {
            state: Arc::clone(&self.state),
        }
    }

    /// Forget what was recorded on an earlier day.
    ///
    /// Occurrences due within `grace` before midnight are kept, since a
    /// lookahead window straddling midnight still sees them.
    pub fn roll_day(&mut self, today: NaiveDate, grace: Duration) {
        let mut state = self.state.write().unwrap_or_else(|p| p.into_inner());
        if state.day == Some(today) {
            return;
        }
        let midnight = today.and_time(NaiveTime::MIN);
        let cutoff = sequence_of(midnight.checked_sub_signed(grace).unwrap_or(midnight));
        let before = state.fired.len();
        state.fired.retain(|(_, sequence)| *sequence >= cutoff);
        if before > 0 {
            tracing::debug!(cleared = before - state.fired.len(), %today, "Notification ledger rolled over");
        }
        state.day = Some(today);
    }

    /// Record an occurrence. Returns `false` if it was already recorded.
    pub fn record(&mut self, occurrence: &Occurrence) -> bool {
        let mut state = self.state.write().unwrap_or_else(|p| p.into_inner());
        state
            .fired
            .insert((occurrence.entry_ref.clone(), occurrence.sequence_index))
    }
}

/// Read-only, cloneable view of a [`NotificationRecord`].
#[derive(Debug, Clone)]
pub struct LedgerReader {
    state: Arc<RwLock<LedgerSnapshot>>,
}

impl LedgerReader {
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.state
            .read()
            .map(|s| s.clone())
            .unwrap_or_else(|p| p.into_inner().clone())
    }
}
