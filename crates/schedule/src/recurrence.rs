//! Occurrence enumeration for schedule entries.
//!
//! Everything here is a pure function of the entry, the query window and
//! (for [`next_due`]) the current time. Nothing is cached: the next due
//! instant is always recomputed from `anchor_time` + `recurrence`.

use chrono::{Duration, NaiveDateTime, NaiveTime};
use tracing::debug;

use pawcare_core::{EntryRef, Recurrence, ScheduleEntry, Timestamp};

/// Sequence index of the fail-open occurrence of an entry with no usable
/// anchor. It is the same for every window, so such an entry notifies at
/// most once per notification ledger lifetime.
pub const UNANCHORED_SEQUENCE: i64 = -1;

/// One concrete due instant of a schedule entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Occurrence {
    pub entry_ref: EntryRef,
    pub due_at: Timestamp,
    /// Stable de-duplication key: whole minutes since the Unix epoch of
    /// `due_at`, or [`UNANCHORED_SEQUENCE`].
    pub sequence_index: i64,
}

impl Occurrence {
    pub fn is_unanchored(&self) -> bool {
        self.sequence_index == UNANCHORED_SEQUENCE
    }
}

pub(crate) fn sequence_of(due_at: Timestamp) -> i64 {
    due_at.and_utc().timestamp().div_euclid(60)
}

/// Ceiling division for a positive divisor.
fn ceil_div(numerator: i64, divisor: i64) -> i64 {
    -((-numerator).div_euclid(divisor))
}

#[derive(Debug, Clone, Copy)]
enum Step {
    /// Exact duration arithmetic.
    Interval(Duration),
    /// Whole calendar days, always landing on the same wall-clock time.
    Daily { days: u32, at: NaiveTime },
}

impl Step {
    fn period_secs(self) -> i64 {
        match self {
            Step::Interval(d) => d.num_seconds(),
            Step::Daily { days, .. } => i64::from(days) * 86_400,
        }
    }

    /// The `k`-th occurrence counted from `base`, `None` past the calendar range.
    fn nth(self, base: Timestamp, k: i64) -> Option<Timestamp> {
        match self {
            Step::Interval(d) => {
                let offset = Duration::try_seconds(d.num_seconds().checked_mul(k)?)?;
                base.checked_add_signed(offset)
            }
            Step::Daily { days, at } => {
                let offset = Duration::try_days(i64::from(days).checked_mul(k)?)?;
                Some(base.date().checked_add_signed(offset)?.and_time(at))
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Plan {
    Exhausted,
    Single { due: Timestamp, sequence: i64 },
    Series { base: Timestamp, step: Step, next: i64 },
}

/// Lazy, finite, ascending sequence of occurrences inside a window.
///
/// Created by [`enumerate_due`]. Iterating twice over two sequences built
/// from identical inputs yields identical output.
#[derive(Debug, Clone)]
pub struct Occurrences {
    entry_ref: EntryRef,
    plan: Plan,
    window_start: Timestamp,
    window_end: Timestamp,
}

impl Iterator for Occurrences {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        loop {
            let (due, sequence) = match &mut self.plan {
                Plan::Exhausted => return None,
                Plan::Single { due, sequence } => {
                    let out = (*due, *sequence);
                    self.plan = Plan::Exhausted;
                    out
                }
                Plan::Series { base, step, next } => match step.nth(*base, *next) {
                    Some(due) => {
                        *next += 1;
                        (due, sequence_of(due))
                    }
                    None => {
                        self.plan = Plan::Exhausted;
                        return None;
                    }
                },
            };

            if due < self.window_start {
                continue;
            }
            if due > self.window_end {
                self.plan = Plan::Exhausted;
                return None;
            }
            return Some(Occurrence {
                entry_ref: self.entry_ref.clone(),
                due_at: due,
                sequence_index: sequence,
            });
        }
    }
}

/// True when the entry has nothing to seed its recurrence from.
pub fn is_unanchored(entry: &ScheduleEntry) -> bool {
    entry.anchor_time.is_none() && (entry.time_of_day.is_none() || entry.recurrence.is_one_time())
}

/// Enumerate every occurrence of `entry` with
/// `window_start <= due_at <= window_end`, in ascending order.
///
/// * `OneTime` yields at most its anchor, and nothing once taken.
/// * `FixedInterval` walks forward from the anchor in exact hour steps.
///   Without an anchor, `time_of_day` on the window's start date seeds the
///   series.
/// * `Calendar` with a `time_of_day` steps whole days from the first such
///   clock time at or after the anchor; without one it behaves like a
///   fixed interval.
///
/// Occurrences before the seed are never produced. Missed occurrences
/// are produced only when they fall inside the window.
///
/// An entry with no anchor to seed from fails open: it yields a single
/// occurrence at `window_start` carrying [`UNANCHORED_SEQUENCE`].
pub fn enumerate_due(
    entry: &ScheduleEntry,
    window_start: Timestamp,
    window_end: Timestamp,
) -> Occurrences {
    let plan = if window_end < window_start {
        Plan::Exhausted
    } else {
        plan_for(entry, window_start)
    };
    Occurrences {
        entry_ref: entry.entry_ref(),
        plan,
        window_start,
        window_end,
    }
}

fn plan_for(entry: &ScheduleEntry, window_start: Timestamp) -> Plan {
    if is_unanchored(entry) {
        if entry.recurrence.is_one_time() && entry.taken_state.taken {
            return Plan::Exhausted;
        }
        debug!(entry = %entry.entry_ref(), "No anchor, treating entry as due now");
        return Plan::Single {
            due: window_start,
            sequence: UNANCHORED_SEQUENCE,
        };
    }

    let step = match entry.recurrence {
        Recurrence::OneTime => {
            return match (entry.taken_state.taken, entry.anchor_time) {
                (false, Some(due)) => Plan::Single {
                    due,
                    sequence: sequence_of(due),
                },
                _ => Plan::Exhausted,
            };
        }
        Recurrence::FixedInterval { hours } => {
            Step::Interval(Duration::hours(i64::from(hours.get())))
        }
        Recurrence::Calendar { unit } => match entry.time_of_day {
            Some(at) => Step::Daily {
                days: unit.days(),
                at,
            },
            None => Step::Interval(Duration::hours(i64::from(unit.hours()))),
        },
    };

    let seed = match (entry.anchor_time, entry.time_of_day) {
        (Some(anchor), _) => anchor,
        (None, Some(at)) => window_start.date().and_time(at),
        (None, None) => return Plan::Exhausted,
    };
    let base = match step {
        Step::Daily { at, .. } => first_daily_slot(seed, at),
        Step::Interval(_) => seed,
    };

    let behind = (window_start - base).num_seconds();
    let first = ceil_div(behind, step.period_secs()).max(0);
    Plan::Series {
        base,
        step,
        next: first,
    }
}

/// The first `at` clock time on or after `seed`.
fn first_daily_slot(seed: Timestamp, at: NaiveTime) -> Timestamp {
    let same_day = seed.date().and_time(at);
    if same_day >= seed {
        return same_day;
    }
    seed.date()
        .succ_opt()
        .map_or(same_day, |next_day| next_day.and_time(at))
}

/// Whether the entry's taken state covers this occurrence.
///
/// While taken, the mark covers every occurrence up to the later of the
/// anchor and the time it was given. Once [`settle`](crate::settle) clears
/// the mark, `taken_at` keeps covering the occurrences given before it.
pub fn is_completed(entry: &ScheduleEntry, occurrence: &Occurrence) -> bool {
    let state = entry.taken_state;
    if entry.recurrence.is_one_time() {
        return state.taken;
    }
    let cover = if state.taken {
        entry.anchor_time.into_iter().chain(state.taken_at).max()
    } else {
        state.taken_at
    };
    cover.is_some_and(|cover| occurrence.due_at <= cover)
}

/// The occurrence the user should act on next.
///
/// That is the latest occurrence at or before `now` when it is not yet
/// taken, otherwise the first later occurrence that is not taken. `None`
/// once a one-time entry is done.
pub fn next_due(entry: &ScheduleEntry, now: Timestamp) -> Option<Occurrence> {
    if is_unanchored(entry) {
        return enumerate_due(entry, now, now).next();
    }

    let Some(period) = entry.recurrence.period() else {
        return enumerate_due(entry, NaiveDateTime::MIN, NaiveDateTime::MAX).next();
    };

    let from = now.checked_sub_signed(period).unwrap_or(NaiveDateTime::MIN);
    let mut current: Option<Occurrence> = None;
    for occurrence in enumerate_due(entry, from, NaiveDateTime::MAX) {
        if occurrence.due_at <= now {
            current = Some(occurrence);
            continue;
        }
        if let Some(slot) = current.take() {
            if !is_completed(entry, &slot) {
                return Some(slot);
            }
        }
        if !is_completed(entry, &occurrence) {
            return Some(occurrence);
        }
    }
    current.filter(|slot| !is_completed(entry, slot))
}
