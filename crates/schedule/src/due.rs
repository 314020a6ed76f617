//! Registry-wide due queries and the taken-state transitions.

use chrono::{Duration, NaiveTime};
use tracing::{debug, info};

use pawcare_core::{
    EntryRef, PawError, PetId, Recurrence, Registry, ScheduleEntry, ScheduleKind, TakenState,
    Timestamp,
};

use crate::recurrence::{enumerate_due, is_completed, Occurrence};
use crate::status::{classify, Status};

/// One labelled occurrence, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct DueItem {
    pub pet_id: PetId,
    pub pet_name: String,
    pub entry: ScheduleEntry,
    pub occurrence: Occurrence,
    pub status: Status,
}

/// Every occurrence of every entry inside `[window_start, window_end]`,
/// classified at `now` and sorted by due time. Ties keep registry order.
pub fn get_due_occurrences(
    registry: &Registry,
    window_start: Timestamp,
    window_end: Timestamp,
    now: Timestamp,
) -> Vec<DueItem> {
    let mut items = Vec::new();
    for pet in registry.pets() {
        for entry in &pet.schedules {
            for occurrence in enumerate_due(entry, window_start, window_end) {
                let status = classify(entry, &occurrence, now);
                items.push(DueItem {
                    pet_id: pet.id.clone(),
                    pet_name: pet.name.clone(),
                    entry: entry.clone(),
                    occurrence,
                    status,
                });
            }
        }
    }
    items.sort_by_key(|item| item.occurrence.due_at);
    items
}

/// Medication occurrences falling on `now`'s calendar day.
pub fn due_today(registry: &Registry, now: Timestamp) -> Vec<DueItem> {
    let day = now.date();
    let start = day.and_time(NaiveTime::MIN);
    let end = start + Duration::days(1) - Duration::seconds(1);
    get_due_occurrences(registry, start, end, now)
        .into_iter()
        .filter(|item| item.entry.kind == ScheduleKind::Medication)
        .collect()
}

/// Mark `occurrence` of the referenced entry as given at `now`.
///
/// Interval entries are re-anchored to the later of `now` and the
/// occurrence's due time, so the next cycle is computed from the current
/// time rather than the stale anchor. Calendar entries with a clock time
/// stay on that clock time.
pub fn mark_taken(
    registry: &mut Registry,
    entry_ref: &EntryRef,
    occurrence: &Occurrence,
    now: Timestamp,
) -> Result<(), PawError> {
    if occurrence.entry_ref != *entry_ref {
        return Err(PawError::Other(format!(
            "occurrence belongs to {}, not {entry_ref}",
            occurrence.entry_ref
        )));
    }
    let entry = registry
        .entry_mut(entry_ref)
        .ok_or_else(|| PawError::EntryNotFound(entry_ref.to_string()))?;

    entry.taken_state = TakenState::taken_at(now);
    match entry.recurrence {
        Recurrence::OneTime => {
            entry.anchor_time.get_or_insert(occurrence.due_at);
        }
        Recurrence::Calendar { .. } if entry.time_of_day.is_some() => {
            entry.anchor_time = Some(occurrence.due_at);
        }
        _ => entry.anchor_time = Some(now.max(occurrence.due_at)),
    }

    info!(
        entry = %entry_ref,
        label = %entry.label,
        due_at = %occurrence.due_at,
        "Marked taken"
    );
    Ok(())
}

/// Clear the taken mark once a newer occurrence than the taken one is due.
///
/// `taken_at` is moved to the end of what the mark covered, so the doses
/// already given keep reading as taken.
///
/// Returns `true` when the entry changed. One-time entries stay taken.
pub fn settle(entry: &mut ScheduleEntry, now: Timestamp) -> bool {
    if !entry.taken_state.taken || entry.recurrence.is_one_time() {
        return false;
    }
    let from = entry
        .anchor_time
        .into_iter()
        .chain(entry.taken_state.taken_at)
        .max();
    let Some(from) = from else {
        return false;
    };

    let newer_due = enumerate_due(entry, from, now).any(|o| !is_completed(entry, &o));
    if newer_due {
        debug!(entry = %entry.entry_ref(), "New cycle due, clearing taken mark");
        entry.taken_state = TakenState {
            taken: false,
            taken_at: Some(from),
        };
    }
    newer_due
}

/// [`settle`] every entry in the registry. Returns how many changed.
pub fn settle_all(registry: &mut Registry, now: Timestamp) -> usize {
    registry
        .pets_mut()
        .flat_map(|pet| pet.schedules.iter_mut())
        .map(|entry| settle(entry, now))
        .filter(|changed| *changed)
        .count()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;
    use pawcare_core::CalendarUnit;

    use super::*;
    use crate::recurrence::next_due;

    fn ts(s: &str) -> Timestamp {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn registry_with(entries: Vec<ScheduleEntry>) -> (Registry, PetId, Vec<EntryRef>) {
        let mut registry = Registry::new();
        let pet = registry.add_pet("Biscuit").unwrap();
        let refs = entries
            .into_iter()
            .map(|e| registry.add_entry(&pet, e).unwrap())
            .collect();
        (registry, pet, refs)
    }

    #[test]
    fn due_occurrences_are_sorted_across_entries() {
        let (registry, _, _) = registry_with(vec![
            ScheduleEntry::new(PetId::new(""), "Apoquel", "1 tab", Recurrence::fixed_interval(12).unwrap())
                .with_anchor(ts("2026-10-18 09:00")),
            ScheduleEntry::new(PetId::new(""), "Breakfast", "80g", Recurrence::calendar(CalendarUnit::Day))
                .with_kind(ScheduleKind::Feeding)
                .with_anchor(ts("2026-10-17 07:30")),
        ]);

        let items = get_due_occurrences(&registry, ts("2026-10-18 00:00"), ts("2026-10-18 23:59"), ts("2026-10-18 08:00"));
        let labels: Vec<_> = items.iter().map(|i| i.entry.label.as_str()).collect();
        assert_eq!(labels, vec!["Breakfast", "Apoquel", "Apoquel"]);
        assert_eq!(items[0].status, Status::Overdue);
        assert_eq!(items[1].status, Status::DueToday);
        assert_eq!(items[0].pet_name, "Biscuit");
    }

    #[test]
    fn due_today_lists_medications_only() {
        let (registry, _, _) = registry_with(vec![
            ScheduleEntry::new(PetId::new(""), "Apoquel", "1 tab", Recurrence::calendar(CalendarUnit::Day))
                .with_anchor(ts("2026-10-10 08:00")),
            ScheduleEntry::new(PetId::new(""), "Dinner", "100g", Recurrence::calendar(CalendarUnit::Day))
                .with_kind(ScheduleKind::Feeding)
                .with_anchor(ts("2026-10-10 18:00")),
        ]);
        let today = due_today(&registry, ts("2026-10-18 12:00"));
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].occurrence.due_at, ts("2026-10-18 08:00"));
    }

    #[test]
    fn mark_taken_late_reanchors_to_now() {
        let (mut registry, _, refs) = registry_with(vec![ScheduleEntry::new(
            PetId::new(""),
            "Apoquel",
            "1 tab",
            Recurrence::fixed_interval(8).unwrap(),
        )
        .with_anchor(ts("2026-10-18 06:00"))]);
        let now = ts("2026-10-18 14:10");
        let current = next_due(registry.entry(&refs[0]).unwrap(), now).unwrap();
        assert_eq!(current.due_at, ts("2026-10-18 14:00"));

        mark_taken(&mut registry, &refs[0], &current, now).unwrap();
        let entry = registry.entry(&refs[0]).unwrap();
        assert_eq!(entry.anchor_time, Some(now));
        assert_eq!(next_due(entry, now).unwrap().due_at, ts("2026-10-18 22:10"));
    }

    #[test]
    fn mark_taken_early_keeps_the_slot() {
        let (mut registry, _, refs) = registry_with(vec![ScheduleEntry::new(
            PetId::new(""),
            "Apoquel",
            "1 tab",
            Recurrence::fixed_interval(8).unwrap(),
        )
        .with_anchor(ts("2026-10-18 06:00"))]);
        let now = ts("2026-10-18 13:30");
        let upcoming = enumerate_due(registry.entry(&refs[0]).unwrap(), now, ts("2026-10-18 23:00"))
            .next()
            .unwrap();
        mark_taken(&mut registry, &refs[0], &upcoming, now).unwrap();

        let entry = registry.entry(&refs[0]).unwrap();
        assert_eq!(entry.anchor_time, Some(ts("2026-10-18 14:00")));
        assert_eq!(classify(entry, &upcoming, ts("2026-10-18 14:05")), Status::Taken);
        assert_eq!(next_due(entry, now).unwrap().due_at, ts("2026-10-18 22:00"));
    }

    #[test]
    fn mark_taken_one_time_exhausts() {
        let (mut registry, _, refs) = registry_with(vec![ScheduleEntry::new(
            PetId::new(""),
            "Dewormer",
            "2ml",
            Recurrence::OneTime,
        )
        .with_anchor(ts("2026-10-18 10:00"))]);
        let occ = next_due(registry.entry(&refs[0]).unwrap(), ts("2026-10-18 11:00")).unwrap();
        mark_taken(&mut registry, &refs[0], &occ, ts("2026-10-18 11:00")).unwrap();

        let entry = registry.entry(&refs[0]).unwrap();
        assert_eq!(enumerate_due(entry, ts("2026-10-18 00:00"), ts("2027-01-01 00:00")).count(), 0);
        assert!(next_due(entry, ts("2026-10-19 00:00")).is_none());
    }

    #[test]
    fn mark_taken_unknown_entry() {
        let (mut registry, pet, refs) = registry_with(vec![ScheduleEntry::new(
            PetId::new(""),
            "Apoquel",
            "1 tab",
            Recurrence::OneTime,
        )
        .with_anchor(ts("2026-10-18 10:00"))]);
        let occ = next_due(registry.entry(&refs[0]).unwrap(), ts("2026-10-18 11:00")).unwrap();
        registry.remove_entry(&refs[0]).unwrap();
        assert!(matches!(
            mark_taken(&mut registry, &refs[0], &occ, ts("2026-10-18 11:00")),
            Err(PawError::EntryNotFound(_))
        ));

        let stranger = ScheduleEntry::new(pet.clone(), "Stranger", "", Recurrence::OneTime);
        let other = EntryRef { pet, entry: stranger.id };
        assert!(matches!(
            mark_taken(&mut registry, &other, &occ, ts("2026-10-18 11:00")),
            Err(PawError::Other(_))
        ));
    }

    #[test]
    fn settle_clears_taken_once_next_cycle_is_due() {
        let mut entry = ScheduleEntry::new(PetId::new("p"), "Apoquel", "1 tab", Recurrence::fixed_interval(8).unwrap())
            .with_anchor(ts("2026-10-18 14:10"));
        entry.taken_state = TakenState::taken_at(ts("2026-10-18 14:10"));

        assert!(!settle(&mut entry, ts("2026-10-18 20:00")));
        assert!(entry.taken_state.taken);

        assert!(settle(&mut entry, ts("2026-10-18 22:15")));
        assert!(!entry.taken_state.taken);
        assert_eq!(next_due(&entry, ts("2026-10-18 22:15")).unwrap().due_at, ts("2026-10-18 22:10"));

        let given = enumerate_due(&entry, ts("2026-10-18 14:10"), ts("2026-10-18 14:10")).next().unwrap();
        assert_eq!(classify(&entry, &given, ts("2026-10-18 22:15")), Status::Taken);
        assert!(!settle(&mut entry, ts("2026-10-19 12:00")));
    }

    #[test]
    fn early_dose_stays_taken_after_settle() {
        let (mut registry, _, refs) = registry_with(vec![ScheduleEntry::new(
            PetId::new(""),
            "Apoquel",
            "1 tab",
            Recurrence::fixed_interval(8).unwrap(),
        )
        .with_anchor(ts("2026-10-18 06:00"))]);
        let now = ts("2026-10-18 13:30");
        let slot = enumerate_due(registry.entry(&refs[0]).unwrap(), now, ts("2026-10-18 23:00"))
            .next()
            .unwrap();
        mark_taken(&mut registry, &refs[0], &slot, now).unwrap();

        assert_eq!(settle_all(&mut registry, ts("2026-10-18 22:30")), 1);
        let entry = registry.entry(&refs[0]).unwrap();
        assert_eq!(classify(entry, &slot, ts("2026-10-18 22:30")), Status::Taken);
        assert_eq!(next_due(entry, ts("2026-10-18 22:30")).unwrap().due_at, ts("2026-10-18 22:00"));
    }

    #[test]
    fn late_calendar_dose_keeps_its_clock_time() {
        let (mut registry, _, refs) = registry_with(vec![ScheduleEntry::new(
            PetId::new(""),
            "Breakfast",
            "80g",
            Recurrence::calendar(CalendarUnit::Day),
        )
        .with_anchor(ts("2026-10-17 08:00"))
        .with_time_of_day(NaiveTime::from_hms_opt(8, 0, 0).unwrap())]);
        let now = ts("2026-10-18 09:40");
        let slot = next_due(registry.entry(&refs[0]).unwrap(), now).unwrap();
        assert_eq!(slot.due_at, ts("2026-10-18 08:00"));

        mark_taken(&mut registry, &refs[0], &slot, now).unwrap();
        let entry = registry.entry(&refs[0]).unwrap();
        assert_eq!(entry.anchor_time, Some(ts("2026-10-18 08:00")));
        assert_eq!(next_due(entry, now).unwrap().due_at, ts("2026-10-19 08:00"));

        let today = due_today(&registry, now);
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].status, Status::Taken);

        assert_eq!(settle_all(&mut registry, ts("2026-10-19 08:30")), 1);
        let statuses: Vec<_> = get_due_occurrences(
            &registry,
            ts("2026-10-18 00:00"),
            ts("2026-10-19 23:59"),
            ts("2026-10-19 08:30"),
        )
        .iter()
        .map(|i| i.status)
        .collect();
        assert_eq!(statuses, vec![Status::Taken, Status::Overdue]);
    }

    #[test]
    fn settle_all_counts_changes() {
        let mut taken = ScheduleEntry::new(PetId::new(""), "Apoquel", "1 tab", Recurrence::fixed_interval(8).unwrap())
            .with_anchor(ts("2026-10-17 06:00"));
        taken.taken_state = TakenState::taken_at(ts("2026-10-17 06:00"));
        let mut once = ScheduleEntry::new(PetId::new(""), "Dewormer", "2ml", Recurrence::OneTime)
            .with_anchor(ts("2026-10-17 06:00"));
        once.taken_state = TakenState::taken_at(ts("2026-10-17 06:00"));
        let (mut registry, _, _) = registry_with(vec![taken, once]);

        assert_eq!(settle_all(&mut registry, ts("2026-10-18 12:00")), 1);
        assert_eq!(settle_all(&mut registry, ts("2026-10-18 12:00")), 0);
    }
}
