//! On-disk record shapes and their validation into typed entities.
//!
//! Records are deliberately loose so older data files keep loading:
//! medications written with `name`/`interval_hours`/`next_due` are mapped
//! onto the tagged [`Recurrence`] here, and nowhere else.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::entity::{
    CalendarUnit, Pet, PetId, QuietHours, Recurrence, ScheduleEntry, ScheduleKind,
    SuppressionWindow, TakenState,
};
use crate::error::PawError;
use crate::time::{format_time_of_day, format_timestamp, parse_time_of_day, parse_timestamp};

/// Legacy `next_due` marker for a one-time dose that was given.
const USED_MARKER: &str = "used";

pub(crate) const FILE_VERSION: u8 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct RegistryFile {
    #[serde(default)]
    pub version: u8,
    #[serde(default)]
    pub pets: Vec<PetRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PetRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, alias = "medications")]
    pub schedules: Vec<EntryRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snooze_until: Option<String>,
    #[serde(default)]
    pub quiet_hours: QuietHoursRecord,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct QuietHoursRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RecurrenceRecord {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct EntryRecord {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub kind: ScheduleKind,
    #[serde(alias = "name")]
    pub label: String,
    #[serde(default)]
    pub dose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrenceRecord>,
    /// Legacy: absent or null means one-time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_hours: Option<i64>,
    #[serde(default, alias = "next_due", skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<String>,
    #[serde(default)]
    pub taken: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taken_at: Option<String>,
    #[serde(default = "default_true")]
    pub reminder_enabled: bool,
}

fn default_true() -> bool {
    true
}

impl RecurrenceRecord {
    fn validate(&self) -> Result<Recurrence, PawError> {
        match self.kind.as_str() {
            "one_time" => Ok(Recurrence::OneTime),
            "fixed_interval" => {
                let hours = self.hours.ok_or_else(|| {
                    PawError::InvalidRecurrenceConfig("fixed_interval needs 'hours'".into())
                })?;
                Recurrence::fixed_interval(hours)
            }
            "calendar" => {
                let unit = self.unit.as_deref().ok_or_else(|| {
                    PawError::InvalidRecurrenceConfig("calendar needs 'unit'".into())
                })?;
                Ok(Recurrence::calendar(CalendarUnit::parse(unit)?))
            }
            other => Err(PawError::InvalidRecurrenceConfig(format!(
                "unknown recurrence type '{other}'"
            ))),
        }
    }

    fn from_recurrence(recurrence: &Recurrence) -> Self {
        match recurrence {
            Recurrence::OneTime => Self {
                kind: "one_time".into(),
                hours: None,
                unit: None,
            },
            Recurrence::FixedInterval { hours } => Self {
                kind: "fixed_interval".into(),
                hours: Some(i64::from(hours.get())),
                unit: None,
            },
            Recurrence::Calendar { unit } => Self {
                kind: "calendar".into(),
                hours: None,
                unit: Some(
                    match unit {
                        CalendarUnit::Day => "day",
                        CalendarUnit::ThreeDays => "3days",
                        CalendarUnit::Week => "week",
                    }
                    .into(),
                ),
            },
        }
    }
}

impl EntryRecord {
    /// Validate into a typed entry.
    ///
    /// Only a bad recurrence rejects the record. A malformed anchor is
    /// logged and dropped so the entry fails open (due immediately).
    pub fn into_entry(self, pet: &PetId) -> Result<ScheduleEntry, PawError> {
        let recurrence = match (&self.recurrence, self.interval_hours) {
            (Some(rec), _) => rec.validate()?,
            (None, Some(hours)) => Recurrence::fixed_interval(hours)?,
            (None, None) => Recurrence::OneTime,
        };

        let time_of_day = self.time_of_day.as_deref().and_then(|raw| {
            parse_time_of_day(raw)
                .map_err(|e| warn!(pet = %pet, label = %self.label, error = %e, "ignoring time of day"))
                .ok()
        });

        let mut taken_state = TakenState {
            taken: self.taken,
            taken_at: self.taken_at.as_deref().and_then(|raw| {
                parse_timestamp(raw, None)
                    .map_err(|e| warn!(pet = %pet, label = %self.label, error = %e, "ignoring taken_at"))
                    .ok()
            }),
        };

        let anchor_time = match self.anchor.as_deref() {
            Some(raw) if raw.trim() == USED_MARKER => {
                taken_state.taken = true;
                None
            }
            Some(raw) => match parse_timestamp(raw, time_of_day) {
                Ok(ts) => Some(ts),
                Err(e) => {
                    warn!(pet = %pet, label = %self.label, error = %e, "anchor unreadable, entry is due now");
                    None
                }
            },
            None => None,
        };

        Ok(ScheduleEntry {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            subject_id: pet.clone(),
            kind: self.kind,
            label: self.label,
            dose_or_amount: self.dose,
            recurrence,
            anchor_time,
            time_of_day,
            taken_state,
            reminder_enabled: self.reminder_enabled,
        })
    }

    pub fn from_entry(entry: &ScheduleEntry) -> Self {
        Self {
            id: Some(entry.id),
            kind: entry.kind,
            label: entry.label.clone(),
            dose: entry.dose_or_amount.clone(),
            recurrence: Some(RecurrenceRecord::from_recurrence(&entry.recurrence)),
            interval_hours: None,
            anchor: entry.anchor_time.as_ref().map(format_timestamp),
            time_of_day: entry.time_of_day.as_ref().map(format_time_of_day),
            taken: entry.taken_state.taken,
            taken_at: entry.taken_state.taken_at.as_ref().map(format_timestamp),
            reminder_enabled: entry.reminder_enabled,
        }
    }
}

fn parse_optional_time(raw: Option<&str>, pet: &PetId, field: &str) -> Option<NaiveTime> {
    raw.and_then(|value| {
        parse_time_of_day(value)
            .map_err(|e| warn!(pet = %pet, field, error = %e, "ignoring quiet hours bound"))
            .ok()
    })
}

impl PetRecord {
    /// Validate into a typed pet plus the entry records that were rejected.
    pub fn into_pet(self) -> (Pet, Vec<EntryRecord>) {
        let id = self
            .id
            .filter(|s| !s.trim().is_empty())
            .map(PetId::new)
            .unwrap_or_else(PetId::generate);

        let snooze_until = self.snooze_until.as_deref().and_then(|raw| {
            parse_timestamp(raw, None)
                .map_err(|e| warn!(pet = %id, error = %e, "ignoring snooze"))
                .ok()
        });

        let start = parse_optional_time(self.quiet_hours.start.as_deref(), &id, "start");
        let end = parse_optional_time(self.quiet_hours.end.as_deref(), &id, "end");
        let quiet_hours = QuietHours::from_parts(start, end);
        if quiet_hours.is_none() && (start.is_some() || end.is_some()) {
            warn!(pet = %id, "quiet hours need both start and end; suppression disabled");
        }

        let mut pet = Pet::new(id, self.name);
        pet.suppression = SuppressionWindow {
            snooze_until,
            quiet_hours,
        };

        let mut rejected = Vec::new();
        for record in self.schedules {
            match record.clone().into_entry(&pet.id) {
                Ok(entry) => pet.schedules.push(entry),
                Err(e) => {
                    warn!(pet = %pet.id, label = %record.label, error = %e, "skipping schedule entry");
                    rejected.push(record);
                }
            }
        }

        (pet, rejected)
    }

    pub fn from_pet(pet: &Pet, rejected: &[EntryRecord]) -> Self {
        let mut schedules: Vec<EntryRecord> = pet.schedules.iter().map(EntryRecord::from_entry).collect();
        schedules.extend(rejected.iter().cloned());
        Self {
            id: Some(pet.id.to_string()),
            name: pet.name.clone(),
            schedules,
            snooze_until: pet.suppression.snooze_until.as_ref().map(format_timestamp),
            quiet_hours: QuietHoursRecord {
                start: pet.suppression.quiet_hours.map(|q| format_time_of_day(&q.start)),
                end: pet.suppression.quiet_hours.map(|q| format_time_of_day(&q.end)),
            },
        }
    }
}
