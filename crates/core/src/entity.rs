use std::num::NonZeroU32;

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PawError;
use crate::time::Timestamp;

/// Owning pet identifier. Opaque to the scheduling code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PetId(pub String);

impl PetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub type EntryId = Uuid;

/// Stable reference to one schedule entry of one pet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryRef {
    pub pet: PetId,
    pub entry: EntryId,
}

impl std::fmt::Display for EntryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.pet, self.entry)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    #[default]
    Medication,
    Feeding,
}

impl std::fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleKind::Medication => write!(f, "medication"),
            ScheduleKind::Feeding => write!(f, "feeding"),
        }
    }
}

/// Calendar step used by [`Recurrence::Calendar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarUnit {
    Day,
    ThreeDays,
    Week,
}

impl CalendarUnit {
    /// Whole days between two occurrences.
    pub fn days(self) -> u32 {
        match self {
            CalendarUnit::Day => 1,
            CalendarUnit::ThreeDays => 3,
            CalendarUnit::Week => 7,
        }
    }

    pub fn hours(self) -> u32 {
        self.days() * 24
    }

    /// Parse the user-facing names (`day`, `daily`, `3days`, `week`, ...).
    pub fn parse(value: &str) -> Result<Self, PawError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "day" | "daily" | "1d" => Ok(CalendarUnit::Day),
            "3days" | "three_days" | "3d" | "every_3_days" => Ok(CalendarUnit::ThreeDays),
            "week" | "weekly" | "7d" => Ok(CalendarUnit::Week),
            other => Err(PawError::InvalidRecurrenceConfig(format!(
                "unknown calendar unit '{other}' (use day, 3days or week)"
            ))),
        }
    }
}

impl std::fmt::Display for CalendarUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalendarUnit::Day => write!(f, "daily"),
            CalendarUnit::ThreeDays => write!(f, "every 3 days"),
            CalendarUnit::Week => write!(f, "weekly"),
        }
    }
}

/// How a schedule entry repeats.
///
/// Periods are positive by construction; use [`Recurrence::fixed_interval`]
/// to validate user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Recurrence {
    OneTime,
    FixedInterval { hours: NonZeroU32 },
    Calendar { unit: CalendarUnit },
}

impl Recurrence {
    /// Build a fixed-interval rule, rejecting zero or negative periods.
    pub fn fixed_interval(hours: i64) -> Result<Self, PawError> {
        let hours = u32::try_from(hours)
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or_else(|| {
                PawError::InvalidRecurrenceConfig(format!(
                    "interval must be a positive number of hours, got {hours}"
                ))
            })?;
        Ok(Recurrence::FixedInterval { hours })
    }

    pub fn calendar(unit: CalendarUnit) -> Self {
        Recurrence::Calendar { unit }
    }

    /// Parse a user-supplied rule: `once`, `<N>h`, or a calendar unit name.
    pub fn parse(value: &str) -> Result<Self, PawError> {
        let trimmed = value.trim().to_ascii_lowercase();
        if matches!(trimmed.as_str(), "once" | "one-time" | "one_time") {
            return Ok(Recurrence::OneTime);
        }
        if let Some(hours) = trimmed.strip_suffix('h') {
            let hours = hours.trim().parse::<i64>().map_err(|_| {
                PawError::InvalidRecurrenceConfig(format!("not a number of hours: '{value}'"))
            })?;
            return Self::fixed_interval(hours);
        }
        CalendarUnit::parse(&trimmed).map(Self::calendar)
    }

    /// Distance between consecutive occurrences, `None` for one-time entries.
    pub fn period(&self) -> Option<Duration> {
        match self {
            Recurrence::OneTime => None,
            Recurrence::FixedInterval { hours } => Some(Duration::hours(i64::from(hours.get()))),
            Recurrence::Calendar { unit } => Some(Duration::hours(i64::from(unit.hours()))),
        }
    }

    pub fn is_one_time(&self) -> bool {
        matches!(self, Recurrence::OneTime)
    }
}

impl std::fmt::Display for Recurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recurrence::OneTime => write!(f, "one-time"),
            Recurrence::FixedInterval { hours } => write!(f, "every {hours}h"),
            Recurrence::Calendar { unit } => write!(f, "{unit}"),
        }
    }
}

/// Whether the active occurrence has been given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TakenState {
    pub taken: bool,
    pub taken_at: Option<Timestamp>,
}

impl TakenState {
    pub fn taken_at(at: Timestamp) -> Self {
        Self {
            taken: true,
            taken_at: Some(at),
        }
    }
}

/// One medication or feeding schedule attached to a pet.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEntry {
    pub id: EntryId,
    pub subject_id: PetId,
    pub kind: ScheduleKind,
    pub label: String,
    pub dose_or_amount: String,
    pub recurrence: Recurrence,
    /// Seed of the recurrence. `None` when missing or unparseable.
    pub anchor_time: Option<Timestamp>,
    pub time_of_day: Option<NaiveTime>,
    pub taken_state: TakenState,
    pub reminder_enabled: bool,
}

impl ScheduleEntry {
    pub fn new(
        subject_id: PetId,
        label: impl Into<String>,
        dose_or_amount: impl Into<String>,
        recurrence: Recurrence,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject_id,
            kind: ScheduleKind::Medication,
            label: label.into(),
            dose_or_amount: dose_or_amount.into(),
            recurrence,
            anchor_time: None,
            time_of_day: None,
            taken_state: TakenState::default(),
            reminder_enabled: true,
        }
    }

    pub fn with_kind(mut self, kind: ScheduleKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_anchor(mut self, anchor: Timestamp) -> Self {
        self.anchor_time = Some(anchor);
        self
    }

    pub fn with_time_of_day(mut self, time_of_day: NaiveTime) -> Self {
        self.time_of_day = Some(time_of_day);
        self
    }

    pub fn with_reminders(mut self, enabled: bool) -> Self {
        self.reminder_enabled = enabled;
        self
    }

    pub fn entry_ref(&self) -> EntryRef {
        EntryRef {
            pet: self.subject_id.clone(),
            entry: self.id,
        }
    }
}

/// Daily quiet-hours interval. `start > end` wraps midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl QuietHours {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Both-or-neither: a half-configured pair means no quiet hours.
    pub fn from_parts(start: Option<NaiveTime>, end: Option<NaiveTime>) -> Option<Self> {
        match (start, end) {
            (Some(start), Some(end)) => Some(Self { start, end }),
            _ => None,
        }
    }

    pub fn wraps_midnight(&self) -> bool {
        self.start > self.end
    }
}

/// Per-pet reminder suppression settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SuppressionWindow {
    pub snooze_until: Option<Timestamp>,
    pub quiet_hours: Option<QuietHours>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pet {
    pub id: PetId,
    pub name: String,
    pub schedules: Vec<ScheduleEntry>,
    pub suppression: SuppressionWindow,
}

impl Pet {
    pub fn new(id: PetId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            schedules: Vec::new(),
            suppression: SuppressionWindow::default(),
        }
    }

    /// True when at least one entry wants live reminders.
    pub fn has_reminders(&self) -> bool {
        self.schedules.iter().any(|e| e.reminder_enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_interval_rejects_non_positive() {
        assert!(matches!(
            Recurrence::fixed_interval(0),
            Err(PawError::InvalidRecurrenceConfig(_))
        ));
        assert!(matches!(
            Recurrence::fixed_interval(-8),
            Err(PawError::InvalidRecurrenceConfig(_))
        ));
        let r = Recurrence::fixed_interval(8).unwrap();
        assert_eq!(r.period(), Some(Duration::hours(8)));
    }

    #[test]
    fn calendar_periods() {
        assert_eq!(Recurrence::calendar(CalendarUnit::Day).period(), Some(Duration::hours(24)));
        assert_eq!(
            Recurrence::calendar(CalendarUnit::ThreeDays).period(),
            Some(Duration::hours(72))
        );
        assert_eq!(Recurrence::calendar(CalendarUnit::Week).period(), Some(Duration::hours(168)));
        assert_eq!(Recurrence::OneTime.period(), None);
    }

    #[test]
    fn calendar_unit_parse() {
        assert_eq!(CalendarUnit::parse("Daily").unwrap(), CalendarUnit::Day);
        assert_eq!(CalendarUnit::parse("3days").unwrap(), CalendarUnit::ThreeDays);
        assert_eq!(CalendarUnit::parse("week").unwrap(), CalendarUnit::Week);
        assert!(CalendarUnit::parse("fortnight").is_err());
    }

    #[test]
    fn recurrence_serde_is_tagged() {
        let r = Recurrence::fixed_interval(12).unwrap();
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"type":"fixed_interval","hours":12}"#);
        let zero: Result<Recurrence, _> =
            serde_json::from_str(r#"{"type":"fixed_interval","hours":0}"#);
        assert!(zero.is_err());
    }

    #[test]
    fn recurrence_parse() {
        assert_eq!(Recurrence::parse("once").unwrap(), Recurrence::OneTime);
        assert_eq!(Recurrence::parse("8h").unwrap(), Recurrence::fixed_interval(8).unwrap());
        assert_eq!(
            Recurrence::parse("weekly").unwrap(),
            Recurrence::calendar(CalendarUnit::Week)
        );
        assert!(matches!(
            Recurrence::parse("0h"),
            Err(PawError::InvalidRecurrenceConfig(_))
        ));
        assert!(Recurrence::parse("xh").is_err());
    }

    #[test]
    fn recurrence_display() {
        assert_eq!(Recurrence::OneTime.to_string(), "one-time");
        assert_eq!(Recurrence::fixed_interval(8).unwrap().to_string(), "every 8h");
        assert_eq!(Recurrence::calendar(CalendarUnit::Week).to_string(), "weekly");
    }

    #[test]
    fn quiet_hours_need_both_ends() {
        let ten = NaiveTime::from_hms_opt(22, 0, 0).unwrap();
        let six = NaiveTime::from_hms_opt(6, 0, 0).unwrap();
        assert!(QuietHours::from_parts(Some(ten), None).is_none());
        assert!(QuietHours::from_parts(None, Some(six)).is_none());
        let q = QuietHours::from_parts(Some(ten), Some(six)).unwrap();
        assert!(q.wraps_midnight());
    }

    #[test]
    fn entry_ref_display() {
        let entry = ScheduleEntry::new(PetId::new("rex"), "Apoquel", "1 tab", Recurrence::OneTime);
        let r = entry.entry_ref();
        assert_eq!(r.to_string(), format!("rex/{}", entry.id));
    }
}
