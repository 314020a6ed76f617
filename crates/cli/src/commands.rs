use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::{bail, Context, Result};
use chrono::{NaiveTime, TimeDelta};
use tracing::{info, warn};

use pawcare_core::time::{self, format_timestamp, parse_time_of_day, parse_timestamp};
use pawcare_core::{
    new_shared_registry, EntryRef, PetId, QuietHours, Recurrence, Registry, ScheduleEntry,
    ScheduleKind, SharedRegistry, Timestamp,
};
use pawcare_notify::{ConsoleNotifier, Dispatcher};
use pawcare_schedule::{due_today, get_due_occurrences, mark_taken, next_due, settle_all, Poller};

use crate::cli::Command;
use crate::config::CliConfig;
use crate::terminal::Terminal;

/// Options of `add-med`, as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct NewSchedule {
    pub label: String,
    pub dose: String,
    pub every_hours: Option<i64>,
    pub every: Option<String>,
    pub at: Option<String>,
    pub start: Option<String>,
    pub feeding: bool,
    pub no_reminder: bool,
}

/// Load the registry, run one command, and save if anything changed.
pub async fn run(
    command: Command,
    config: &CliConfig,
    data_file: &Path,
    terminal: &Terminal,
) -> Result<()> {
    let mut registry = Registry::load(data_file)
        .with_context(|| format!("failed to load pet data: {}", data_file.display()))?;
    if registry.rejected_count() > 0 {
        warn!(
            count = registry.rejected_count(),
            "Some schedules could not be read and are ignored"
        );
    }

    let now = time::now();
    let settled = settle_all(&mut registry, now);

    match command {
        Command::Watch => {
            if settled > 0 {
                save(&registry, data_file)?;
            }
            return watch(registry, config, data_file, terminal).await;
        }
        Command::TestNotify => return test_notify(config, terminal).await,
        _ => {}
    }

    let changed = execute(command, &mut registry, config, terminal, now)?;
    if changed || settled > 0 {
        save(&registry, data_file)?;
    }
    Ok(())
}

fn save(registry: &Registry, data_file: &Path) -> Result<()> {
    registry
        .save(data_file)
        .with_context(|| format!("failed to save pet data: {}", data_file.display()))
}

/// Run a foreground command. Returns whether the registry changed.
fn execute(
    command: Command,
    registry: &mut Registry,
    config: &CliConfig,
    terminal: &Terminal,
    now: Timestamp,
) -> Result<bool> {
    match command {
        Command::Upcoming { hours } => {
            let span = match hours {
                Some(hours) => TimeDelta::hours(i64::from(hours)),
                None => config.poller.upcoming_window(),
            };
            let start = now.date().and_time(NaiveTime::MIN);
            let Some(end) = now.checked_add_signed(span) else {
                bail!("--hours {} reaches past the supported calendar range", span.num_hours());
            };
            let items = get_due_occurrences(registry, start, end, now);
            terminal.print_due_items(&format!("Due through the next {}h", span.num_hours()), &items)?;
            Ok(false)
        }
        Command::Today => {
            let items = due_today(registry, now);
            for pet in registry.pets() {
                let mine: Vec<_> = items.iter().filter(|i| i.pet_id == pet.id).cloned().collect();
                terminal.print_due_items(&pet.name, &mine)?;
            }
            if registry.is_empty() {
                terminal.print_info("No pets yet. Add one with `pawcare add-pet <name>`.")?;
            }
            Ok(false)
        }
        Command::AddPet { name } => {
            registry.add_pet(&name)?;
            terminal.print_success(&format!("Added {}", name.trim()))?;
            Ok(true)
        }
        Command::AddMed {
            pet,
            label,
            dose,
            every_hours,
            every,
            at,
            start,
            feeding,
            no_reminder,
        } => {
            let pet_id = resolve_pet(registry, &pet)?;
            let opts = NewSchedule {
                label,
                dose,
                every_hours,
                every,
                at,
                start,
                feeding,
                no_reminder,
            };
            let entry = build_entry(&pet_id, &opts, now)?;
            let summary = format!(
                "Added {} ({}) for {}, first due {}",
                entry.label,
                entry.recurrence,
                pet,
                entry.anchor_time.as_ref().map(format_timestamp).unwrap_or_default()
            );
            registry.add_entry(&pet_id, entry)?;
            terminal.print_success(&summary)?;
            Ok(true)
        }
        Command::RemoveMed { pet, label } => {
            let entry_ref = resolve_entry(registry, &pet, &label)?;
            let removed = registry.remove_entry(&entry_ref)?;
            terminal.print_success(&format!("Removed {} from {}", removed.label, pet))?;
            Ok(true)
        }
        Command::List { pet } => {
            let pet_id = resolve_pet(registry, &pet)?;
            if let Some(pet) = registry.pet(&pet_id) {
                terminal.print_pet(pet, now)?;
            }
            Ok(false)
        }
        Command::Take { pet, label } => {
            let entry_ref = resolve_entry(registry, &pet, &label)?;
            let Some(occurrence) = registry.entry(&entry_ref).and_then(|e| next_due(e, now)) else {
                bail!("{label} for {pet} is a one-time dose that was already given");
            };
            mark_taken(registry, &entry_ref, &occurrence, now)?;
            let next = registry
                .entry(&entry_ref)
                .and_then(|e| next_due(e, now))
                .map(|o| format!(" Next: {}.", format_timestamp(&o.due_at)))
                .unwrap_or_default();
            terminal.print_success(&format!(
                "Gave {label} to {pet} (was due {}).{next}",
                format_timestamp(&occurrence.due_at)
            ))?;
            Ok(true)
        }
        Command::Snooze { pet, minutes } => {
            let pet_id = resolve_pet(registry, &pet)?;
            let Some(until) = now.checked_add_signed(TimeDelta::minutes(i64::from(minutes))) else {
                bail!("cannot snooze for {minutes} minutes");
            };
            registry.set_snooze(&pet_id, Some(until))?;
            terminal.print_success(&format!(
                "Reminders for {pet} snoozed until {}",
                format_timestamp(&until)
            ))?;
            Ok(true)
        }
        Command::Unsnooze { pet } => {
            let pet_id = resolve_pet(registry, &pet)?;
            registry.set_snooze(&pet_id, None)?;
            terminal.print_success(&format!("Reminders for {pet} resumed"))?;
            Ok(true)
        }
        Command::QuietHours {
            pet,
            start,
            end,
            clear,
        } => {
            let pet_id = resolve_pet(registry, &pet)?;
            if clear {
                registry.clear_quiet_hours(&pet_id)?;
                terminal.print_success(&format!("Quiet hours for {pet} cleared"))?;
                return Ok(true);
            }
            let (Some(start), Some(end)) = (start, end) else {
                bail!("quiet hours need both a start and an end, e.g. 22:00 06:00");
            };
            let quiet = QuietHours::new(parse_time_of_day(&start)?, parse_time_of_day(&end)?);
            if quiet.start == quiet.end {
                terminal.print_info("Start and end are equal; no time will be quiet.")?;
            }
            registry.set_quiet_hours(&pet_id, Some(quiet))?;
            terminal.print_success(&format!("Quiet hours for {pet}: {start}-{end}"))?;
            Ok(true)
        }
        Command::Watch | Command::TestNotify => bail!("this command runs in the async runner"),
    }
}

/// Find a pet by display name, or by id.
pub fn resolve_pet(registry: &Registry, name: &str) -> Result<PetId> {
    if let Some(pet) = registry.find_pet_by_name(name) {
        return Ok(pet.id.clone());
    }
    let id = PetId::new(name.trim());
    if registry.pet(&id).is_some() {
        return Ok(id);
    }
    bail!("no pet named '{name}'")
}

fn resolve_entry(registry: &Registry, pet: &str, label: &str) -> Result<EntryRef> {
    let pet_id = resolve_pet(registry, pet)?;
    registry
        .find_entry_by_label(&pet_id, label)
        .map(ScheduleEntry::entry_ref)
        .with_context(|| format!("{pet} has no schedule named '{label}'"))
}

/// Validate `add-med` options into a new entry.
pub fn build_entry(pet: &PetId, opts: &NewSchedule, now: Timestamp) -> Result<ScheduleEntry> {
    let recurrence = match (opts.every_hours, opts.every.as_deref()) {
        (Some(hours), _) => Recurrence::fixed_interval(hours)?,
        (None, Some(rule)) => Recurrence::parse(rule)?,
        (None, None) => Recurrence::OneTime,
    };
    let time_of_day = opts.at.as_deref().map(parse_time_of_day).transpose()?;
    let anchor = first_anchor(opts.start.as_deref(), time_of_day, now)?;

    let kind = if opts.feeding {
        ScheduleKind::Feeding
    } else {
        ScheduleKind::Medication
    };
    let mut entry = ScheduleEntry::new(pet.clone(), opts.label.trim(), opts.dose.trim(), recurrence)
        .with_kind(kind)
        .with_anchor(anchor)
        .with_reminders(!opts.no_reminder);
    if let Some(at) = time_of_day {
        entry = entry.with_time_of_day(at);
    }
    Ok(entry)
}

/// The first due time: `--start`, else the next `--at`, else now.
fn first_anchor(start: Option<&str>, at: Option<NaiveTime>, now: Timestamp) -> Result<Timestamp> {
    if let Some(start) = start {
        return Ok(parse_timestamp(start, at)?);
    }
    Ok(match at {
        Some(at) => {
            let today = now.date().and_time(at);
            if today >= now {
                today
            } else {
                today + TimeDelta::days(1)
            }
        }
        None => now,
    })
}

async fn watch(
    registry: Registry,
    config: &CliConfig,
    data_file: &Path,
    terminal: &Terminal,
) -> Result<()> {
    let shared = new_shared_registry(registry);
    let dispatcher = build_dispatcher(config)?;

    let poller_config = config.poller.clone().with_env_overrides();
    poller_config.log_summary();
    terminal.print_banner(&data_file.display().to_string(), &dispatcher.channel_names())?;

    let reload_every = poller_config.tick_interval();
    let poller = Poller::new(poller_config, Arc::clone(&shared), Arc::new(dispatcher))
        .with_renderer(config.renderer()?);
    let handle = poller.start();
    let reloader = tokio::spawn(reload_on_change(data_file.to_path_buf(), shared, reload_every));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;

    reloader.abort();
    let ledger = handle.ledger();
    handle.stop().await;
    terminal.print_info(&format!(
        "Stopped. {} reminder(s) sent today.",
        ledger.snapshot().len()
    ))?;
    Ok(())
}

fn build_dispatcher(config: &CliConfig) -> Result<Dispatcher> {
    let mut dispatcher =
        Dispatcher::with_defaults(vec![Box::new(ConsoleNotifier::new().with_bell(config.bell))]);
    if let Some(webhook) = config.webhook_notifier()? {
        dispatcher.add_default(Box::new(webhook));
    }
    Ok(dispatcher)
}

async fn test_notify(config: &CliConfig, terminal: &Terminal) -> Result<()> {
    let dispatcher = build_dispatcher(config)?;
    let mut failed = 0;
    for result in dispatcher.test_all().await {
        match result.error {
            None => terminal.print_success(&format!(
                "{}: ok ({} ms)",
                result.channel, result.duration_ms
            ))?,
            Some(e) => {
                failed += 1;
                terminal.print_error(&format!("{}: {e}", result.channel))?;
            }
        }
    }
    if failed > 0 {
        bail!("{failed} channel(s) failed the test notification");
    }
    Ok(())
}

/// Pick up edits other `pawcare` invocations make to the data file.
async fn reload_on_change(path: PathBuf, shared: SharedRegistry, every: Duration) {
    let mut last_seen = modified_at(&path);
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        let current = modified_at(&path);
        if current == last_seen {
            continue;
        }
        last_seen = current;
        match Registry::load(&path) {
            Ok(fresh) => {
                replace_registry(&shared, fresh);
                info!(path = %path.display(), "Pet data reloaded");
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to reload pet data, keeping previous");
            }
        }
    }
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn replace_registry(shared: &SharedRegistry, fresh: Registry) {
    let mut guard = shared.write().unwrap_or_else(|p| p.into_inner());
    *guard = fresh;
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;
    use pawcare_core::CalendarUnit;

    use super::*;

    fn ts(s: &str) -> Timestamp {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn base(label: &str) -> NewSchedule {
        NewSchedule {
            label: label.to_string(),
            dose: "1 tab".to_string(),
            ..NewSchedule::default()
        }
    }

    #[test]
    fn test_build_interval_entry() {
        let opts = NewSchedule {
            every_hours: Some(8),
            start: Some("2026-10-18 06:00".to_string()),
            ..base("Apoquel")
        };
        let entry = build_entry(&PetId::new("p1"), &opts, ts("2026-10-18 12:00")).unwrap();
        assert_eq!(entry.recurrence, Recurrence::fixed_interval(8).unwrap());
        assert_eq!(entry.anchor_time, Some(ts("2026-10-18 06:00")));
        assert!(entry.reminder_enabled);
    }

    #[test]
    fn test_build_rejects_zero_interval() {
        let opts = NewSchedule {
            every_hours: Some(0),
            ..base("Apoquel")
        };
        let err = build_entry(&PetId::new("p1"), &opts, ts("2026-10-18 12:00")).unwrap_err();
        assert!(err.to_string().contains("positive"));
    }

    #[test]
    fn test_build_daily_feeding_at_next_time() {
        let opts = NewSchedule {
            every: Some("daily".to_string()),
            at: Some("08:00".to_string()),
            feeding: true,
            no_reminder: true,
            ..base("Breakfast")
        };
        let entry = build_entry(&PetId::new("p1"), &opts, ts("2026-10-18 12:00")).unwrap();
        assert_eq!(entry.recurrence, Recurrence::calendar(CalendarUnit::Day));
        assert_eq!(entry.kind, ScheduleKind::Feeding);
        assert_eq!(entry.anchor_time, Some(ts("2026-10-19 08:00")));
        assert_eq!(entry.time_of_day, NaiveTime::from_hms_opt(8, 0, 0));
        assert!(!entry.reminder_enabled);
    }

    #[test]
    fn test_build_one_time_defaults_to_now() {
        let entry = build_entry(&PetId::new("p1"), &base("Dewormer"), ts("2026-10-18 12:00")).unwrap();
        assert!(entry.recurrence.is_one_time());
        assert_eq!(entry.anchor_time, Some(ts("2026-10-18 12:00")));
    }

    #[test]
    fn test_start_date_takes_time_of_day() {
        let at = NaiveTime::from_hms_opt(7, 30, 0);
        assert_eq!(
            first_anchor(Some("2026-11-01"), at, ts("2026-10-18 12:00")).unwrap(),
            ts("2026-11-01 07:30")
        );
        assert!(first_anchor(Some("someday"), at, ts("2026-10-18 12:00")).is_err());
    }

    #[test]
    fn test_resolve_pet_by_name_or_id() {
        let mut registry = Registry::new();
        let id = registry.add_pet("Biscuit").unwrap();
        assert_eq!(resolve_pet(&registry, "biscuit").unwrap(), id);
        assert_eq!(resolve_pet(&registry, id.as_str()).unwrap(), id);
        assert!(resolve_pet(&registry, "Mochi").is_err());
    }

    #[tokio::test]
    async fn test_commands_persist_changes() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("pets.json");
        let config = CliConfig::default();
        let terminal = Terminal::new();

        let commands = vec![
            Command::AddPet { name: "Biscuit".to_string() },
            Command::AddMed {
                pet: "Biscuit".to_string(),
                label: "Apoquel".to_string(),
                dose: "1 tab".to_string(),
                every_hours: Some(12),
                every: None,
                at: None,
                start: Some("2026-01-01 08:00".to_string()),
                feeding: false,
                no_reminder: false,
            },
            Command::Take {
                pet: "Biscuit".to_string(),
                label: "Apoquel".to_string(),
            },
            Command::QuietHours {
                pet: "Biscuit".to_string(),
                start: Some("22:00".to_string()),
                end: Some("06:00".to_string()),
                clear: false,
            },
            Command::Upcoming { hours: Some(24) },
        ];
        for command in commands {
            run(command, &config, &data, &terminal).await.unwrap();
        }

        let registry = Registry::load(&data).unwrap();
        let pet = registry.find_pet_by_name("Biscuit").unwrap();
        assert!(pet.schedules[0].taken_state.taken);
        assert!(pet.suppression.quiet_hours.is_some());

        let missing = Command::Take {
            pet: "Biscuit".to_string(),
            label: "Insulin".to_string(),
        };
        assert!(run(missing, &config, &data, &terminal).await.is_err());
    }

    #[tokio::test]
    async fn test_far_horizons_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("pets.json");
        let config = CliConfig::default();
        let terminal = Terminal::new();

        let err = run(Command::Upcoming { hours: Some(u32::MAX) }, &config, &data, &terminal)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("calendar range"));

        run(Command::AddPet { name: "Rex".to_string() }, &config, &data, &terminal)
            .await
            .unwrap();
        let snooze = Command::Snooze {
            pet: "Rex".to_string(),
            minutes: u32::MAX,
        };
        assert!(run(snooze, &config, &data, &terminal).await.is_ok());
        run(Command::Upcoming { hours: None }, &config, &data, &terminal)
            .await
            .unwrap();
    }

    #[test]
    fn test_replace_registry_swaps_contents() {
        let shared = new_shared_registry(Registry::new());
        let mut fresh = Registry::new();
        fresh.add_pet("Mochi").unwrap();
        replace_registry(&shared, fresh);
        assert_eq!(shared.read().unwrap().len(), 1);
    }
}
