use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Medication and feeding reminders for your pets.
///
/// Shows what is due, records doses as they are given, and can run a
/// reminder watcher that notifies when a dose comes due.
#[derive(Parser, Debug)]
#[command(name = "pawcare", about = "Pet medication and feeding reminders")]
pub struct CliArgs {
    /// Path to config file (default: ~/.config/pawcare/config.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Pet data file (overrides PAWCARE_DATA and the config file)
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List every dose and feeding due from now on
    Upcoming {
        /// How far ahead to look (default from config, 72h)
        #[arg(long)]
        hours: Option<u32>,
    },

    /// Today's medications, per pet
    Today,

    /// Register a pet
    AddPet { name: String },

    /// Add a medication or feeding schedule to a pet
    AddMed {
        pet: String,
        label: String,
        dose: String,

        /// Repeat every N hours
        #[arg(long, allow_negative_numbers = true, conflicts_with = "every")]
        every_hours: Option<i64>,

        /// Repeat on a calendar rule: day, 3days, week (or `8h`, `once`)
        #[arg(long)]
        every: Option<String>,

        /// Clock time (HH:MM) the dose is given at
        #[arg(long)]
        at: Option<String>,

        /// First dose, "YYYY-MM-DD HH:MM" (default: next --at, or now)
        #[arg(long)]
        start: Option<String>,

        /// Record as a feeding schedule instead of a medication
        #[arg(long)]
        feeding: bool,

        /// Never send live reminders for this schedule
        #[arg(long)]
        no_reminder: bool,
    },

    /// Remove a schedule from a pet
    RemoveMed { pet: String, label: String },

    /// Show a pet's schedules and their next due time
    List { pet: String },

    /// Mark the current dose of a schedule as given
    Take { pet: String, label: String },

    /// Hold back a pet's reminders for a number of minutes
    Snooze { pet: String, minutes: u32 },

    /// Lift a snooze
    Unsnooze { pet: String },

    /// Set daily quiet hours for a pet, e.g. `22:00 06:00`
    QuietHours {
        pet: String,
        #[arg(required_unless_present = "clear")]
        start: Option<String>,
        #[arg(required_unless_present = "clear")]
        end: Option<String>,
        /// Remove quiet hours
        #[arg(long, conflicts_with_all = ["start", "end"])]
        clear: bool,
    },

    /// Run the reminder watcher until Ctrl+C
    Watch,

    /// Send a test reminder through every configured channel
    TestNotify,
}

impl Command {
    /// Whether the command runs long enough to want `info` logs.
    pub fn is_long_running(&self) -> bool {
        matches!(self, Command::Watch)
    }
}
