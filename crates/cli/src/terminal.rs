use anyhow::Result;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use std::io::{self, Write};

use pawcare_core::time::format_timestamp;
use pawcare_core::{Pet, Timestamp};
use pawcare_schedule::{next_due, suppression_reason, DueItem, Status};

/// Color scheme for terminal output.
struct Colors;

impl Colors {
    const OVERDUE: Color = Color::Red;
    const DUE_TODAY: Color = Color::Yellow;
    const TAKEN: Color = Color::DarkGreen;
    const UPCOMING: Color = Color::Cyan;
    const PENDING: Color = Color::Magenta;
    const SUCCESS: Color = Color::Green;
    const ERROR: Color = Color::Red;
    const DIM: Color = Color::DarkGrey;
    const HEADER: Color = Color::Magenta;
}

fn status_color(status: Status) -> Color {
    match status {
        Status::Overdue => Colors::OVERDUE,
        Status::DueToday => Colors::DUE_TODAY,
        Status::Taken => Colors::TAKEN,
        Status::Upcoming => Colors::UPCOMING,
        Status::OneTimePending => Colors::PENDING,
    }
}

/// One line of a due listing, without the status label.
pub fn format_due_line(item: &DueItem) -> String {
    format!(
        "{}  {:<12} {:<16} {}",
        format_timestamp(&item.occurrence.due_at),
        item.pet_name,
        item.entry.label,
        item.entry.dose_or_amount,
    )
}

/// Writes colored listings to stdout.
#[derive(Debug, Default)]
pub struct Terminal;

impl Terminal {
    pub fn new() -> Self {
        Self
    }

    /// Print the `watch` startup banner.
    pub fn print_banner(&self, data_file: &str, channels: &[&str]) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print("pawcare"),
            ResetColor,
            Print(" - reminder watcher\n"),
            SetForegroundColor(Colors::DIM),
            Print(format!("Data: {} | Channels: {}\n", data_file, channels.join(", "))),
            Print("Press Ctrl+C to stop.\n"),
            Print("---\n"),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Print due occurrences, one per line, with a colored status.
    pub fn print_due_items(&self, heading: &str, items: &[DueItem]) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print(format!("{heading}\n")),
            ResetColor,
        )?;

        if items.is_empty() {
            execute!(
                stdout,
                SetForegroundColor(Colors::DIM),
                Print("  Nothing due.\n"),
                ResetColor,
            )?;
        }

        for item in items {
            execute!(
                stdout,
                Print(format!("  {}  ", format_due_line(item))),
                SetForegroundColor(status_color(item.status)),
                Print(format!("[{}]\n", item.status)),
                ResetColor,
            )?;
        }
        stdout.flush()?;
        Ok(())
    }

    /// Print a pet's schedules with their next due time and reminder settings.
    pub fn print_pet(&self, pet: &Pet, now: Timestamp) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print(format!("{}\n", pet.name)),
            ResetColor,
        )?;

        if let Some(reason) = suppression_reason(&pet.suppression, now) {
            execute!(
                stdout,
                SetForegroundColor(Colors::DIM),
                Print(format!("  Reminders paused: {reason}\n")),
                ResetColor,
            )?;
        }

        if pet.schedules.is_empty() {
            execute!(
                stdout,
                SetForegroundColor(Colors::DIM),
                Print("  No schedules.\n"),
                ResetColor,
            )?;
        }

        for entry in &pet.schedules {
            let next = match next_due(entry, now) {
                Some(occ) => format!("next {}", format_timestamp(&occ.due_at)),
                None => "done".to_string(),
            };
            let muted = if entry.reminder_enabled { "" } else { " (no reminders)" };
            execute!(
                stdout,
                Print(format!(
                    "  {:<16} {:<10} {:<14} ",
                    entry.label,
                    entry.dose_or_amount,
                    entry.recurrence.to_string()
                )),
                SetForegroundColor(Colors::DIM),
                Print(format!("{next}{muted}\n")),
                ResetColor,
            )?;
        }

        stdout.flush()?;
        Ok(())
    }

    /// Print a confirmation message.
    pub fn print_success(&self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::SUCCESS),
            Print(format!("{}\n", msg)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Print an error message.
    pub fn print_error(&self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::ERROR),
            Print(format!("Error: {}\n", msg)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Print an info message.
    pub fn print_info(&self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::DIM),
            Print(format!("{}\n", msg)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }
}
