mod cli;
mod commands;
mod config;
mod terminal;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use crate::cli::CliArgs;
use crate::config::CliConfig;
use crate::terminal::Terminal;

#[tokio::main]
async fn main() -> Result<()> {
    pawcare_core::config::load_dotenv();

    let args = CliArgs::parse();

    // The watcher logs each tick; one-shot commands stay quiet.
    let default_level = if args.command.is_long_running() { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let terminal = Terminal::new();

    let config = CliConfig::load(args.config.as_deref())
        .context("failed to load configuration")?;
    let data_file = config.resolve_data_file(args.data.as_deref())?;
    debug!(data_file = %data_file.display(), "Using pet data file");

    if let Err(e) = commands::run(args.command, &config, &data_file, &terminal).await {
        terminal.print_error(&format!("{e:#}"))?;
        std::process::exit(1);
    }
    Ok(())
}
