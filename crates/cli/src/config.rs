use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use pawcare_core::PollerConfig;
use pawcare_notify::{ReminderRenderer, WebhookNotifier};

/// CLI configuration loaded from TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CliConfig {
    /// Pet data file (default: <data dir>/pawcare/pets.json)
    #[serde(default)]
    pub data_file: Option<PathBuf>,

    /// Ring the terminal bell on console reminders
    #[serde(default)]
    pub bell: bool,

    /// Minijinja template for reminder titles
    #[serde(default)]
    pub title_template: Option<String>,

    /// Minijinja template for reminder bodies
    #[serde(default)]
    pub message_template: Option<String>,

    /// Reminder watcher settings
    #[serde(default)]
    pub poller: PollerConfig,

    /// Optional HTTP endpoint that also receives reminders
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Target URL; `${VAR}` references are resolved from the environment
    pub url: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
}

impl CliConfig {
    /// Return the default config directory path: ~/.config/pawcare/
    pub fn default_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("could not determine user config directory")?
            .join("pawcare");
        Ok(config_dir)
    }

    /// Return the default config file path.
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.toml"))
    }

    /// Load config from the given path, or the default path.
    /// Writes and returns the default config if the file does not exist.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };
        Self::load_from(&config_path)
    }

    fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            debug!(?config_path, "Loading config");
            let content = std::fs::read_to_string(config_path)
                .with_context(|| format!("failed to read config: {}", config_path.display()))?;
            let config: Self = toml::from_str(&content)
                .with_context(|| format!("failed to parse config: {}", config_path.display()))?;
            Ok(config)
        } else {
            debug!(?config_path, "Config file not found, using defaults");
            let config = Self::default();
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            let toml_str = toml::to_string_pretty(&config)
                .context("failed to serialize default config")?;
            std::fs::write(config_path, toml_str).ok();
            Ok(config)
        }
    }

    /// Resolve the pet data file.
    /// Priority: cli_override > PAWCARE_DATA > config file > data dir default.
    pub fn resolve_data_file(&self, cli_override: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = cli_override {
            return Ok(path.to_path_buf());
        }
        if let Some(path) = pawcare_core::config::data_file_from_env() {
            return Ok(path);
        }
        if let Some(path) = &self.data_file {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir().context("could not determine user data directory")?;
        Ok(data_dir.join("pawcare").join("pets.json"))
    }

    /// Build the reminder renderer, falling back to built-in templates
    /// for whichever template is not configured.
    pub fn renderer(&self) -> Result<ReminderRenderer> {
        let defaults = (
            pawcare_notify::templating::DEFAULT_TITLE_TEMPLATE,
            pawcare_notify::templating::DEFAULT_MESSAGE_TEMPLATE,
        );
        let title = self.title_template.as_deref().unwrap_or(defaults.0);
        let message = self.message_template.as_deref().unwrap_or(defaults.1);
        ReminderRenderer::new(title, message).context("invalid reminder template")
    }

    /// Build the webhook channel if one is configured.
    pub fn webhook_notifier(&self) -> Result<Option<WebhookNotifier>> {
        let Some(webhook) = &self.webhook else {
            return Ok(None);
        };
        let notifier = WebhookNotifier::from_config(
            &webhook.url,
            webhook.method.as_deref(),
            webhook.headers.clone(),
        )
        .context("invalid webhook configuration")?;
        Ok(Some(notifier))
    }
}
