use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_opt(key).and_then(|v| v.parse().ok())
}

/// Data file override from `PAWCARE_DATA`.
pub fn data_file_from_env() -> Option<PathBuf> {
    env_opt("PAWCARE_DATA").map(PathBuf::from)
}

/// Reminder poller settings, typically parsed from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Seconds between two poll ticks.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
    /// Half-width of the window checked around "now" on each tick.
    #[serde(default = "default_lookahead")]
    pub lookahead_secs: u64,
    /// Span of the `upcoming` view.
    #[serde(default = "default_upcoming_window")]
    pub upcoming_window_hours: u32,
}

/// Widest poll window half-width: one day.
pub const MAX_LOOKAHEAD_SECS: u64 = 86_400;

fn default_tick_interval() -> u64 { 30 }
fn default_lookahead() -> u64 { 60 }
fn default_upcoming_window() -> u32 { 72 }

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval(),
            lookahead_secs: default_lookahead(),
            upcoming_window_hours: default_upcoming_window(),
        }
    }
}

impl PollerConfig {
    /// Apply `PAWCARE_TICK_SECS` / `PAWCARE_LOOKAHEAD_SECS` overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_u64("PAWCARE_TICK_SECS") {
            self.tick_interval_secs = v;
        }
        if let Some(v) = env_u64("PAWCARE_LOOKAHEAD_SECS") {
            self.lookahead_secs = v;
        }
        self
    }

    /// Tick period, never shorter than one second.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.max(1))
    }

    /// Lookahead, at least half a tick so no due instant falls between ticks,
    /// and at most [`MAX_LOOKAHEAD_SECS`].
    pub fn lookahead(&self) -> chrono::Duration {
        let half_tick = self.tick_interval().as_secs().div_ceil(2);
        let secs = self.lookahead_secs.max(half_tick).min(MAX_LOOKAHEAD_SECS);
        chrono::Duration::seconds(i64::try_from(secs).unwrap_or(86_400))
    }

    /// Span of `pawcare upcoming` when `--hours` is not given.
    pub fn upcoming_window(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.upcoming_window_hours.max(1)))
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!(
            tick_secs = self.tick_interval().as_secs(),
            lookahead_secs = self.lookahead().num_seconds(),
            "Poller config loaded"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poller_config_defaults() {
        let config = PollerConfig::default();
        assert_eq!(config.tick_interval_secs, 30);
        assert_eq!(config.lookahead_secs, 60);
        assert_eq!(config.upcoming_window_hours, 72);
        assert_eq!(config.tick_interval(), Duration::from_secs(30));
        assert_eq!(config.lookahead(), chrono::Duration::seconds(60));
    }

    #[test]
    fn lookahead_covers_half_a_tick() {
        let config = PollerConfig {
            tick_interval_secs: 300,
            lookahead_secs: 10,
            upcoming_window_hours: 72,
        };
        assert_eq!(config.lookahead(), chrono::Duration::seconds(150));
    }

    #[test]
    fn huge_lookahead_is_capped_at_a_day() {
        for lookahead_secs in [10_000_000_000_000, 100_000_000_000_000_000, u64::MAX] {
            let config = PollerConfig {
                lookahead_secs,
                ..PollerConfig::default()
            };
            assert_eq!(config.lookahead(), chrono::Duration::days(1));
        }
        let slow_tick = PollerConfig {
            tick_interval_secs: u64::MAX,
            ..PollerConfig::default()
        };
        assert_eq!(slow_tick.lookahead(), chrono::Duration::days(1));
    }

    #[test]
    fn upcoming_window_in_hours() {
        assert_eq!(PollerConfig::default().upcoming_window(), chrono::Duration::hours(72));
    }

    #[test]
    fn zero_tick_is_clamped() {
        let config = PollerConfig {
            tick_interval_secs: 0,
            ..PollerConfig::default()
        };
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn partial_config_uses_defaults() {
        let config: PollerConfig = serde_json::from_str(r#"{"tick_interval_secs": 45}"#).unwrap();
        assert_eq!(config.tick_interval_secs, 45);
        assert_eq!(config.lookahead_secs, 60);
    }
}
