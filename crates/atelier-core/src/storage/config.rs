//! TOML-based application configuration.
//!
//! Stores the work-hours policy and calendar provider settings.
//! Configuration lives at `~/.config/atelier/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::scheduler::WorkPolicy;

/// Work-hours policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkConfig {
    /// First schedulable hour of the day, UTC (inclusive).
    #[serde(default = "default_start_hour")]
    pub start_hour: u32,
    /// End of the work day, UTC (exclusive).
    #[serde(default = "default_end_hour")]
    pub end_hour: u32,
    /// Lunch start, minutes past midnight.
    #[serde(default = "default_lunch_start_minute")]
    pub lunch_start_minute: u32,
    /// Lunch length in minutes. Zero disables the block.
    #[serde(default = "default_lunch_minutes")]
    pub lunch_minutes: u32,
    /// How many weeks forward the scheduler searches before reporting a
    /// chunk unplaced.
    #[serde(default = "default_horizon_weeks")]
    pub horizon_weeks: u32,
}

/// Calendar provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Calendar the scheduler reads rocks from.
    #[serde(default = "default_calendar_id")]
    pub reference_calendar_id: String,
    /// Calendar published chunk events are written to.
    #[serde(default = "default_calendar_id")]
    pub work_calendar_id: String,
    /// Request timeout; a timed-out write is a per-chunk failure.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Environment variable holding the OAuth access token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/atelier/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub work: WorkConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
}

fn default_start_hour() -> u32 {
    12
}
fn default_end_hour() -> u32 {
    20
}
fn default_lunch_start_minute() -> u32 {
    15 * 60
}
fn default_lunch_minutes() -> u32 {
    60
}
fn default_horizon_weeks() -> u32 {
    12
}
fn default_calendar_id() -> String {
    "primary".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_token_env() -> String {
    "ATELIER_GOOGLE_TOKEN".to_string()
}

impl Default for WorkConfig {
    fn default() -> Self {
        Self {
            start_hour: default_start_hour(),
            end_hour: default_end_hour(),
            lunch_start_minute: default_lunch_start_minute(),
            lunch_minutes: default_lunch_minutes(),
            horizon_weeks: default_horizon_weeks(),
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            reference_calendar_id: default_calendar_id(),
            work_calendar_id: default_calendar_id(),
            timeout_secs: default_timeout_secs(),
            token_env: default_token_env(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work: WorkConfig::default(),
            calendar: CalendarConfig::default(),
        }
    }
}

impl Config {
    fn path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written
    /// to disk.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(Self::path()?, content)?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// The scheduler policy described by this configuration.
    pub fn work_policy(&self) -> WorkPolicy {
        WorkPolicy {
            start_hour: self.work.start_hour,
            end_hour: self.work.end_hour,
            lunch_start_minute: self.work.lunch_start_minute,
            lunch_minutes: self.work.lunch_minutes,
            horizon_weeks: self.work.horizon_weeks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.work.start_hour, 12);
        assert_eq!(parsed.work.end_hour, 20);
        assert_eq!(parsed.calendar.timeout_secs, 10);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg: Config = toml::from_str("[work]\nstart_hour = 9\n").unwrap();
        assert_eq!(cfg.work.start_hour, 9);
        assert_eq!(cfg.work.end_hour, 20);
        assert_eq!(cfg.calendar.token_env, "ATELIER_GOOGLE_TOKEN");
    }

    #[test]
    fn work_policy_reflects_config() {
        let mut cfg = Config::default();
        cfg.work.lunch_start_minute = 13 * 60;
        cfg.work.lunch_minutes = 30;
        let policy = cfg.work_policy();
        assert_eq!(policy.lunch_start_minute, 13 * 60);
        assert_eq!(policy.lunch_minutes, 30);
    }
}
