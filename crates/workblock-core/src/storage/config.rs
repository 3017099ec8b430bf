//! TOML-based application configuration.
//!
//! Stores:
//! - Scheduler tuning (granularity, lookahead, work-window title, policy)
//! - The label → duration tier table
//! - Scoring weights
//! - Endpoints of the task source and calendar
//!
//! Configuration is stored at `~/.config/workblock/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::scheduler::{
    ConflictMode, PlacementPolicy, SchedulerConfig, ScoringWeights, MAX_LOOKAHEAD_DAYS,
};
use crate::task::duration::{default_tiers, DurationTier};

/// Scheduler configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerSection {
    #[serde(default = "default_granularity")]
    pub granularity_minutes: i64,
    #[serde(default = "default_lookahead_days")]
    pub lookahead_days: i64,
    #[serde(default = "default_work_block_title")]
    pub work_block_title: String,
    #[serde(default)]
    pub policy: PlacementPolicy,
    #[serde(default)]
    pub conflict_mode: ConflictMode,
}

/// Label → duration table. Order matters: the first matching tier wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationsConfig {
    #[serde(default = "default_tiers")]
    pub tiers: Vec<DurationTier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoistConfig {
    #[serde(default = "default_todoist_api_url")]
    pub api_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleConfig {
    #[serde(default = "default_google_api_url")]
    pub api_url: String,
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/workblock/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerSection,
    #[serde(default)]
    pub durations: DurationsConfig,
    #[serde(default)]
    pub scoring: ScoringWeights,
    #[serde(default)]
    pub todoist: TodoistConfig,
    #[serde(default)]
    pub google: GoogleConfig,
}

// Default functions
fn default_granularity() -> i64 {
    15
}
fn default_lookahead_days() -> i64 {
    14
}
fn default_work_block_title() -> String {
    "Work Block".into()
}
fn default_todoist_api_url() -> String {
    "https://api.todoist.com/rest/v2".into()
}
fn default_google_api_url() -> String {
    "https://www.googleapis.com/calendar/v3".into()
}
fn default_calendar_id() -> String {
    "primary".into()
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            granularity_minutes: default_granularity(),
            lookahead_days: default_lookahead_days(),
            work_block_title: default_work_block_title(),
            policy: PlacementPolicy::default(),
            conflict_mode: ConflictMode::default(),
        }
    }
}

impl Default for DurationsConfig {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
        }
    }
}

impl Default for TodoistConfig {
    fn default() -> Self {
        Self {
            api_url: default_todoist_api_url(),
        }
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_url: default_google_api_url(),
            calendar_id: default_calendar_id(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        if key.is_empty() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut parts = key.split('.').peekable();
        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => value
                        .parse::<bool>()
                        .map(serde_json::Value::Bool)
                        .map_err(|e| ConfigError::invalid(key, e.to_string()))?,
                    serde_json::Value::Number(_) => parse_number(key, value)?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value)
                            .map_err(|e| ConfigError::invalid(key, e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    /// Path of the config file in the data directory.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing defaults first if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or is
    /// invalid, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Like [`Config::load`], from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// The result must still pass [`Config::validate`]; on error `self` is
    /// left untouched.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::invalid(key, e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed
    /// or fails validation, or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    /// Check every value the scheduler relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scheduler;
        if s.granularity_minutes <= 0 || 60 % s.granularity_minutes != 0 {
            return Err(ConfigError::invalid(
                "scheduler.granularity_minutes",
                format!("{} does not divide 60", s.granularity_minutes),
            ));
        }
        if s.lookahead_days <= 0 || s.lookahead_days > MAX_LOOKAHEAD_DAYS {
            return Err(ConfigError::invalid(
                "scheduler.lookahead_days",
                format!("must be between 1 and {MAX_LOOKAHEAD_DAYS}"),
            ));
        }
        if s.work_block_title.trim().is_empty() {
            return Err(ConfigError::invalid(
                "scheduler.work_block_title",
                "must not be empty",
            ));
        }

        if self.durations.tiers.is_empty() {
            return Err(ConfigError::invalid("durations.tiers", "at least one tier is required"));
        }
        for tier in &self.durations.tiers {
            if tier.label.is_empty() {
                return Err(ConfigError::invalid("durations.tiers", "tier label is empty"));
            }
            if tier.minutes <= 0 || tier.minutes > MAX_LOOKAHEAD_DAYS * 24 * 60 {
                return Err(ConfigError::invalid(
                    "durations.tiers",
                    format!("tier '{}' duration {} is out of range", tier.label, tier.minutes),
                ));
            }
        }
        Ok(())
    }

    /// Scheduler settings derived from this config.
    pub fn to_scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            granularity_minutes: self.scheduler.granularity_minutes,
            lookahead_days: self.scheduler.lookahead_days,
            work_block_title: self.scheduler.work_block_title.clone(),
            policy: self.scheduler.policy,
            conflict_mode: self.scheduler.conflict_mode,
            tiers: self.durations.tiers.clone(),
            weights: self.scoring.clone(),
        }
    }
}

fn parse_number(key: &str, value: &str) -> Result<serde_json::Value, ConfigError> {
    if let Ok(n) = value.parse::<i64>() {
        return Ok(serde_json::Value::Number(n.into()));
    }
    value
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(serde_json::Value::Number)
        .ok_or_else(|| ConfigError::invalid(key, format!("cannot parse '{value}' as number")))
}
