mod config;

pub use config::{Config, DurationsConfig, GoogleConfig, SchedulerSection, TodoistConfig};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/workblock[-dev]/` based on WORKBLOCK_ENV.
///
/// Set WORKBLOCK_ENV=dev to use development data directory.
/// WORKBLOCK_CONFIG_DIR replaces the directory altogether.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("WORKBLOCK_CONFIG_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("WORKBLOCK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("workblock-dev")
            } else {
                base_dir.join("workblock")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::LoadFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
