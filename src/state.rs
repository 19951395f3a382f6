use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SyncError;
use crate::types::Config;
use crate::watermark::FileWatermarkStore;

/// Environment variable that overrides `apiKey` from the config file.
pub const API_KEY_ENV: &str = "CLINICSYNC_API_KEY";

/// Get the state directory (~/.clinicsync)
pub fn state_dir() -> Result<PathBuf, SyncError> {
    let home = dirs::home_dir()
        .ok_or_else(|| SyncError::Configuration("Could not find home directory".to_string()))?;
    Ok(home.join(".clinicsync"))
}

/// Get the canonical config file path (~/.clinicsync/config.json)
pub fn config_path() -> Result<PathBuf, SyncError> {
    Ok(state_dir()?.join("config.json"))
}

/// Load configuration from `path`, or ~/.clinicsync/config.json when `None`.
pub fn load_config(path: Option<&Path>) -> Result<Config, SyncError> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => config_path()?,
    };

    if !config_path.exists() {
        return Err(SyncError::Configuration(format!(
            "Config file not found at {}. Create it with: {{ \"apiKey\": \"…\", \"masterSpreadsheetId\": \"…\", \"usersSpreadsheetId\": \"…\" }}",
            config_path.display()
        )));
    }

    let content = fs::read_to_string(&config_path)?;
    let mut config: Config = serde_json::from_str(&content).map_err(|e| {
        SyncError::Configuration(format!("Failed to parse {}: {}", config_path.display(), e))
    })?;

    apply_env_overrides(&mut config, std::env::var(API_KEY_ENV).ok());
    config.validate()?;
    Ok(config)
}

fn apply_env_overrides(config: &mut Config, api_key: Option<String>) {
    if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
        config.api_key = key;
    }
}

/// Where the watermark lives: `statePath` from config, else
/// ~/.clinicsync/watermark.json
pub fn watermark_path(config: &Config) -> Result<PathBuf, SyncError> {
    match &config.state_path {
        Some(p) if !p.trim().is_empty() => Ok(PathBuf::from(p)),
        _ => Ok(state_dir()?.join("watermark.json")),
    }
}

pub fn open_watermark_store(config: &Config) -> Result<FileWatermarkStore, SyncError> {
    Ok(FileWatermarkStore::new(
        watermark_path(config)?,
        config.header_rows,
    ))
}
