//! Settings file discovery and loading.

use super::DeployConfig;
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the workspace root.
pub const WORKSPACE_CONFIG_NAME: &str = "sketch-deploy.json";

/// Environment variable overriding `log_level`.
pub const LOG_LEVEL_ENV: &str = "SKETCH_DEPLOY_LOG";

/// Get the global settings path: ~/.config/sketch-deploy/settings.json
pub fn get_global_settings_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::ValidationFailed("Cannot determine home directory".to_string())
    })?;

    Ok(home.join(".config/sketch-deploy").join("settings.json"))
}

/// Load config from JSON file.
pub fn load_config_from_file(path: &Path) -> Result<DeployConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(format!(
                "Configuration file not found at: {}",
                path.display()
            ))
        } else {
            ConfigError::IoError(e)
        }
    })?;

    let config: DeployConfig = serde_json::from_str(&content).map_err(ConfigError::InvalidJson)?;

    Ok(config)
}

/// Pick the settings file for a workspace, if any.
///
/// The workspace file wins over the global one. `None` means built-in defaults.
pub fn find_config_file(workspace_dir: &Path, global_path: Option<&Path>) -> Option<PathBuf> {
    let local = workspace_dir.join(WORKSPACE_CONFIG_NAME);
    if local.is_file() {
        return Some(local);
    }

    match global_path {
        Some(global) if global.is_file() => Some(global.to_path_buf()),
        _ => None,
    }
}

/// Apply a `SKETCH_DEPLOY_LOG` value, ignoring blanks.
pub fn apply_log_level_override(config: &mut DeployConfig, value: Option<String>) {
    if let Some(level) = value {
        let level = level.trim();
        if !level.is_empty() {
            config.log_level = level.to_lowercase();
        }
    }
}

/// Resolve, load and validate the configuration for a workspace.
pub fn resolve_config(workspace_dir: &Path) -> Result<DeployConfig, ConfigError> {
    let global = get_global_settings_path().ok();
    let mut config = match find_config_file(workspace_dir, global.as_deref()) {
        Some(path) => {
            log::debug!("[Config] Loading settings from {}", path.display());
            load_config_from_file(&path)?
        }
        None => {
            log::debug!("[Config] No settings file found, using built-in defaults");
            DeployConfig::default()
        }
    };

    config.workspace_dir = workspace_dir.to_path_buf();
    apply_log_level_override(&mut config, std::env::var(LOG_LEVEL_ENV).ok());
    super::validator::validate_config(&config)?;

    Ok(config)
}
