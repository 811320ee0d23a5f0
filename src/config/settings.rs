use anyhow::Result;
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

use super::BridgeConfig;

const APP_NAME: &str = "OpenFileBridge";
const CONFIG_FILE: &str = "config.json";

/// Returns the platform-specific configuration directory for the bridge.
pub fn get_config_directory() -> Option<PathBuf> {
    ProjectDirs::from("com", "openfilebridge", APP_NAME)
        .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
}

/// Returns the full path to the configuration file.
pub fn get_config_file_path() -> Option<PathBuf> {
    get_config_directory().map(|dir| dir.join(CONFIG_FILE))
}

fn resolve_path(override_path: Option<&Path>) -> Result<PathBuf> {
    match override_path {
        Some(path) => Ok(path.to_path_buf()),
        None => get_config_file_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory")),
    }
}

/// Loads the configuration from `override_path` or the default location.
///
/// A missing file is created with defaults. A file that cannot be parsed is
/// left alone and the defaults are used instead.
pub fn load_config(override_path: Option<&Path>) -> Result<BridgeConfig> {
    let config_path = resolve_path(override_path)?;

    if !config_path.exists() {
        tracing::info!(
            "Config file not found, creating default config at {:?}",
            config_path
        );
        let default_config = BridgeConfig::default();
        save_config(&default_config, Some(&config_path))?;
        return Ok(default_config);
    }

    let config_content = fs::read_to_string(&config_path)?;

    match serde_json::from_str::<BridgeConfig>(&config_content) {
        Ok(config) => {
            tracing::info!("Loaded config from {:?}", config_path);
            Ok(config)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to parse config file at {:?}: {}. Falling back to default config.",
                config_path,
                e
            );
            Ok(BridgeConfig::default())
        }
    }
}

/// Saves the configuration to `override_path` or the default location.
pub fn save_config(config: &BridgeConfig, override_path: Option<&Path>) -> Result<()> {
    let config_path = resolve_path(override_path)?;

    if let Some(config_dir) = config_path.parent() {
        if !config_dir.as_os_str().is_empty() && !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            tracing::info!("Created config directory: {:?}", config_dir);
        }
    }

    let config_json = serde_json::to_string_pretty(config)?;
    fs::write(&config_path, config_json)?;
    tracing::info!("Saved config to {:?}", config_path);

    Ok(())
}

// Platform-specific configuration paths for reference:
// macOS:   ~/Library/Application Support/com.openfilebridge.OpenFileBridge/
// Linux:   ~/.config/openfilebridge/
// Windows: %APPDATA%/openfilebridge/OpenFileBridge/config/
