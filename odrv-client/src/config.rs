use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Device path used when `--path` is not given.
    #[serde(default = "default_path")]
    pub default_path: String,
    #[serde(default = "default_discovery_interval_ms")]
    pub discovery_interval_ms: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Persist shell history between sessions.
    #[serde(default = "default_save_history")]
    pub save_history: bool,
}

fn default_path() -> String {
    "usb".to_string()
}

fn default_discovery_interval_ms() -> u64 {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_save_history() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_path: default_path(),
            discovery_interval_ms: default_discovery_interval_ms(),
            log_level: default_log_level(),
            save_history: default_save_history(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Load the config at `path`, writing defaults there if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Loading config from: {:?}", path);
            let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
            let config: Config =
                serde_json::from_str(&contents).context("Failed to parse config file")?;
            Ok(config)
        } else {
            warn!("Config file not found, using defaults");
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let config_dir = path.parent().context("Failed to get config directory")?;

        std::fs::create_dir_all(config_dir).context("Failed to create config directory")?;

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        info!("Config saved to: {:?}", path);
        Ok(())
    }

    /// Remove the config file and shell history.
    pub fn clear() -> Result<()> {
        let dir = Self::config_dir()?;
        if dir.exists() {
            std::fs::remove_dir_all(&dir).context("Failed to remove config directory")?;
            info!("Removed {:?}", dir);
        } else {
            info!("Nothing to clear");
        }
        Ok(())
    }

    /// Where the shell keeps its line history, if history is enabled.
    pub fn history_path(&self) -> Option<PathBuf> {
        if !self.save_history {
            return None;
        }
        Self::config_dir().ok().map(|dir| dir.join("history.txt"))
    }

    fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;
        Ok(config_dir.join("odrivetool"))
    }

    fn config_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}
