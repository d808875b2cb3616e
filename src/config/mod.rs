// Configuration management for keyplayer
// Handles loading/saving settings, with sensible defaults when config is missing

use anyhow::Result;
use dirs::{config_dir, data_dir};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub data_dir: PathBuf,    // favorites / playlists / active playlist id
    pub log_dir: PathBuf,
    pub library_dir: PathBuf, // album folder of .mid files
    pub smart_pause: bool,
    #[serde(default)]
    pub timing: TimingConfig,
}

/// Every delay the session controller waits on, in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub play_grace_ms: u64,            // engine settle time before trusting status after play
    pub seek_debounce_ms: u64,         // idle window that coalesces a burst of seeks
    pub seek_settle_ms: u64,           // progress events ignored this long after a drag ends
    pub smart_pause_interval_ms: u64,  // focus poll period
    pub smart_pause_cooldown_ms: u64,  // quiet period after any manual action
    pub progress_interval_ms: u64,     // simulated engine tick
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            play_grace_ms: 150,
            seek_debounce_ms: 150,
            seek_settle_ms: 300,
            smart_pause_interval_ms: 1000,
            smart_pause_cooldown_ms: 3000,
            progress_interval_ms: 100,
        }
    }
}

impl TimingConfig {
    pub fn play_grace(&self) -> Duration {
        Duration::from_millis(self.play_grace_ms)
    }

    pub fn seek_debounce(&self) -> Duration {
        Duration::from_millis(self.seek_debounce_ms)
    }

    pub fn seek_settle(&self) -> Duration {
        Duration::from_millis(self.seek_settle_ms)
    }

    pub fn smart_pause_interval(&self) -> Duration {
        Duration::from_millis(self.smart_pause_interval_ms.max(1))
    }

    pub fn smart_pause_cooldown(&self) -> Duration {
        Duration::from_millis(self.smart_pause_cooldown_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("keyplayer");

        Self {
            log_dir: data_dir.join("logs"),
            library_dir: PathBuf::from("album"),
            data_dir,
            smart_pause: true,
            timing: TimingConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Read `path`, or write defaults there when it does not exist yet
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("keyplayer");

        Ok(config_dir.join("config.toml"))
    }
}
