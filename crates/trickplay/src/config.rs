use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrickPlayError};
use crate::state::SpeedTable;
use crate::state::speed_table::DEFAULT_MULTIPLIERS;

/// Persisted engine configuration (~/.config/trickplay/config.json).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrickPlayConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    /// REW/FFW always force their own direction. When false, pressing the
    /// opposite key mid-trick-play slows down first.
    #[serde(default = "default_true")]
    pub direct_mode: bool,
    #[serde(default = "default_speed_table")]
    pub speed_table: Vec<u32>,
    #[serde(default = "default_skip_secs")]
    pub default_skip_secs: u32,
    /// Extrapolation tick for seek-only players.
    #[serde(default = "default_loop_interval_ms")]
    pub loop_interval_ms: u64,
    /// Wrap to the slowest multiplier after the fastest one.
    #[serde(default)]
    pub allow_speed_cycle: bool,
    #[serde(default = "default_skip_debounce_ms")]
    pub skip_debounce_ms: u64,
    /// Skips never land closer than this to the end of content.
    #[serde(default)]
    pub end_guard_ms: u64,
}

fn default_version() -> u32 { 1 }
fn default_true() -> bool { true }
fn default_speed_table() -> Vec<u32> { DEFAULT_MULTIPLIERS.to_vec() }
fn default_skip_secs() -> u32 { 30 }
fn default_loop_interval_ms() -> u64 { 1000 }
fn default_skip_debounce_ms() -> u64 { 1000 }

impl Default for TrickPlayConfig {
    fn default() -> Self {
        Self {
            version: 1,
            direct_mode: true,
            speed_table: DEFAULT_MULTIPLIERS.to_vec(),
            default_skip_secs: 30,
            loop_interval_ms: 1000,
            allow_speed_cycle: false,
            skip_debounce_ms: 1000,
            end_guard_ms: 0,
        }
    }
}

impl TrickPlayConfig {
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("trickplay").join("config.json")
    }

    /// Load from the default location, falling back to defaults on any problem.
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            log::info!("No trick-play config found, using defaults");
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => {
                log::info!("Loaded trick-play config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("{e}; using defaults");
                Self::default()
            }
        }
    }

    /// Load and validate a config file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| TrickPlayError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) {
        let path = Self::config_path();
        match self.save_to(&path) {
            Ok(()) => log::debug!("Saved trick-play config to {}", path.display()),
            Err(e) => log::error!("{e}"),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let io_err = |source| TrickPlayError::ConfigIo {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(io_err)
    }

    /// Check the invariants the engines rely on.
    pub fn validate(&self) -> Result<()> {
        self.speed_table()?;
        if self.loop_interval_ms == 0 {
            return Err(TrickPlayError::ZeroLoopInterval);
        }
        if self.skip_debounce_ms == 0 {
            return Err(TrickPlayError::ZeroSkipDebounce);
        }
        Ok(())
    }

    pub fn speed_table(&self) -> Result<SpeedTable> {
        SpeedTable::new(self.speed_table.clone())
    }

    pub fn loop_interval(&self) -> Duration {
        Duration::from_millis(self.loop_interval_ms)
    }

    pub fn skip_debounce(&self) -> Duration {
        Duration::from_millis(self.skip_debounce_ms)
    }
}
