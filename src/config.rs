//! # Configuration Management Module
//!
//! Persistent kiosk settings stored in platform-appropriate locations.
//! Handles loading, saving, and providing defaults for configuration options.
//!
//! ## Settings
//! - `server_address` / `speech_address`: backend hosts for data and speech
//! - `*_ms` timings: scan/prune cadence, device timeout, manual scan animation,
//!   hold-to-navigate interval and HTTP request timeout
//!
//! ## Storage Location
//! - macOS: ~/Library/Application Support/visum-kiosk/config.toml
//! - Linux: ~/.config/visum-kiosk/config.toml
//! - Windows: %APPDATA%\visum-kiosk\config.toml
//!
//! Fields missing from an older file fall back to their defaults, so new
//! settings can be added without breaking existing kiosks.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::error::ConfigError;

/// Periodic timers must tick; a zero period is raised to this
const MIN_PERIOD_MS: u64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_address: String,
    pub speech_address: String,
    pub scan_interval_ms: u64,
    pub prune_interval_ms: u64,
    pub device_timeout_ms: u64,
    pub manual_scan_duration_ms: u64,
    pub manual_scan_reset_ms: u64,
    pub hold_navigation_interval_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_address: "http://localhost:5000".to_string(),
            speech_address: "http://localhost:5001".to_string(),
            scan_interval_ms: 3000,
            prune_interval_ms: 1000,
            device_timeout_ms: 5000,
            manual_scan_duration_ms: 2000,
            manual_scan_reset_ms: 1500,
            hold_navigation_interval_ms: 500,
            request_timeout_ms: 10_000,
        }
    }
}

impl Config {
    /// Get the path to the config file
    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("visum-kiosk")
            .join("config.toml")
    }

    /// Load config from the default location, or create it with defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`, writing defaults there if the file doesn't exist
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let config: Config = toml::from_str(&contents)
                    .map_err(ConfigError::ParseFailed)?;
                config.warn_on_zero_periods();
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.save_to(path)?;
                log::info!("Created default config at {}", path.display());
                Ok(config)
            }
            Err(e) => Err(ConfigError::ReadFailed(e)),
        }
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(ConfigError::WriteFailed)?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(ConfigError::SerializeFailed)?;
        fs::write(path, toml_string)
            .map_err(ConfigError::WriteFailed)?;

        Ok(())
    }

    fn warn_on_zero_periods(&self) {
        let periods = [
            ("scan_interval_ms", self.scan_interval_ms),
            ("prune_interval_ms", self.prune_interval_ms),
            ("hold_navigation_interval_ms", self.hold_navigation_interval_ms),
        ];
        for (name, value) in periods {
            if value < MIN_PERIOD_MS {
                log::warn!("{} = {} is not a valid period, using {} ms", name, value, MIN_PERIOD_MS);
            }
        }
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms.max(MIN_PERIOD_MS))
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_millis(self.prune_interval_ms.max(MIN_PERIOD_MS))
    }

    pub fn device_timeout(&self) -> Duration {
        Duration::from_millis(self.device_timeout_ms)
    }

    pub fn manual_scan_duration(&self) -> Duration {
        Duration::from_millis(self.manual_scan_duration_ms)
    }

    pub fn manual_scan_reset(&self) -> Duration {
        Duration::from_millis(self.manual_scan_reset_ms)
    }

    pub fn hold_navigation_interval(&self) -> Duration {
        Duration::from_millis(self.hold_navigation_interval_ms.max(MIN_PERIOD_MS))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
