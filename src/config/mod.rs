//! Configuration module for pmrecord-rs
//!
//! This module handles the recorder configuration file:
//! - Logger process settings used by the logger backend
//! - Timeouts applied by the controller worker
//!
//! # Config Location
//!
//! The configuration is looked up in this order:
//! 1. An explicit path (the CLI `--settings` flag)
//! 2. The `PMRECORD_CONFIG` environment variable
//! 3. The platform config directory under `pmrecord-rs/recorder.toml`:
//!    - **Linux**: `~/.config/pmrecord-rs/`
//!    - **macOS**: `~/Library/Application Support/pmrecord-rs/`
//!    - **Windows**: `%APPDATA%\pmrecord-rs\`
//!
//! A missing file yields the defaults.
//!
//! # Example
//!
//! ```ignore
//! use pmrecord_rs::config::RecorderConfig;
//!
//! let config = RecorderConfig::load_or_default();
//! let backend = LoggerBackend::new(config.logger.clone());
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{RecordError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "pmrecord-rs";

/// Config filename
pub const CONFIG_FILE: &str = "recorder.toml";

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "PMRECORD_CONFIG";

/// Current config format version
pub const CONFIG_VERSION: u32 = 1;

/// Get the platform config directory for this application
pub fn app_config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Resolve the config file path: environment override first, then the app dir
pub fn config_path() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => app_config_dir().map(|p| p.join(CONFIG_FILE)),
    }
}

/// Recorder configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Version for future migration support
    #[serde(default = "default_config_version")]
    pub version: u32,

    /// Logger process settings
    #[serde(default)]
    pub logger: LoggerSettings,

    /// Controller call limits
    #[serde(default)]
    pub control: ControlSettings,
}

fn default_config_version() -> u32 {
    CONFIG_VERSION
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            logger: LoggerSettings::default(),
            control: ControlSettings::default(),
        }
    }
}

impl RecorderConfig {
    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RecordError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            RecordError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        if config.version > CONFIG_VERSION {
            return Err(RecordError::Config(format!(
                "Config file {:?} has version {}, newest supported is {}",
                path, config.version, CONFIG_VERSION
            )));
        }

        Ok(config)
    }

    /// Load from the resolved default location; a missing file yields defaults
    pub fn load_default_location() -> Result<Self> {
        let path = config_path().ok_or_else(|| {
            RecordError::Config("Could not determine config path".to_string())
        })?;

        if !path.exists() {
            tracing::debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        Self::load(&path)
    }

    /// Load config, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load_default_location().unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config as TOML, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                RecordError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)?;

        std::fs::write(path, content)
            .map_err(|e| RecordError::Config(format!("Failed to write config file: {}", e)))
    }
}
