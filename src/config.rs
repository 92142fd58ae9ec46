//! Runtime configuration (`civloop.yaml`).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::world::EventKind;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Wall-clock time between simulated years.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default)]
    pub save: SaveConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Popups of these kinds never pause the run.
    #[serde(default)]
    pub auto_dismiss: Vec<EventKind>,
    /// Stop after this many finished runs when auto restart is on.
    #[serde(default)]
    pub max_runs: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveConfig {
    #[serde(default = "default_save_path")]
    pub path: PathBuf,
    /// Zero disables autosave.
    #[serde(default = "default_autosave_every_ticks")]
    pub autosave_every_ticks: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_tick_interval_ms() -> u64 {
    100
}

fn default_save_path() -> PathBuf {
    PathBuf::from("saves/civloop.json")
}

fn default_autosave_every_ticks() -> u64 {
    50
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            path: default_save_path(),
            autosave_every_ticks: default_autosave_every_ticks(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            save: SaveConfig::default(),
            logging: LoggingConfig::default(),
            auto_dismiss: Vec::new(),
            max_runs: None,
        }
    }
}

impl SessionConfig {
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: SessionConfig =
            serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path` when it exists, otherwise fall back to the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_yaml(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "tick_interval_ms must be greater than zero".into(),
            ));
        }
        if self.max_runs == Some(0) {
            return Err(ConfigError::Invalid("max_runs must be at least 1".into()));
        }
        Ok(())
    }
}
