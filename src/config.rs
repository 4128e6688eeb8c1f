//! Player configuration with persistence.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "MPLAYER_CTL_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Failed to access config file: {0}")]
  Io(#[from] std::io::Error),
  #[error("Invalid config JSON: {0}")]
  Json(#[from] serde_json::Error),
  #[error("Invalid config: {0}")]
  Invalid(String),
}

/// Player configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerConfig {
  /// Custom MPlayer executable path (None = auto-detect).
  #[serde(default)]
  pub mplayer_path: Option<String>,

  /// Additional MPlayer command-line arguments.
  #[serde(default)]
  pub mplayer_args: Vec<String>,

  /// How long to wait for an answer, in milliseconds. `null` waits forever.
  #[serde(default = "default_reply_timeout_ms")]
  pub reply_timeout_ms: Option<u64>,

  /// How long `load` waits for playback to start, in milliseconds. `null` waits forever.
  #[serde(default = "default_load_timeout_ms")]
  pub load_timeout_ms: Option<u64>,
}

fn default_reply_timeout_ms() -> Option<u64> {
  Some(5_000)
}

fn default_load_timeout_ms() -> Option<u64> {
  Some(30_000)
}

impl Default for PlayerConfig {
  fn default() -> Self {
    Self {
      mplayer_path: None,
      mplayer_args: Vec::new(),
      reply_timeout_ms: default_reply_timeout_ms(),
      load_timeout_ms: default_load_timeout_ms(),
    }
  }
}

impl PlayerConfig {
  /// Validate configuration values.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.reply_timeout_ms == Some(0) {
      return Err(ConfigError::Invalid(
        "Reply timeout must be positive or null".to_string(),
      ));
    }
    if self.load_timeout_ms == Some(0) {
      return Err(ConfigError::Invalid(
        "Load timeout must be positive or null".to_string(),
      ));
    }
    if self.mplayer_args.iter().any(|arg| arg.trim().is_empty()) {
      return Err(ConfigError::Invalid(
        "MPlayer arguments cannot be empty".to_string(),
      ));
    }
    Ok(())
  }

  /// Configured executable, ignoring an empty string.
  pub fn mplayer_path(&self) -> Option<PathBuf> {
    self
      .mplayer_path
      .as_ref()
      .filter(|s| !s.trim().is_empty())
      .map(PathBuf::from)
  }

  pub fn reply_timeout(&self) -> Option<Duration> {
    self.reply_timeout_ms.map(Duration::from_millis)
  }

  pub fn load_timeout(&self) -> Option<Duration> {
    self.load_timeout_ms.map(Duration::from_millis)
  }

  /// Default config file location: `$MPLAYER_CTL_CONFIG`, else the user config dir.
  pub fn default_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
      return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("mplayer-ctl").join("config.json"))
  }

  /// Load and validate a config file. A missing file yields the defaults.
  pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
    if !path.exists() {
      log::info!("No config at {}, using defaults", path.display());
      return Ok(Self::default());
    }
    let text = fs::read_to_string(path)?;
    let config: Self = serde_json::from_str(&text)?;
    config.validate()?;
    log::info!("Loaded config from {}", path.display());
    Ok(config)
  }

  /// Load from [`PlayerConfig::default_path`].
  pub fn load() -> Result<Self, ConfigError> {
    match Self::default_path() {
      Some(path) => Self::load_from(&path),
      None => Ok(Self::default()),
    }
  }

  /// Validate and write as pretty JSON, creating parent directories.
  pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
    self.validate()?;
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(self)?)?;
    Ok(())
  }
}
