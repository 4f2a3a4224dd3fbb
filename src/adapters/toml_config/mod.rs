// TOML config adapter - Configuration management using TOML files

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::model::SpeedFactor;
use crate::error::{SlowFastError, SlowFastResult};

const CONFIG_FILE: &str = "config.toml";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// ffmpeg executable used for probing and converting
    pub ffmpeg_path: PathBuf,
    /// Append ffmpeg's last error line to failure messages
    pub capture_diagnostics: bool,
    /// Speed used when neither the CLI nor stored settings provide one
    pub default_speed: Option<u16>,
    /// Default log filter
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            capture_diagnostics: true,
            default_speed: None,
            log_level: None,
        }
    }
}

impl AppConfig {
    /// Check values that serde cannot
    pub fn validate(&self) -> SlowFastResult<()> {
        if self.ffmpeg_path.as_os_str().is_empty() {
            return Err(SlowFastError::ConfigError {
                message: "ffmpeg_path cannot be empty".to_string(),
            });
        }
        if let Some(speed) = self.default_speed {
            SpeedFactor::from_percent(speed).map_err(|e| SlowFastError::ConfigError {
                message: format!("default_speed: {}", e),
            })?;
        }
        Ok(())
    }
}

/// On-disk layout: everything lives under a `[slowfast]` table
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    slowfast: AppConfig,
}

/// TOML configuration adapter
pub struct TomlConfigAdapter {
    path: PathBuf,
}

impl TomlConfigAdapter {
    /// Create adapter for an explicit config file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "SlowFastVideo")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration file. A missing file yields defaults; an
    /// unreadable or malformed one is an error.
    pub fn load(&self) -> SlowFastResult<AppConfig> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no config file, using defaults");
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| SlowFastError::ConfigError {
            message: format!("Failed to read config file {}: {}", self.path.display(), e),
        })?;

        let config = Self::deserialize_config(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize config to TOML string
    pub fn serialize_config(config: &AppConfig) -> SlowFastResult<String> {
        let document = ConfigDocument {
            slowfast: config.clone(),
        };
        toml::to_string_pretty(&document).map_err(|e| SlowFastError::ConfigError {
            message: format!("Failed to serialize config: {}", e),
        })
    }

    /// Deserialize config from TOML string
    pub fn deserialize_config(toml_content: &str) -> SlowFastResult<AppConfig> {
        let document: ConfigDocument =
            toml::from_str(toml_content).map_err(|e| SlowFastError::ConfigError {
                message: format!("Failed to parse TOML config: {}", e),
            })?;
        Ok(document.slowfast)
    }
}
