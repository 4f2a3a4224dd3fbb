// JSON settings adapter - Preferences persisted as a flat JSON document

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use directories::ProjectDirs;
use tracing::{debug, info, warn};

use crate::domain::model::Settings;
use crate::error::{SlowFastError, SlowFastResult};
use crate::ports::SettingsPort;

const SETTINGS_FILE: &str = "settings.json";

/// Settings stored as `{"last_folder": ..., "last_speed": ...}`
pub struct JsonSettingsAdapter {
    path: PathBuf,
}

impl JsonSettingsAdapter {
    /// Create adapter for an explicit document path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default document location in the platform config directory,
    /// falling back to the current directory
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "SlowFastVideo")
            .map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
            .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SettingsPort for JsonSettingsAdapter {
    async fn load_settings(&self) -> Settings {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no settings stored yet");
                return Settings::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not read settings, using defaults");
                return Settings::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring malformed settings");
                Settings::default()
            }
        }
    }

    async fn save_settings(&self, settings: &Settings) -> SlowFastResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SlowFastError::SettingsError {
                    message: format!("Failed to create settings directory: {}", e),
                })?;
        }

        let content =
            serde_json::to_string_pretty(settings).map_err(|e| SlowFastError::SettingsError {
                message: format!("Failed to serialize settings: {}", e),
            })?;

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| SlowFastError::SettingsError {
                message: format!("Failed to write settings file: {}", e),
            })?;

        info!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}
