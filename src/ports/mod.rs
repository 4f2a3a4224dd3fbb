// Ports - Interface definitions (contracts)

use std::path::Path;

use async_trait::async_trait;

use crate::domain::model::Settings;
use crate::error::SlowFastResult;

/// Port for reading a media file's duration
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Total duration in seconds, or `None` when the tool reports none
    async fn probe_duration(&self, file_path: &Path) -> SlowFastResult<Option<f64>>;
}

/// Port for persisting user preferences between runs
#[async_trait]
pub trait SettingsPort: Send + Sync {
    /// Load stored settings. Missing or unreadable documents yield defaults.
    async fn load_settings(&self) -> Settings;

    /// Store settings, replacing the previous document
    async fn save_settings(&self, settings: &Settings) -> SlowFastResult<()>;
}
