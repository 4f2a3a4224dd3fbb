use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::{AppConfig, FfmpegProbeAdapter, JsonSettingsAdapter};
use crate::app::convert_interactor::ConvertInteractor;
use crate::ports::{ProbePort, SettingsPort};

pub trait AppContainer: Send + Sync {
    fn convert_interactor(&self) -> Arc<ConvertInteractor>;
    fn probe_port(&self) -> Arc<dyn ProbePort>;
}

/// Wires the ffmpeg probe and JSON settings store into the interactors
pub struct DefaultAppContainer {
    probe_port: Arc<dyn ProbePort>,
    convert_interactor: Arc<ConvertInteractor>,
}

impl DefaultAppContainer {
    /// Build the container; `settings_path` overrides the platform default.
    pub fn new(config: AppConfig, settings_path: Option<PathBuf>) -> Self {
        let probe_port: Arc<dyn ProbePort> =
            Arc::new(FfmpegProbeAdapter::new(config.ffmpeg_path.clone()));
        let settings_port: Arc<dyn SettingsPort> = Arc::new(JsonSettingsAdapter::new(
            settings_path.unwrap_or_else(JsonSettingsAdapter::default_path),
        ));

        let convert_interactor = Arc::new(ConvertInteractor::new(
            Arc::clone(&probe_port),
            settings_port,
            config,
        ));

        Self {
            probe_port,
            convert_interactor,
        }
    }
}

impl AppContainer for DefaultAppContainer {
    fn convert_interactor(&self) -> Arc<ConvertInteractor> {
        Arc::clone(&self.convert_interactor)
    }

    fn probe_port(&self) -> Arc<dyn ProbePort> {
        Arc::clone(&self.probe_port)
    }
}
