// Convert interactor - Orchestrates the speed change use case

use std::sync::Arc;

use tracing::{info, warn};

use crate::adapters::AppConfig;
use crate::domain::model::*;
use crate::engine::{ProcessSupervisor, RunHandle, RunOutcome};
use crate::error::{SlowFastError, SlowFastResult};
use crate::ports::*;
use crate::utils::PathUtils;

/// Interactor for the convert use case
pub struct ConvertInteractor {
    probe_port: Arc<dyn ProbePort>,
    settings_port: Arc<dyn SettingsPort>,
    config: AppConfig,
}

impl ConvertInteractor {
    /// Create new convert interactor with injected ports
    pub fn new(
        probe_port: Arc<dyn ProbePort>,
        settings_port: Arc<dyn SettingsPort>,
        config: AppConfig,
    ) -> Self {
        Self {
            probe_port,
            settings_port,
            config,
        }
    }

    /// Pick the speed: explicit request, then configured default, then the
    /// last used speed.
    pub async fn resolve_speed(&self, requested: Option<u16>) -> SlowFastResult<SpeedFactor> {
        if let Some(percent) = requested.or(self.config.default_speed) {
            return SpeedFactor::from_percent(percent);
        }
        Ok(self.settings_port.load_settings().await.speed())
    }

    /// Validate the input, probe its duration and build the ffmpeg command.
    pub async fn plan(&self, request: ConvertRequest) -> SlowFastResult<ConvertPlan> {
        if !request.input.is_file() {
            return Err(SlowFastError::InputFileNotFound {
                path: request.input.display().to_string(),
            });
        }

        let input_duration = self
            .probe_port
            .probe_duration(&request.input)
            .await?
            .filter(|duration| *duration > 0.0)
            .ok_or_else(|| SlowFastError::DurationUnavailable {
                path: request.input.display().to_string(),
            })?;

        let output = request
            .output
            .clone()
            .unwrap_or_else(|| PathUtils::next_available_output(&request.input));

        let plan = ConvertPlan {
            change: SpeedChange {
                ffmpeg: self.config.ffmpeg_path.clone(),
                input: request.input,
                output,
                speed: request.speed,
            },
            input_duration,
            output_duration: request.speed.output_duration(input_duration),
        };

        info!(
            input = %plan.change.input.display(),
            output = %plan.output_path().display(),
            speed = %plan.change.speed,
            input_duration = plan.input_duration,
            output_duration = plan.output_duration,
            "conversion planned"
        );
        Ok(plan)
    }

    /// Launch the supervised ffmpeg run for `plan`.
    pub fn start(&self, plan: &ConvertPlan) -> RunHandle {
        ProcessSupervisor::new(plan.command(), plan.output_duration)
            .with_diagnostics(self.config.capture_diagnostics)
            .start()
    }

    /// Remember folder and speed once a run has ended, whatever the outcome.
    /// Storage problems are logged, never returned.
    pub async fn record_outcome(&self, plan: &ConvertPlan, outcome: &RunOutcome) {
        info!(%outcome, output = %plan.output_path().display(), "conversion ended");

        let settings = Settings {
            last_folder: PathUtils::containing_folder(&plan.change.input),
            last_speed: plan.change.speed.percent(),
        };
        if let Err(e) = self.settings_port.save_settings(&settings).await {
            warn!(error = %e, "could not save settings");
        }
    }
}
