//! Configuration initialization and hierarchy management

use anyhow::{Context, Result};

use crate::adapters::{AppConfig, TomlConfigAdapter};
use crate::cli::Cli;
use crate::utils::{LogFormat, LoggingConfig};

/// Default log filter when neither the CLI nor the config file sets one
const DEFAULT_LOG_LEVEL: &str = "warn";

/// Initialize configuration hierarchy following precedence: CLI > Env > File > Defaults.
///
/// Environment variables reach us through the CLI layer (`SLOWFAST_*`), so
/// they are applied together with the command-line overrides.
pub fn initialize_configuration(cli: &Cli) -> Result<AppConfig> {
    // Steps 1 and 2: defaults, then the config file if one exists
    let path = cli
        .config
        .clone()
        .unwrap_or_else(TomlConfigAdapter::default_path);
    let mut config = TomlConfigAdapter::new(&path)
        .load()
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

    // Steps 3 and 4: environment and CLI overrides
    apply_cli_configuration_overrides(&mut config, cli);

    Ok(config)
}

/// Apply CLI argument overrides to configuration
fn apply_cli_configuration_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(ffmpeg) = &cli.ffmpeg {
        config.ffmpeg_path = ffmpeg.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = Some(level.clone());
    }
}

/// Logging settings derived from the effective configuration
pub fn logging_config(cli: &Cli, config: &AppConfig) -> LoggingConfig {
    LoggingConfig {
        level: config
            .log_level
            .clone()
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        format: if cli.log_json {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        },
    }
}
