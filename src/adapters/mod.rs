// Adapters - External system implementations

pub mod json_settings;
pub mod probe_ffmpeg;
pub mod toml_config;

// Re-export adapters
pub use json_settings::JsonSettingsAdapter;
pub use probe_ffmpeg::FfmpegProbeAdapter;
pub use toml_config::{AppConfig, TomlConfigAdapter};
