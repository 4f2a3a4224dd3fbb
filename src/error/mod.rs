//! Error handling module for SlowFast
//!
//! Run outcomes are not errors: a supervised ffmpeg run always ends in a
//! [`RunOutcome`](crate::engine::RunOutcome). The errors here cover the shell
//! around a run (probing, configuration, settings, argument validation).

use thiserror::Error;

/// Main error type for SlowFast operations
#[derive(Error, Debug)]
pub enum SlowFastError {
    /// Input file not found or inaccessible
    #[error("Input file not found: {path}")]
    InputFileNotFound { path: String },

    /// Speed outside the supported range
    #[error("Invalid speed: {percent}%. Expected a value between {min}% and {max}%")]
    InvalidSpeed { percent: u16, min: u16, max: u16 },

    /// The probe ran but reported no usable duration
    #[error("Could not read video duration: {path}")]
    DurationUnavailable { path: String },

    /// Media probe error
    #[error("Failed to probe media file: {message}")]
    ProbeError { message: String },

    /// Configuration file error
    #[error("Invalid configuration: {message}")]
    ConfigError { message: String },

    /// Settings document error
    #[error("Settings error: {message}")]
    SettingsError { message: String },
}

/// Result type alias for SlowFast operations
pub type SlowFastResult<T> = std::result::Result<T, SlowFastError>;
