//! CLI module for SlowFast
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

/// SlowFast Video
///
/// Speed up or slow down a video with ffmpeg, with live progress and
/// Ctrl-C cancellation.
#[derive(Parser, Debug)]
#[command(name = "slowfast")]
#[command(about = "SlowFast Video - change video playback speed with ffmpeg")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (RUST_LOG takes precedence)
    #[arg(long, global = true, env = "SLOWFAST_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Configuration file (default: platform config directory)
    #[arg(long, global = true, env = "SLOWFAST_CONFIG")]
    pub config: Option<PathBuf>,

    /// ffmpeg executable
    #[arg(long, global = true, env = "SLOWFAST_FFMPEG")]
    pub ffmpeg: Option<PathBuf>,

    /// Settings document (default: platform config directory)
    #[arg(long, global = true, env = "SLOWFAST_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a video to a different playback speed
    Convert(args::ConvertArgs),
    /// Print the duration of a media file
    Probe(args::ProbeArgs),
    /// Supervise an arbitrary ffmpeg command line
    Run(args::RunArgs),
    /// Print the effective configuration
    Config,
}
