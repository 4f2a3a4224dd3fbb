//! SlowFast Video
//!
//! Speeds up or slows down a video by running ffmpeg under supervision:
//! live percentage progress, Ctrl-C cancellation, and a single clear outcome
//! per run.
//!
//! # Usage
//!
//! ```bash
//! slowfast convert holiday.mov --speed 150
//! slowfast probe holiday.mov
//! slowfast run --duration 90 --json -- ffmpeg -i in.mov -progress pipe:1 out.mov
//! ```

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use slowfast_video::cli::{commands, Cli};
use slowfast_video::config_initialization::{initialize_configuration, logging_config};
use slowfast_video::utils::init_logging;

/// Main entry point for the SlowFast CLI application
#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Resolve configuration before logging so the config can set the level
    let config = initialize_configuration(&cli)?;
    init_logging(&logging_config(&cli, &config));

    info!(ffmpeg = %config.ffmpeg_path.display(), "Starting SlowFast Video");

    // Execute the requested command
    let code = commands::execute(cli, config).await?;

    info!("SlowFast finished");
    Ok(code)
}
