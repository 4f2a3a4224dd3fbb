//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

/// Arguments for the convert command
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input video file path
    pub input: PathBuf,

    /// Speed in percent of the original (50-300; default: last used)
    #[arg(short, long)]
    pub speed: Option<u16>,

    /// Output file path (default: <input>-ffmpeg-<n>.<ext>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report progress as JSON lines on stdout
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the probe command
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Input media file path
    pub input: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Expected output duration in seconds (0 disables percentages)
    #[arg(short, long, default_value_t = 0.0)]
    pub duration: f64,

    /// Report progress as JSON lines on stdout
    #[arg(long)]
    pub json: bool,

    /// Command and arguments, after `--`
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}
