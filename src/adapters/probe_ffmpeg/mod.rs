//! FFmpeg probe adapter
//!
//! Reads a media file's duration by running `ffmpeg -i <file>` without an
//! output and matching the `Duration:` field of its diagnostic banner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use crate::error::{SlowFastError, SlowFastResult};
use crate::ports::ProbePort;

/// FFmpeg-based probe adapter
pub struct FfmpegProbeAdapter {
    ffmpeg: PathBuf,
}

impl FfmpegProbeAdapter {
    /// Create new probe adapter using the given ffmpeg executable
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }
}

fn duration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"Duration:\s*(\d+):(\d+):(\d+\.\d+)").expect("duration pattern is valid")
    })
}

/// Extract the duration in seconds from ffmpeg's `Duration: H:MM:SS.ff` line.
///
/// Returns `None` when no such field is present (including `Duration: N/A`).
pub fn parse_duration_banner(text: &str) -> Option<f64> {
    let captures = duration_pattern().captures(text)?;
    let hours: f64 = captures[1].parse().ok()?;
    let minutes: f64 = captures[2].parse().ok()?;
    let seconds: f64 = captures[3].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

#[async_trait]
impl ProbePort for FfmpegProbeAdapter {
    async fn probe_duration(&self, file_path: &Path) -> SlowFastResult<Option<f64>> {
        debug!(ffmpeg = %self.ffmpeg.display(), input = %file_path.display(), "probing duration");

        // Without an output file ffmpeg exits nonzero; only the banner matters.
        let output = Command::new(&self.ffmpeg)
            .arg("-hide_banner")
            .arg("-i")
            .arg(file_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| SlowFastError::ProbeError {
                message: format!("failed to run {}: {}", self.ffmpeg.display(), e),
            })?;

        let banner = String::from_utf8_lossy(&output.stderr);
        let duration = parse_duration_banner(&banner);
        debug!(?duration, "probe finished");
        Ok(duration)
    }
}
