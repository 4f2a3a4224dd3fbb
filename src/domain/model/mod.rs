// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{SlowFastError, SlowFastResult};

/// Playback speed as a percentage of the original (100 = unchanged)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedFactor {
    percent: u16,
}

impl SpeedFactor {
    /// Slowest supported speed (half speed)
    pub const MIN_PERCENT: u16 = 50;
    /// Fastest supported speed (triple speed)
    pub const MAX_PERCENT: u16 = 300;
    /// Speed used when nothing else is configured
    pub const DEFAULT_PERCENT: u16 = 100;

    /// Create a speed factor, rejecting values outside 50%..=300%
    pub fn from_percent(percent: u16) -> SlowFastResult<Self> {
        if !(Self::MIN_PERCENT..=Self::MAX_PERCENT).contains(&percent) {
            return Err(SlowFastError::InvalidSpeed {
                percent,
                min: Self::MIN_PERCENT,
                max: Self::MAX_PERCENT,
            });
        }
        Ok(Self { percent })
    }

    pub fn percent(&self) -> u16 {
        self.percent
    }

    /// Multiplier applied to playback rate (1.5 = 50% faster)
    pub fn factor(&self) -> f64 {
        f64::from(self.percent) / 100.0
    }

    /// Duration of the converted video for an input of `input_seconds`
    pub fn output_duration(&self, input_seconds: f64) -> f64 {
        input_seconds / self.factor()
    }

    /// `setpts` expression for the video filter
    pub fn video_filter(&self) -> String {
        format!("setpts={}*PTS", 1.0 / self.factor())
    }

    /// `atempo` chain for the audio filter.
    ///
    /// A single `atempo` stage only accepts 0.5..=2.0, so larger or smaller
    /// factors are split into a product of in-range stages.
    pub fn audio_filter(&self) -> String {
        let mut remaining = self.factor();
        let mut stages = Vec::new();
        while remaining > 2.0 {
            stages.push(2.0);
            remaining /= 2.0;
        }
        while remaining < 0.5 {
            stages.push(0.5);
            remaining /= 0.5;
        }
        stages.push(remaining);

        stages
            .iter()
            .map(|stage| format!("atempo={}", stage))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Default for SpeedFactor {
    fn default() -> Self {
        Self {
            percent: Self::DEFAULT_PERCENT,
        }
    }
}

impl fmt::Display for SpeedFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}x", self.factor())
    }
}

/// A speed change of one input file into one output file
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedChange {
    pub ffmpeg: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
    pub speed: SpeedFactor,
}

impl SpeedChange {
    /// Full ffmpeg command line, program first.
    ///
    /// Progress is requested as `key=value` lines on stdout (`-progress
    /// pipe:1`); diagnostics on stderr are limited to errors.
    pub fn to_command(&self) -> Vec<String> {
        vec![
            self.ffmpeg.to_string_lossy().to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            self.input.to_string_lossy().to_string(),
            "-filter:v".to_string(),
            self.speed.video_filter(),
            "-filter:a".to_string(),
            self.speed.audio_filter(),
            "-progress".to_string(),
            "pipe:1".to_string(),
            "-nostats".to_string(),
            "-y".to_string(),
            self.output.to_string_lossy().to_string(),
        ]
    }
}

/// Request to convert a video at a given speed
#[derive(Debug, Clone)]
pub struct ConvertRequest {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub speed: SpeedFactor,
}

impl ConvertRequest {
    pub fn new(input: impl Into<PathBuf>, speed: SpeedFactor) -> Self {
        Self {
            input: input.into(),
            output: None,
            speed,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }
}

/// Everything needed to start a supervised conversion
#[derive(Debug, Clone)]
pub struct ConvertPlan {
    pub change: SpeedChange,
    /// Duration of the input as reported by the probe
    pub input_duration: f64,
    /// Expected duration of the output, used for progress
    pub output_duration: f64,
}

impl ConvertPlan {
    pub fn command(&self) -> Vec<String> {
        self.change.to_command()
    }

    pub fn output_path(&self) -> &Path {
        &self.change.output
    }
}

/// User preferences persisted between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Folder of the last converted input
    pub last_folder: Option<String>,
    /// Last used speed, in percent
    pub last_speed: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            last_folder: None,
            last_speed: SpeedFactor::DEFAULT_PERCENT,
        }
    }
}

impl Settings {
    /// Last used speed, falling back to the default when the stored value is
    /// out of range
    pub fn speed(&self) -> SpeedFactor {
        SpeedFactor::from_percent(self.last_speed).unwrap_or_default()
    }
}
