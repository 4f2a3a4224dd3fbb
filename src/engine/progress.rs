//! Progress line parsing and run observers for UI integration

use indicatif::{ProgressBar, ProgressStyle};

use crate::utils::time::TimeParser;

/// Key of the ffmpeg `-progress` line that carries the output timestamp.
pub const PROGRESS_KEY: &str = "out_time";

/// Turn one ffmpeg `-progress` line into a completion percentage.
///
/// Only `out_time=<H>:<MM>:<SS.ffffff>` lines produce a value. Any other key,
/// an unparseable timestamp, or a non-positive `total_duration` yields `None`.
/// The result is `floor(elapsed / total * 100)` clamped to `0..=100`.
pub fn parse_progress_line(line: &str, total_duration: f64) -> Option<u8> {
    // `!(x > 0)` also rejects NaN.
    if !(total_duration > 0.0) {
        return None;
    }

    let (key, value) = line.trim().split_once('=')?;
    if key != PROGRESS_KEY {
        return None;
    }

    let elapsed = TimeParser::parse_clock(value.trim())?;
    Some(percentage(elapsed, total_duration))
}

fn percentage(elapsed: f64, total_duration: f64) -> u8 {
    (elapsed / total_duration * 100.0).floor().clamp(0.0, 100.0) as u8
}

/// Receives the notifications of a single supervised run.
///
/// `on_progress` may fire any number of times; exactly one of `on_complete`,
/// `on_error` or `on_cancel` fires last.
pub trait RunObserver: Send + Sync {
    /// Called once before the first notification
    fn on_start(&self, _command: &[String], _total_duration: f64) {}

    /// Called for every parsed progress line
    fn on_progress(&self, percent: u8);

    /// Called when the process exited with status zero
    fn on_complete(&self);

    /// Called when the run failed
    fn on_error(&self, message: &str);

    /// Called when the run was canceled
    fn on_cancel(&self);
}

/// Console observer for CLI usage, drawing a progress bar on stderr
pub struct ConsoleObserver {
    bar: ProgressBar,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template("{spinner} [{elapsed_precise}] [{bar:40}] {pos:>3}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        Self { bar }
    }
}

impl Default for ConsoleObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl RunObserver for ConsoleObserver {
    fn on_start(&self, _command: &[String], total_duration: f64) {
        if total_duration <= 0.0 {
            self.bar.set_message("duration unknown");
        }
    }

    fn on_progress(&self, percent: u8) {
        self.bar.set_position(u64::from(percent));
    }

    fn on_complete(&self) {
        self.bar.finish_and_clear();
        println!("Conversion completed!");
    }

    fn on_error(&self, message: &str) {
        self.bar.abandon();
        println!("Error: {}", message);
    }

    fn on_cancel(&self) {
        self.bar.abandon();
        println!("Conversion canceled!");
    }
}

/// JSON observer for structured output, one event per line on stdout
pub struct JsonObserver;

impl JsonObserver {
    fn emit(event: serde_json::Value) {
        println!("{}", event);
    }
}

impl RunObserver for JsonObserver {
    fn on_start(&self, command: &[String], total_duration: f64) {
        Self::emit(serde_json::json!({
            "event": "start",
            "command": command,
            "total_duration": total_duration,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn on_progress(&self, percent: u8) {
        Self::emit(serde_json::json!({
            "event": "progress",
            "percent": percent,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn on_complete(&self) {
        Self::emit(serde_json::json!({
            "event": "complete",
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn on_error(&self, message: &str) {
        Self::emit(serde_json::json!({
            "event": "error",
            "error": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn on_cancel(&self) {
        Self::emit(serde_json::json!({
            "event": "cancel",
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_way() {
        assert_eq!(parse_progress_line("out_time=00:00:05.000000", 10.0), Some(50));
    }

    #[test]
    fn test_percentage_is_floored() {
        assert_eq!(parse_progress_line("out_time=00:00:09.999999", 10.0), Some(99));
        assert_eq!(parse_progress_line("out_time=00:00:01.000000", 3.0), Some(33));
    }

    #[test]
    fn test_overshoot_is_clamped() {
        assert_eq!(parse_progress_line("out_time=00:00:10.040000", 10.0), Some(100));
        assert_eq!(parse_progress_line("out_time=01:00:00.000000", 10.0), Some(100));
    }

    #[test]
    fn test_negative_timestamp_is_clamped() {
        assert_eq!(parse_progress_line("out_time=-00:00:00.023000", 10.0), Some(0));
        assert_eq!(parse_progress_line("out_time=00:00:-01.000000", 10.0), Some(0));
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        assert_eq!(parse_progress_line("  out_time= 00:00:02.500000 \n", 10.0), Some(25));
    }

    #[test]
    fn test_non_positive_duration_yields_nothing() {
        for total in [0.0, -1.0, f64::NAN] {
            assert_eq!(parse_progress_line("out_time=00:00:05.000000", total), None);
        }
    }

    #[test]
    fn test_other_keys_yield_nothing() {
        for line in [
            "out_time_ms=5000000",
            "out_time_us=5000000",
            "OUT_TIME=00:00:05.000000",
            "frame=120",
            "progress=continue",
            "progress=end",
            "",
            "out_time",
        ] {
            assert_eq!(parse_progress_line(line, 10.0), None, "line {:?}", line);
        }
    }

    #[test]
    fn test_malformed_timestamp_yields_nothing() {
        for line in ["out_time=N/A", "out_time=", "out_time=5", "out_time=00:xx:05.0"] {
            assert_eq!(parse_progress_line(line, 10.0), None, "line {:?}", line);
        }
    }

    #[test]
    fn test_matches_floor_formula_across_range() {
        let total = 37.0;
        for tenths in 0..500u32 {
            let elapsed = f64::from(tenths) / 10.0;
            let line = format!("out_time={}", TimeParser::format_time(elapsed));
            let parsed = TimeParser::parse_clock(&TimeParser::format_time(elapsed)).unwrap();
            let expected = (parsed / total * 100.0).floor().clamp(0.0, 100.0) as u8;
            assert_eq!(parse_progress_line(&line, total), Some(expected));
        }
    }
}
