//! Time parsing and formatting utilities

/// Parser for ffmpeg clock strings (`H:MM:SS.ffffff`)
pub struct TimeParser;

impl TimeParser {
    /// Parse an `H:MM:SS[.fff]` clock into seconds.
    ///
    /// Returns `None` for anything that is not exactly three numeric fields,
    /// including ffmpeg's `N/A` placeholder. Non-finite fields are rejected.
    pub fn parse_clock(time_str: &str) -> Option<f64> {
        let mut parts = time_str.trim().split(':');
        let hours = Self::parse_field(parts.next()?)?;
        let minutes = Self::parse_field(parts.next()?)?;
        let seconds = Self::parse_field(parts.next()?)?;
        if parts.next().is_some() {
            return None;
        }

        Some(hours * 3600.0 + minutes * 60.0 + seconds)
    }

    fn parse_field(field: &str) -> Option<f64> {
        field.parse::<f64>().ok().filter(|value| value.is_finite())
    }

    /// Format seconds to HH:MM:SS.ms string
    pub fn format_time(seconds: f64) -> String {
        let seconds = seconds.max(0.0);
        let hours = (seconds / 3600.0) as u32;
        let minutes = ((seconds % 3600.0) / 60.0) as u32;
        let secs = (seconds % 60.0) as u32;
        let milliseconds = ((seconds % 1.0) * 1000.0) as u32;

        format!(
            "{:02}:{:02}:{:02}.{:03}",
            hours, minutes, secs, milliseconds
        )
    }
}
