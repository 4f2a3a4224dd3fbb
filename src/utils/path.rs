//! Output path selection

use std::path::{Path, PathBuf};

/// Marker inserted between the input stem and the sequence number.
const OUTPUT_MARKER: &str = "ffmpeg";

/// Path utilities for picking output files
pub struct PathUtils;

impl PathUtils {
    /// Pick `<stem>-ffmpeg-<n>.<ext>` next to `input` with the smallest
    /// `n >= 1` that does not exist yet.
    pub fn next_available_output(input: &Path) -> PathBuf {
        let parent = input.parent().unwrap_or_else(|| Path::new(""));
        let stem = input
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());
        let extension = input
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        (1u32..)
            .map(|n| parent.join(format!("{}-{}-{}{}", stem, OUTPUT_MARKER, n, extension)))
            .find(|candidate| !candidate.exists())
            .unwrap_or_else(|| parent.join(format!("{}-{}{}", stem, OUTPUT_MARKER, extension)))
    }

    /// Directory that contains `path`, if it has one
    pub fn containing_folder(path: &Path) -> Option<String> {
        path.parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(|parent| parent.to_string_lossy().to_string())
    }
}
