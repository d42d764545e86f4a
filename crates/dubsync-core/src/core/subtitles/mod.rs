//! Subtitle Module
//!
//! Cue timing input for the aligner:
//! - `models.rs` - [`SubtitleInterval`], the validated time range of one cue
//! - `parser.rs` - SRT block parsing with strict or permissive index recovery
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use dubsync_core::core::subtitles::{parse_srt, ParseMode};
//!
//! let content = std::fs::read_to_string("episode.srt")?;
//! let cues = parse_srt(&content, ParseMode::Permissive)?;
//! ```

mod models;
mod parser;

pub use models::SubtitleInterval;
pub use parser::{format_srt_timestamp, parse_srt, ParseError, ParseMode};

use std::path::Path;

use crate::core::{CoreError, CoreResult};

/// Reads and parses an SRT file, attaching the path to any parse failure.
///
/// A file with no usable cues is `NotFound`.
pub fn load_srt(path: &Path, mode: ParseMode) -> CoreResult<Vec<SubtitleInterval>> {
    let content = std::fs::read_to_string(path).map_err(|e| CoreError::file_io(path, e))?;
    let intervals = parse_srt(&content, mode).map_err(|source| CoreError::SubtitleParse {
        path: path.to_path_buf(),
        source,
    })?;
    if intervals.is_empty() {
        return Err(CoreError::NotFound(format!(
            "Subtitle file {} has no entries",
            path.display()
        )));
    }
    Ok(intervals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_srt_attaches_path_to_parse_errors() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.srt");
        std::fs::write(&path, "1\n00:00:01,000 00:00:02,000\nHi\n").unwrap();

        let err = load_srt(&path, ParseMode::Strict).unwrap_err();
        assert!(matches!(err, CoreError::SubtitleParse { .. }));
        assert!(err.to_string().contains("bad.srt"));
    }

    #[test]
    fn test_load_srt_empty_file_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.srt");
        std::fs::write(&path, "\n\n").unwrap();

        assert!(matches!(
            load_srt(&path, ParseMode::Permissive),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_load_srt_missing_file_is_io() {
        let result = load_srt(Path::new("/nonexistent/ep1.srt"), ParseMode::Permissive);
        assert!(matches!(result, Err(CoreError::FileIo { .. })));
    }
}
