//! dubsync Error Definitions
//!
//! Defines error types used throughout the project.

use std::path::PathBuf;

use thiserror::Error;

use super::subtitles::ParseError;
use super::{CueIndex, SampleRate};

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Subtitle Errors
    // =========================================================================
    #[error("Subtitle parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Failed to parse subtitle file {path}: {source}")]
    SubtitleParse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    // =========================================================================
    // Audio Errors
    // =========================================================================
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Channel layout mismatch: expected {expected} channels, found {found}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("Invalid target duration: {0} seconds (must be positive)")]
    InvalidDuration(f64),

    #[error("Unexpected sample rate after decode for {path}: {found} Hz != {expected} Hz")]
    SampleRateMismatch {
        path: PathBuf,
        expected: SampleRate,
        found: SampleRate,
    },

    #[error("Subtitle and clip counts must match: {cues} cues, {clips} clips")]
    CountMismatch { cues: usize, clips: usize },

    // =========================================================================
    // External Tool Errors
    // =========================================================================
    #[error("{tool} failed for {path}: {diagnostics}")]
    ExternalTool {
        tool: String,
        path: PathBuf,
        diagnostics: String,
    },

    #[error("Timeout: {0}")]
    Timeout(String),

    // =========================================================================
    // Lookup Errors
    // =========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Clip for cue {index} could not be processed: {source}")]
    Cue {
        index: CueIndex,
        #[source]
        source: Box<CoreError>,
    },

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error on {path}: {source}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Wraps an I/O error with the path it happened on.
    pub fn file_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileIo {
            path: path.into(),
            source,
        }
    }

    /// Attaches the cue index a failure belongs to.
    pub fn for_cue(self, index: CueIndex) -> Self {
        match self {
            already @ Self::Cue { .. } => already,
            other => Self::Cue {
                index,
                source: Box::new(other),
            },
        }
    }

    /// Maps a WAV container error onto the matching core kind.
    pub fn from_wav(path: &std::path::Path, err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(source) => Self::file_io(path, source),
            hound::Error::Unsupported => Self::UnsupportedFormat(format!(
                "{}: not an uncompressed PCM container",
                path.display()
            )),
            hound::Error::FormatError(reason) => {
                Self::UnsupportedFormat(format!("{}: {}", path.display(), reason))
            }
            other => Self::Internal(format!("{}: {}", path.display(), other)),
        }
    }
}
