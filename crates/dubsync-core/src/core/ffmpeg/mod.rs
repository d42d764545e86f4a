//! FFmpeg Integration Module
//!
//! Everything that shells out to an external `ffmpeg` binary:
//! - Locating the binary (explicit path, common install dirs, `PATH`)
//! - Decoding arbitrary clips to 16-bit PCM WAV at a requested rate
//! - Muxing an aligned dub track into a video
//!
//! The [`ClipDecoder`] trait is the seam the aligner depends on, so the
//! pipeline itself never needs ffmpeg when clips are already PCM.

mod decoder;
mod detection;
mod runner;

pub use decoder::{ClipDecoder, DecodedClip, FfmpegDecoder, PcmPassthroughDecoder};
pub use detection::*;
pub use runner::{default_dub_output, DubMode, FFmpegRunner, DEFAULT_DECODE_TIMEOUT};

use std::path::PathBuf;

use crate::core::CoreError;

/// FFmpeg-related error types
#[derive(Debug, thiserror::Error)]
pub enum FFmpegError {
    #[error("FFmpeg not found. Install FFmpeg or pass an explicit ffmpeg path.")]
    NotFound,

    #[error("FFmpeg failed on {input}: {diagnostics}")]
    ExecutionFailed { input: PathBuf, diagnostics: String },

    #[error("Invalid input file: {0}")]
    InvalidInput(String),

    #[error("Output path error: {0}")]
    OutputError(String),

    #[error("Process error: {0}")]
    ProcessError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Timeout: ffmpeg took longer than {secs}s on {input}")]
    Timeout { input: PathBuf, secs: u64 },
}

pub type FFmpegResult<T> = Result<T, FFmpegError>;

impl From<FFmpegError> for CoreError {
    fn from(err: FFmpegError) -> Self {
        match err {
            FFmpegError::NotFound => CoreError::NotFound(err.to_string()),
            FFmpegError::ExecutionFailed { input, diagnostics } => CoreError::ExternalTool {
                tool: "ffmpeg".to_string(),
                path: input,
                diagnostics,
            },
            FFmpegError::Timeout { .. } => CoreError::Timeout(err.to_string()),
            FFmpegError::InvalidInput(msg) | FFmpegError::OutputError(msg) => {
                CoreError::ValidationError(msg)
            }
            FFmpegError::ProcessError(e) => CoreError::IoError(e),
            FFmpegError::ParseError(msg) => CoreError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffmpeg_error_display() {
        let err = FFmpegError::NotFound;
        assert!(err.to_string().contains("FFmpeg not found"));

        let err = FFmpegError::ExecutionFailed {
            input: PathBuf::from("line_3.mp3"),
            diagnostics: "Invalid data found when processing input".to_string(),
        };
        assert!(err.to_string().contains("line_3.mp3"));
        assert!(err.to_string().contains("Invalid data"));
    }

    #[test]
    fn test_execution_failure_maps_to_external_tool() {
        let err: CoreError = FFmpegError::ExecutionFailed {
            input: PathBuf::from("7.ogg"),
            diagnostics: "moov atom not found".to_string(),
        }
        .into();

        match err {
            CoreError::ExternalTool {
                tool,
                path,
                diagnostics,
            } => {
                assert_eq!(tool, "ffmpeg");
                assert_eq!(path, PathBuf::from("7.ogg"));
                assert!(diagnostics.contains("moov"));
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn test_timeout_maps_to_timeout() {
        let err: CoreError = FFmpegError::Timeout {
            input: PathBuf::from("slow.flac"),
            secs: 5,
        }
        .into();
        assert!(matches!(err, CoreError::Timeout(ref msg) if msg.contains("slow.flac")));
    }
}
