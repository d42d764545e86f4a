//! FFmpeg Detection Module
//!
//! Locates and validates the `ffmpeg` binary. An explicitly configured path
//! wins; otherwise common install directories are checked before falling
//! back to a `PATH` lookup.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::{FFmpegError, FFmpegResult};
use crate::core::process::configure_std_command;

/// Information about a detected FFmpeg installation
#[derive(Debug, Clone)]
pub struct FFmpegInfo {
    /// Path to ffmpeg binary
    pub ffmpeg_path: PathBuf,
    /// FFmpeg version string
    pub version: String,
}

#[cfg(target_os = "windows")]
const FFMPEG_BINARY: &str = "ffmpeg.exe";

#[cfg(not(target_os = "windows"))]
const FFMPEG_BINARY: &str = "ffmpeg";

/// Detects FFmpeg, preferring `explicit` when given.
///
/// An explicit path that does not run is an error; there is no silent
/// fallback to a different binary.
pub fn detect_ffmpeg(explicit: Option<&Path>) -> FFmpegResult<FFmpegInfo> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(FFmpegError::InvalidInput(format!(
                    "Configured ffmpeg does not exist: {}",
                    path.display()
                )));
            }
            let version = get_ffmpeg_version(path)?;
            Ok(FFmpegInfo {
                ffmpeg_path: path.to_path_buf(),
                version,
            })
        }
        None => detect_system_ffmpeg(),
    }
}

/// Detect FFmpeg from common install directories and the system PATH
pub fn detect_system_ffmpeg() -> FFmpegResult<FFmpegInfo> {
    let ffmpeg_path = which_ffmpeg()?;
    let version = get_ffmpeg_version(&ffmpeg_path)?;

    tracing::debug!(path = %ffmpeg_path.display(), %version, "Detected FFmpeg");
    Ok(FFmpegInfo {
        ffmpeg_path,
        version,
    })
}

/// Find ffmpeg binary in common locations, then in PATH
fn which_ffmpeg() -> FFmpegResult<PathBuf> {
    for dir in get_common_ffmpeg_paths() {
        let candidate = dir.join(FFMPEG_BINARY);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    #[cfg(target_os = "windows")]
    let lookup = "where";

    #[cfg(not(target_os = "windows"))]
    let lookup = "which";

    let mut cmd = Command::new(lookup);
    configure_std_command(&mut cmd);
    let output = cmd.arg("ffmpeg").output().map_err(|_| FFmpegError::NotFound)?;

    if output.status.success() {
        let path_str = String::from_utf8_lossy(&output.stdout);
        if let Some(first_line) = path_str.lines().map(str::trim).find(|l| !l.is_empty()) {
            return Ok(PathBuf::from(first_line));
        }
    }

    Err(FFmpegError::NotFound)
}

/// Get common FFmpeg installation paths for the current platform
fn get_common_ffmpeg_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    #[cfg(target_os = "windows")]
    {
        paths.push(PathBuf::from(r"C:\ffmpeg\bin"));
        paths.push(PathBuf::from(r"C:\Program Files\ffmpeg\bin"));
        paths.push(PathBuf::from(r"C:\Program Files (x86)\ffmpeg\bin"));

        // Chocolatey
        if let Ok(programdata) = std::env::var("ProgramData") {
            paths.push(PathBuf::from(programdata).join("chocolatey").join("bin"));
        }

        // Scoop
        if let Ok(userprofile) = std::env::var("USERPROFILE") {
            paths.push(PathBuf::from(userprofile).join("scoop").join("shims"));
        }
    }

    #[cfg(target_os = "macos")]
    {
        paths.push(PathBuf::from("/opt/homebrew/bin"));
        paths.push(PathBuf::from("/usr/local/bin"));
        paths.push(PathBuf::from("/opt/local/bin")); // MacPorts
    }

    #[cfg(target_os = "linux")]
    {
        paths.push(PathBuf::from("/usr/bin"));
        paths.push(PathBuf::from("/usr/local/bin"));
        paths.push(PathBuf::from("/snap/bin"));
    }

    paths
}

/// Runs `ffmpeg -version` and extracts the version token
fn get_ffmpeg_version(ffmpeg_path: &Path) -> FFmpegResult<String> {
    let mut cmd = Command::new(ffmpeg_path);
    configure_std_command(&mut cmd);
    let output = cmd.arg("-version").output()?;

    if !output.status.success() {
        return Err(FFmpegError::ExecutionFailed {
            input: ffmpeg_path.to_path_buf(),
            diagnostics: "binary is not functional (-version failed)".to_string(),
        });
    }

    parse_version_output(&String::from_utf8_lossy(&output.stdout))
}

/// Parses the first line of `ffmpeg -version`: "ffmpeg version X.Y.Z ..."
fn parse_version_output(output: &str) -> FFmpegResult<String> {
    let first_line = output
        .lines()
        .next()
        .filter(|line| !line.trim().is_empty())
        .ok_or_else(|| FFmpegError::ParseError("Could not parse FFmpeg version".to_string()))?;

    Ok(first_line
        .strip_prefix("ffmpeg version ")
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap_or(first_line)
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_paths_not_empty() {
        let paths = get_common_ffmpeg_paths();
        assert!(!paths.is_empty());
    }

    #[test]
    fn test_parse_version_output() {
        let out = "ffmpeg version 6.1.1-3ubuntu5 Copyright (c) 2000-2023\nbuilt with gcc";
        assert_eq!(parse_version_output(out).unwrap(), "6.1.1-3ubuntu5");

        let odd = "some other banner";
        assert_eq!(parse_version_output(odd).unwrap(), "some other banner");

        assert!(matches!(
            parse_version_output(""),
            Err(FFmpegError::ParseError(_))
        ));
    }

    #[test]
    fn test_explicit_missing_path_is_invalid_input() {
        let result = detect_ffmpeg(Some(Path::new("/nonexistent/bin/ffmpeg")));
        assert!(matches!(result, Err(FFmpegError::InvalidInput(_))));
    }

    #[test]
    fn test_detect_system_ffmpeg() {
        // Passes whether or not FFmpeg is installed on the machine
        match detect_system_ffmpeg() {
            Ok(info) => assert!(!info.version.is_empty()),
            Err(FFmpegError::NotFound) => {}
            Err(e) => panic!("Unexpected error: {}", e),
        }
    }
}
