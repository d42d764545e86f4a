//! FFmpeg Runner Module
//!
//! Executes batch FFmpeg jobs: clip decode to PCM and dub-track muxing.
//! Each job is a single subprocess with captured output and a wall-clock
//! limit.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{FFmpegError, FFmpegInfo, FFmpegResult};
use crate::core::process::configure_tokio_command;
use crate::core::SampleRate;

/// Default per-job wall-clock limit
pub const DEFAULT_DECODE_TIMEOUT: Duration = Duration::from_secs(120);

/// How the aligned track is combined with a video's own audio
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum DubMode {
    /// Drop the original audio, keep only the dub
    Replace,
    /// Attenuate the original by a linear gain and sum the dub on top
    #[serde(rename_all = "camelCase")]
    Mix { background_volume: f64 },
}

impl DubMode {
    fn filter_complex(background_volume: f64) -> String {
        format!(
            "[0:a]volume={}[bg];[bg][1:a]amix=inputs=2:duration=longest:normalize=0[aout]",
            background_volume.clamp(0.0, 1.0)
        )
    }
}

/// FFmpeg Runner for executing batch transcode jobs
#[derive(Clone)]
pub struct FFmpegRunner {
    info: Arc<FFmpegInfo>,
    timeout: Duration,
}

impl FFmpegRunner {
    /// Create a new FFmpegRunner from a detected FFmpeg installation
    pub fn new(info: FFmpegInfo) -> Self {
        Self {
            info: Arc::new(info),
            timeout: DEFAULT_DECODE_TIMEOUT,
        }
    }

    /// Overrides the per-job wall-clock limit
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn info(&self) -> &FFmpegInfo {
        &self.info
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Decodes `input` to 16-bit PCM WAV at `output`.
    ///
    /// Channels are forced to `channels`; the rate is converted only when
    /// `target_rate` is given, otherwise the source rate is kept.
    pub async fn decode_to_pcm(
        &self,
        input: &Path,
        output: &Path,
        target_rate: Option<SampleRate>,
        channels: u16,
    ) -> FFmpegResult<()> {
        if !input.exists() {
            return Err(FFmpegError::InvalidInput(format!(
                "Input file does not exist: {}",
                input.display()
            )));
        }

        let args = decode_args(input, output, target_rate, channels);
        self.run(input, &args).await
    }

    /// Writes a copy of `video` whose audio is the aligned `track`
    pub async fn mux_dub(
        &self,
        video: &Path,
        track: &Path,
        output: &Path,
        mode: DubMode,
    ) -> FFmpegResult<()> {
        for input in [video, track] {
            if !input.exists() {
                return Err(FFmpegError::InvalidInput(format!(
                    "Input file does not exist: {}",
                    input.display()
                )));
            }
        }

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                FFmpegError::OutputError(format!("Failed to create output directory: {}", e))
            })?;
        }

        let args = mux_args(video, track, output, mode);
        self.run(video, &args).await
    }

    /// Spawns ffmpeg with `args`, enforcing the timeout.
    ///
    /// stdout and stderr are both kept for diagnostics on failure.
    async fn run(&self, input: &Path, args: &[String]) -> FFmpegResult<()> {
        let mut cmd = tokio::process::Command::new(&self.info.ffmpeg_path);
        configure_tokio_command(&mut cmd);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!(input = %input.display(), ?args, "Running ffmpeg");

        let child = cmd.spawn()?;
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(FFmpegError::Timeout {
                    input: input.to_path_buf(),
                    secs: self.timeout.as_secs(),
                })
            }
        };

        if !output.status.success() {
            let mut diagnostics = String::from_utf8_lossy(&output.stdout).into_owned();
            diagnostics.push_str(&String::from_utf8_lossy(&output.stderr));
            let diagnostics = match diagnostics.trim() {
                "" => format!("exited with {}", output.status),
                text => text.to_string(),
            };
            return Err(FFmpegError::ExecutionFailed {
                input: input.to_path_buf(),
                diagnostics,
            });
        }

        Ok(())
    }
}

fn lossy(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// `-y -hide_banner -loglevel error -i IN -vn -ac N [-ar R] -c:a pcm_s16le OUT`
fn decode_args(
    input: &Path,
    output: &Path,
    target_rate: Option<SampleRate>,
    channels: u16,
) -> Vec<String> {
    let mut args: Vec<String> = ["-y", "-hide_banner", "-loglevel", "error", "-i"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    args.push(lossy(input));
    args.extend(["-vn".to_string(), "-ac".to_string(), channels.to_string()]);
    if let Some(rate) = target_rate {
        args.extend(["-ar".to_string(), rate.to_string()]);
    }
    args.extend(["-c:a".to_string(), "pcm_s16le".to_string(), lossy(output)]);
    args
}

fn mux_args(video: &Path, track: &Path, output: &Path, mode: DubMode) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-hide_banner".into(),
        "-i".into(),
        lossy(video),
        "-i".into(),
        lossy(track),
    ];

    let audio_map = match mode {
        DubMode::Replace => "1:a:0".to_string(),
        DubMode::Mix { background_volume } => {
            args.extend([
                "-filter_complex".to_string(),
                DubMode::filter_complex(background_volume),
            ]);
            "[aout]".to_string()
        }
    };

    args.extend([
        "-map".to_string(),
        "0:v:0".to_string(),
        "-map".to_string(),
        audio_map,
        "-c:v".to_string(),
        "copy".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-shortest".to_string(),
        lossy(output),
    ]);
    args
}

/// Conventional name for the dubbed copy of `video`: `<stem>_dubbed.<ext>`
pub fn default_dub_output(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    let ext = video
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mp4".to_string());
    video.with_file_name(format!("{}_dubbed.{}", stem, ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(args: &[String], flag: &str) -> usize {
        args.iter().position(|a| a == flag).unwrap()
    }

    #[test]
    fn test_decode_args_with_rate() {
        let args = decode_args(Path::new("in.mp3"), Path::new("out.wav"), Some(48000), 1);
        assert_eq!(
            args,
            vec![
                "-y", "-hide_banner", "-loglevel", "error", "-i", "in.mp3", "-vn", "-ac", "1",
                "-ar", "48000", "-c:a", "pcm_s16le", "out.wav"
            ]
        );
    }

    #[test]
    fn test_decode_args_keep_source_rate() {
        let args = decode_args(Path::new("in.ogg"), Path::new("out.wav"), None, 2);
        assert!(!args.iter().any(|a| a == "-ar"));
        assert_eq!(args[position(&args, "-ac") + 1], "2");
        assert_eq!(args.last().unwrap(), "out.wav");
    }

    #[test]
    fn test_mux_args_replace() {
        let args = mux_args(
            Path::new("movie.mp4"),
            Path::new("dub.wav"),
            Path::new("movie_dubbed.mp4"),
            DubMode::Replace,
        );
        assert!(!args.iter().any(|a| a == "-filter_complex"));
        let maps: Vec<&String> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == "-map")
            .map(|(i, _)| &args[i + 1])
            .collect();
        assert_eq!(maps, vec!["0:v:0", "1:a:0"]);
        assert!(args.iter().any(|a| a == "-shortest"));
    }

    #[test]
    fn test_mux_args_mix_uses_background_volume() {
        let args = mux_args(
            Path::new("movie.mp4"),
            Path::new("dub.wav"),
            Path::new("out.mp4"),
            DubMode::Mix {
                background_volume: 0.25,
            },
        );
        let filter = &args[position(&args, "-filter_complex") + 1];
        assert_eq!(
            filter,
            "[0:a]volume=0.25[bg];[bg][1:a]amix=inputs=2:duration=longest:normalize=0[aout]"
        );
        assert!(args.iter().any(|a| a == "[aout]"));
    }

    #[test]
    fn test_mix_volume_is_clamped() {
        assert!(DubMode::filter_complex(3.0).starts_with("[0:a]volume=1[bg]"));
        assert!(DubMode::filter_complex(-1.0).starts_with("[0:a]volume=0[bg]"));
    }

    #[test]
    fn test_default_dub_output() {
        assert_eq!(
            default_dub_output(Path::new("/v/clip.mkv")),
            PathBuf::from("/v/clip_dubbed.mkv")
        );
    }

    #[tokio::test]
    async fn test_decode_missing_input_is_invalid() {
        let runner = FFmpegRunner::new(FFmpegInfo {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            version: "test".to_string(),
        });
        let result = runner
            .decode_to_pcm(Path::new("/nonexistent/a.mp3"), Path::new("/tmp/a.wav"), None, 1)
            .await;
        assert!(matches!(result, Err(FFmpegError::InvalidInput(_))));
    }
}
