//! Clip decoding capability
//!
//! The aligner asks a [`ClipDecoder`] for a 16-bit PCM WAV version of each
//! clip. Conversions land in scoped temp files that are removed when the
//! [`DecodedClip`] handle drops, whichever way the run ends.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::TempPath;

use super::FFmpegRunner;
use crate::core::audio::pcm::probe_pcm;
use crate::core::{CoreError, CoreResult, SampleRate};

/// A decoded clip on disk
#[derive(Debug)]
pub struct DecodedClip {
    path: PathBuf,
    temp: Option<TempPath>,
}

impl DecodedClip {
    /// The source file already was usable PCM
    pub fn original(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            temp: None,
        }
    }

    /// A conversion result, deleted on drop
    pub fn temporary(temp: TempPath) -> Self {
        Self {
            path: temp.to_path_buf(),
            temp: Some(temp),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.temp.is_some()
    }
}

/// Turns an arbitrary audio file into readable 16-bit PCM WAV
#[async_trait]
pub trait ClipDecoder: Send + Sync {
    /// Decodes `input` with `channels` channels, converting to `target_rate`
    /// when one is given and otherwise keeping the source rate.
    ///
    /// [`PcmPassthroughDecoder`] is the one relaxation: it never converts, so
    /// callers must still check the rate and downmix on read.
    async fn decode(
        &self,
        input: &Path,
        target_rate: Option<SampleRate>,
        channels: u16,
    ) -> CoreResult<DecodedClip>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

fn has_wav_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"))
}

/// Decodes through an external ffmpeg binary
#[derive(Clone)]
pub struct FfmpegDecoder {
    runner: FFmpegRunner,
}

impl FfmpegDecoder {
    pub fn new(runner: FFmpegRunner) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &FFmpegRunner {
        &self.runner
    }
}

#[async_trait]
impl ClipDecoder for FfmpegDecoder {
    async fn decode(
        &self,
        input: &Path,
        target_rate: Option<SampleRate>,
        channels: u16,
    ) -> CoreResult<DecodedClip> {
        // Readable 16-bit WAV already in the requested layout needs no transcode
        if has_wav_extension(input) {
            if let Ok(info) = probe_pcm(input) {
                if info.channels == channels
                    && target_rate.is_none_or(|rate| rate == info.sample_rate)
                {
                    return Ok(DecodedClip::original(input));
                }
            }
        }

        let temp = tempfile::Builder::new()
            .prefix("dub_clip_")
            .suffix(".wav")
            .tempfile()?
            .into_temp_path();

        self.runner
            .decode_to_pcm(input, &temp, target_rate, channels)
            .await?;

        tracing::debug!(
            input = %input.display(),
            output = %temp.display(),
            ?target_rate,
            "Decoded clip"
        );
        Ok(DecodedClip::temporary(temp))
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

/// Accepts only 16-bit PCM `.wav` clips and hands them back untouched.
///
/// Rate checks are left to the caller, which knows the target.
#[derive(Debug, Clone, Copy, Default)]
pub struct PcmPassthroughDecoder;

#[async_trait]
impl ClipDecoder for PcmPassthroughDecoder {
    async fn decode(
        &self,
        input: &Path,
        _target_rate: Option<SampleRate>,
        _channels: u16,
    ) -> CoreResult<DecodedClip> {
        if !has_wav_extension(input) {
            return Err(CoreError::UnsupportedFormat(format!(
                "{}: only PCM WAV clips can be read without FFmpeg",
                input.display()
            )));
        }
        probe_pcm(input)?;
        Ok(DecodedClip::original(input))
    }

    fn name(&self) -> &'static str {
        "pcm-passthrough"
    }
}
