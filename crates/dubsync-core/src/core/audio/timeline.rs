//! Timeline Accumulator
//!
//! Owns the full-length mix buffer for a run. Clips are added (never
//! written over) at their start frame in a 32-bit accumulator, so any number
//! of overlapping cues can be summed; the one conversion back to 16-bit
//! happens in [`TimelineAccumulator::finalize`].

use serde::Serialize;

use super::pcm::{decode_sample, encode_sample};
use super::AudioBuffer;
use crate::core::subtitles::SubtitleInterval;
use crate::core::{ms_to_frames, ms_to_frames_ceil, CoreError, CoreResult, SampleRate, TimeMs, TimeSec};

/// Where a clip landed on the timeline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Placement {
    /// Every frame was added
    Placed { start_frame: usize, frames: usize },
    /// The tail ran past the timeline end and was cut
    Truncated {
        start_frame: usize,
        frames: usize,
        dropped: usize,
    },
    /// Start was at or beyond the end; nothing was added
    OutOfRange { start_frame: usize },
}

impl Placement {
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Self::OutOfRange { .. })
    }
}

#[derive(Debug, Clone)]
pub struct TimelineAccumulator {
    sample_rate: SampleRate,
    channels: usize,
    frames: usize,
    /// Interleaved sums in 16-bit sample units
    acc: Vec<i32>,
}

impl TimelineAccumulator {
    /// Allocates a zero-filled timeline of `frames` frames
    pub fn new(sample_rate: SampleRate, channels: usize, frames: usize) -> CoreResult<Self> {
        if sample_rate == 0 {
            return Err(CoreError::ValidationError(
                "Sample rate must be positive".to_string(),
            ));
        }
        if channels == 0 {
            return Err(CoreError::ShapeMismatch {
                expected: 1,
                found: 0,
            });
        }
        Ok(Self {
            sample_rate,
            channels,
            frames,
            acc: vec![0; frames * channels],
        })
    }

    /// Sizes the timeline to cover the latest cue end, `ceil(rate * max_end)`.
    pub fn for_intervals<'a, I>(
        sample_rate: SampleRate,
        channels: usize,
        intervals: I,
    ) -> CoreResult<Self>
    where
        I: IntoIterator<Item = &'a SubtitleInterval>,
    {
        let max_end_ms = intervals
            .into_iter()
            .map(|interval| interval.end_ms())
            .max()
            .ok_or_else(|| CoreError::NotFound("Subtitle has no entries".to_string()))?;
        let frames = ms_to_frames_ceil(max_end_ms, sample_rate).max(1);
        Self::new(sample_rate, channels, frames)
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frame_count(&self) -> usize {
        self.frames
    }

    pub fn duration_sec(&self) -> TimeSec {
        self.frames as TimeSec / self.sample_rate as TimeSec
    }

    /// Start frame `round(rate * start)`, half up, computed in integer ms
    pub fn start_frame_at(&self, start_ms: TimeMs) -> i64 {
        ms_to_frames(start_ms, self.sample_rate) as i64
    }

    /// Adds `clip` into the timeline starting at `start_frame`.
    ///
    /// Negative starts clamp to zero. A start at or past the end drops the
    /// whole clip; a tail past the end is cut.
    pub fn place(&mut self, clip: &AudioBuffer, start_frame: i64) -> CoreResult<Placement> {
        if clip.channels() != self.channels {
            return Err(CoreError::ShapeMismatch {
                expected: self.channels,
                found: clip.channels(),
            });
        }
        if clip.sample_rate() != self.sample_rate {
            return Err(CoreError::ValidationError(format!(
                "Clip sample rate {} Hz does not match timeline rate {} Hz",
                clip.sample_rate(),
                self.sample_rate
            )));
        }

        let start = start_frame.max(0) as usize;
        if start >= self.frames {
            return Ok(Placement::OutOfRange { start_frame: start });
        }

        let available = self.frames - start;
        let frames = clip.frame_count().min(available);
        let dropped = clip.frame_count() - frames;

        let offset = start * self.channels;
        let span = frames * self.channels;
        for (slot, &sample) in self.acc[offset..offset + span]
            .iter_mut()
            .zip(&clip.samples()[..span])
        {
            *slot = slot.saturating_add(encode_sample(sample) as i32);
        }

        Ok(if dropped > 0 {
            Placement::Truncated {
                start_frame: start,
                frames,
                dropped,
            }
        } else {
            Placement::Placed {
                start_frame: start,
                frames,
            }
        })
    }

    /// Like [`place`](Self::place) with the start given in milliseconds
    pub fn place_at(&mut self, clip: &AudioBuffer, start_ms: TimeMs) -> CoreResult<Placement> {
        let start = self.start_frame_at(start_ms);
        self.place(clip, start)
    }

    /// Saturates every sum into `[-32768, 32767]`. Never wraps.
    pub fn finalize(self) -> Vec<i16> {
        self.acc
            .into_iter()
            .map(|v| v.clamp(i16::MIN as i32, i16::MAX as i32) as i16)
            .collect()
    }

    /// Finalizes and converts back to a normalized buffer
    pub fn into_audio_buffer(self) -> AudioBuffer {
        let (sample_rate, channels) = (self.sample_rate, self.channels);
        let samples = self.finalize().into_iter().map(decode_sample).collect();
        AudioBuffer::from_parts(sample_rate, channels, samples)
    }
}

// =============================================================================
// Tests
// =============================================================================
