//! Normalized audio buffer
//!
//! Interleaved `f32` frames in `[-1.0, 1.0]` with an explicit channel count.
//! Mono and multi-channel clips share this one type; the layout is never
//! inferred from the shape of the data.

use crate::core::{CoreError, CoreResult, SampleRate, TimeSec};

#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    sample_rate: SampleRate,
    channels: usize,
    samples: Vec<f32>,
}

impl AudioBuffer {
    /// Wraps interleaved samples. `samples.len()` must be a multiple of `channels`.
    pub fn new(sample_rate: SampleRate, channels: usize, samples: Vec<f32>) -> CoreResult<Self> {
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
        if samples.len() % channels != 0 {
            return Err(CoreError::ValidationError(format!(
                "{} samples do not divide into {}-channel frames",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            sample_rate,
            channels,
            samples,
        })
    }

    /// Single-channel buffer from a flat sample sequence
    pub fn mono(sample_rate: SampleRate, samples: Vec<f32>) -> CoreResult<Self> {
        Self::new(sample_rate, 1, samples)
    }

    /// Builds a buffer from per-frame sample groups.
    ///
    /// Every frame must have the same number of values as the first one.
    /// An empty frame list yields an empty mono buffer.
    pub fn from_frames(sample_rate: SampleRate, frames: &[Vec<f32>]) -> CoreResult<Self> {
        let channels = frames.first().map_or(1, Vec::len);
        let mut samples = Vec::with_capacity(frames.len() * channels);
        for frame in frames {
            if frame.len() != channels {
                return Err(CoreError::ShapeMismatch {
                    expected: channels,
                    found: frame.len(),
                });
            }
            samples.extend_from_slice(frame);
        }
        Self::new(sample_rate, channels, samples)
    }

    /// Unchecked constructor for callers that already hold valid parts
    pub(crate) fn from_parts(sample_rate: SampleRate, channels: usize, samples: Vec<f32>) -> Self {
        debug_assert!(sample_rate > 0 && channels > 0);
        debug_assert_eq!(samples.len() % channels, 0);
        Self {
            sample_rate,
            channels,
            samples,
        }
    }

    /// Same rate and layout as `self`, new interleaved samples
    pub(crate) fn with_samples(&self, samples: Vec<f32>) -> Self {
        Self::from_parts(self.sample_rate, self.channels, samples)
    }

    /// Zero-filled buffer
    pub fn silent(sample_rate: SampleRate, channels: usize, frames: usize) -> CoreResult<Self> {
        Self::new(sample_rate, channels, vec![0.0; frames * channels])
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of frames (samples per channel)
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_sec(&self) -> TimeSec {
        self.frame_count() as TimeSec / self.sample_rate as TimeSec
    }

    /// Interleaved samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Frame `index` as a channel slice
    pub fn frame(&self, index: usize) -> &[f32] {
        let start = index * self.channels;
        &self.samples[start..start + self.channels]
    }

    pub fn frames(&self) -> std::slice::ChunksExact<'_, f32> {
        self.samples.chunks_exact(self.channels)
    }

    /// Copies out one channel as a flat sequence
    pub fn channel(&self, channel: usize) -> Vec<f32> {
        self.frames().map(|frame| frame[channel]).collect()
    }
}
