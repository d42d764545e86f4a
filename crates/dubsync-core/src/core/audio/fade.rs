//! Boundary Fades
//!
//! Linear gain ramps at both ends of a fitted clip so it does not click when
//! summed onto silence or a neighbouring cue.

use super::AudioBuffer;
use crate::core::SampleRate;

/// Default ramp length used by the CLI and settings
pub const DEFAULT_FADE_MS: f64 = 8.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FadeShaper {
    fade_ms: f64,
}

impl Default for FadeShaper {
    fn default() -> Self {
        Self::new(DEFAULT_FADE_MS)
    }
}

impl FadeShaper {
    /// `fade_ms <= 0` disables fading
    pub fn new(fade_ms: f64) -> Self {
        Self { fade_ms }
    }

    pub fn fade_ms(&self) -> f64 {
        self.fade_ms
    }

    /// Ramp length in frames for a clip of `frame_count` frames.
    ///
    /// `max(1, round(rate * ms / 1000))`, capped at half the clip so the in
    /// and out ramps never overlap. Zero means no fade.
    pub fn fade_frames(&self, sample_rate: SampleRate, frame_count: usize) -> usize {
        if !self.fade_ms.is_finite() || self.fade_ms <= 0.0 {
            return 0;
        }
        let wanted = (sample_rate as f64 * self.fade_ms / 1000.0).round() as usize;
        wanted.max(1).min(frame_count / 2)
    }

    /// Scales frame `i` by `i/L` from the front and frame `n-1-i` by `i/L`
    /// from the back, on every channel.
    pub fn apply(&self, clip: &mut AudioBuffer) {
        let n = clip.frame_count();
        let len = self.fade_frames(clip.sample_rate(), n);
        if len == 0 {
            return;
        }

        let channels = clip.channels();
        let samples = clip.samples_mut();
        for i in 0..len {
            let gain = i as f32 / len as f32;
            let head = i * channels;
            let tail = (n - 1 - i) * channels;
            for ch in 0..channels {
                samples[head + ch] *= gain;
                samples[tail + ch] *= gain;
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
