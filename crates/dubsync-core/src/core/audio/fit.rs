//! Duration Fitting
//!
//! Makes a clip's frame count match its cue duration exactly, either by
//! trimming/padding with silence or by linear resampling.

use serde::{Deserialize, Serialize};

use super::AudioBuffer;
use crate::core::{secs_to_frames, CoreError, CoreResult, SampleRate, TimeSec};

/// How a clip is made to fit its cue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStrategy {
    /// Truncate long clips, append silence to short ones. Timbre and tempo
    /// are untouched.
    PadTrim,
    /// Piecewise-linear resampling to exactly the target length. Changes
    /// pitch and tempo.
    Resample,
}

impl std::fmt::Display for FitStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PadTrim => write!(f, "pad_trim"),
            Self::Resample => write!(f, "resample"),
        }
    }
}

/// Applies one [`FitStrategy`] to every clip of a run
#[derive(Clone, Copy, Debug)]
pub struct DurationFitter {
    strategy: FitStrategy,
}

impl DurationFitter {
    pub fn new(strategy: FitStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> FitStrategy {
        self.strategy
    }

    /// Target frame count `max(1, round(rate * duration))`.
    ///
    /// Non-positive or non-finite durations fail with `InvalidDuration`.
    pub fn target_frames(sample_rate: SampleRate, duration_sec: TimeSec) -> CoreResult<usize> {
        if !duration_sec.is_finite() || duration_sec <= 0.0 {
            return Err(CoreError::InvalidDuration(duration_sec));
        }
        let frames = secs_to_frames(duration_sec, sample_rate)
            .ok_or(CoreError::InvalidDuration(duration_sec))?;
        Ok(frames.max(1))
    }

    /// Fits `clip` to `duration_sec` at the clip's own sample rate
    pub fn fit(&self, clip: &AudioBuffer, duration_sec: TimeSec) -> CoreResult<AudioBuffer> {
        let target = Self::target_frames(clip.sample_rate(), duration_sec)?;
        self.fit_to_frames(clip, target)
    }

    /// Fits `clip` to exactly `target` frames
    pub fn fit_to_frames(&self, clip: &AudioBuffer, target: usize) -> CoreResult<AudioBuffer> {
        if target == 0 {
            return Err(CoreError::InvalidDuration(0.0));
        }
        Ok(match self.strategy {
            FitStrategy::PadTrim => pad_trim(clip, target),
            FitStrategy::Resample => resample_linear(clip, target),
        })
    }

    /// Fits a batch of clips, one duration each.
    ///
    /// All clips must share one channel count.
    pub fn fit_all(
        &self,
        clips: &[AudioBuffer],
        durations_sec: &[TimeSec],
    ) -> CoreResult<Vec<AudioBuffer>> {
        if clips.len() != durations_sec.len() {
            return Err(CoreError::CountMismatch {
                cues: durations_sec.len(),
                clips: clips.len(),
            });
        }
        ensure_uniform_channels(clips)?;

        clips
            .iter()
            .zip(durations_sec)
            .map(|(clip, &duration)| self.fit(clip, duration))
            .collect()
    }
}

/// Fails with `ShapeMismatch` unless every clip has the first clip's channel count
pub fn ensure_uniform_channels(clips: &[AudioBuffer]) -> CoreResult<usize> {
    let Some(first) = clips.first() else {
        return Ok(1);
    };
    let expected = first.channels();
    match clips.iter().find(|clip| clip.channels() != expected) {
        Some(odd) => Err(CoreError::ShapeMismatch {
            expected,
            found: odd.channels(),
        }),
        None => Ok(expected),
    }
}

/// Truncates to `target` frames or extends with silent frames
pub fn pad_trim(clip: &AudioBuffer, target: usize) -> AudioBuffer {
    let channels = clip.channels();
    let mut samples = clip.samples().to_vec();
    samples.resize(target * channels, 0.0);
    clip.with_samples(samples)
}

/// Linear interpolation over `[0, n-1] -> [0, target-1]`, per channel
pub fn resample_linear(clip: &AudioBuffer, target: usize) -> AudioBuffer {
    let channels = clip.channels();
    let current = clip.frame_count();

    if current == target {
        return clip.clone();
    }
    if current == 0 {
        return clip.with_samples(vec![0.0; target * channels]);
    }
    if target == 1 {
        return clip.with_samples(clip.frame(0).to_vec());
    }
    if current == 1 {
        return clip.with_samples(clip.frame(0).repeat(target));
    }

    let step = (current - 1) as f64 / (target - 1) as f64;
    let mut samples = Vec::with_capacity(target * channels);
    for idx in 0..target {
        let position = idx as f64 * step;
        let left = (position.floor() as usize).min(current - 1);
        let right = (left + 1).min(current - 1);
        let weight = position - left as f64;

        let (left_frame, right_frame) = (clip.frame(left), clip.frame(right));
        for ch in 0..channels {
            let value =
                (1.0 - weight) * left_frame[ch] as f64 + weight * right_frame[ch] as f64;
            samples.push(value as f32);
        }
    }
    clip.with_samples(samples)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> AudioBuffer {
        AudioBuffer::mono(100, (0..n).map(|i| i as f32 / n as f32).collect()).unwrap()
    }

    #[test]
    fn test_target_frames() {
        assert_eq!(DurationFitter::target_frames(100, 2.0).unwrap(), 200);
        assert_eq!(DurationFitter::target_frames(100, 0.001).unwrap(), 1);
        assert!(matches!(
            DurationFitter::target_frames(100, 0.0),
            Err(CoreError::InvalidDuration(_))
        ));
        assert!(DurationFitter::target_frames(100, -1.0).is_err());
        assert!(DurationFitter::target_frames(100, f64::NAN).is_err());
    }

    #[test]
    fn test_pad_trim_exact_length_both_directions() {
        let fitter = DurationFitter::new(FitStrategy::PadTrim);
        for (n, target) in [(50, 200), (300, 200), (200, 200), (0, 7)] {
            let fitted = fitter.fit_to_frames(&ramp(n), target).unwrap();
            assert_eq!(fitted.frame_count(), target, "n={n}");
        }
    }

    #[test]
    fn test_pad_trim_keeps_prefix_and_pads_silence() {
        let clip = AudioBuffer::mono(100, vec![0.5; 50]).unwrap();
        let fitted = pad_trim(&clip, 80);
        assert!(fitted.samples()[..50].iter().all(|&s| s == 0.5));
        assert!(fitted.samples()[50..].iter().all(|&s| s == 0.0));

        let trimmed = pad_trim(&ramp(10), 4);
        assert_eq!(trimmed.samples(), &ramp(10).samples()[..4]);
    }

    #[test]
    fn test_resample_exact_length() {
        let fitter = DurationFitter::new(FitStrategy::Resample);
        for (n, target) in [(0, 5), (1, 9), (2, 1), (50, 200), (150, 100), (7, 7)] {
            let fitted = fitter.fit_to_frames(&ramp(n), target).unwrap();
            assert_eq!(fitted.frame_count(), target, "n={n} target={target}");
        }
    }

    #[test]
    fn test_resample_single_frame_is_constant() {
        let clip = AudioBuffer::mono(100, vec![0.25]).unwrap();
        let fitted = resample_linear(&clip, 40);
        assert!(fitted.samples().iter().all(|&s| s == 0.25));
    }

    #[test]
    fn test_resample_preserves_endpoints_and_interpolates() {
        let clip = AudioBuffer::mono(100, vec![0.0, 1.0]).unwrap();
        let fitted = resample_linear(&clip, 5);
        let expected = [0.0, 0.25, 0.5, 0.75, 1.0];
        for (a, b) in fitted.samples().iter().zip(expected) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_resample_multichannel_keeps_channels_independent() {
        let frames: Vec<Vec<f32>> = (0..10)
            .map(|i| {
                let v = -1.0 + 2.0 * i as f32 / 9.0;
                vec![v, -v]
            })
            .collect();
        let clip = AudioBuffer::from_frames(20, &frames).unwrap();
        let fitted = resample_linear(&clip, 20);
        assert_eq!(fitted.channels(), 2);
        assert!(fitted.frames().all(|f| (f[0] + f[1]).abs() < 1e-6));
    }

    #[test]
    fn test_fit_rejects_zero_target() {
        let fitter = DurationFitter::new(FitStrategy::Resample);
        assert!(matches!(
            fitter.fit_to_frames(&ramp(3), 0),
            Err(CoreError::InvalidDuration(_))
        ));
        assert!(fitter.fit(&ramp(3), 0.0).is_err());
    }

    #[test]
    fn test_fit_all_rejects_mixed_channel_counts() {
        let fitter = DurationFitter::new(FitStrategy::PadTrim);
        let mono = ramp(4);
        let stereo = AudioBuffer::from_frames(100, &[vec![0.0, 0.0]]).unwrap();
        let result = fitter.fit_all(&[mono, stereo], &[1.0, 1.0]);
        assert!(matches!(
            result,
            Err(CoreError::ShapeMismatch {
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn test_fit_all_count_mismatch() {
        let fitter = DurationFitter::new(FitStrategy::PadTrim);
        let result = fitter.fit_all(&[ramp(4)], &[1.0, 2.0]);
        assert!(matches!(result, Err(CoreError::CountMismatch { .. })));
    }
}
