//! dubsync Core Type Definitions
//!
//! Defines fundamental types and sample-index arithmetic shared by the
//! pipeline stages.

use serde::{Deserialize, Serialize};

// =============================================================================
// Scalar Types
// =============================================================================

/// Subtitle cue ordinal (not necessarily unique or contiguous)
pub type CueIndex = u32;

/// Time in seconds (floating point)
pub type TimeSec = f64;

/// Time in milliseconds (integer, as written in subtitle files)
pub type TimeMs = u64;

/// Sample rate in Hz
pub type SampleRate = u32;

// =============================================================================
// Sample Index Arithmetic
// =============================================================================

/// Converts a millisecond timestamp to the nearest frame index at `sample_rate`.
///
/// Integer arithmetic keeps placement exact: `round(rate * ms / 1000)` with
/// halves rounded up.
pub fn ms_to_frames(ms: TimeMs, sample_rate: SampleRate) -> usize {
    let scaled = ms as u128 * sample_rate as u128;
    ((scaled + 500) / 1000) as usize
}

/// Like [`ms_to_frames`] but rounds up, so a timeline always covers `ms`.
pub fn ms_to_frames_ceil(ms: TimeMs, sample_rate: SampleRate) -> usize {
    let scaled = ms as u128 * sample_rate as u128;
    scaled.div_ceil(1000) as usize
}

/// Converts a duration in seconds to a frame count, `round(rate * secs)`.
///
/// Returns `None` for non-finite or negative inputs.
pub fn secs_to_frames(secs: TimeSec, sample_rate: SampleRate) -> Option<usize> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some((secs * sample_rate as f64).round() as usize)
}

// =============================================================================
// Channel Handling
// =============================================================================

/// How a reader treats multi-channel input
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelMode {
    /// Keep every channel as stored
    #[default]
    Preserve,
    /// Average interleaved channels into one, truncating toward zero
    Mono,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ms_to_frames_rounds_to_nearest() {
        assert_eq!(ms_to_frames(1000, 100), 100);
        assert_eq!(ms_to_frames(1005, 100), 101);
        assert_eq!(ms_to_frames(1004, 100), 100);
        assert_eq!(ms_to_frames(0, 48000), 0);
        assert_eq!(ms_to_frames(1, 44100), 44);
    }

    #[test]
    fn test_ms_to_frames_ceil_covers_timestamp() {
        assert_eq!(ms_to_frames_ceil(5000, 100), 500);
        assert_eq!(ms_to_frames_ceil(5001, 100), 501);
        assert_eq!(ms_to_frames_ceil(1, 1000), 1);
    }

    #[test]
    fn test_secs_to_frames_rejects_invalid() {
        assert_eq!(secs_to_frames(2.0, 100), Some(200));
        assert_eq!(secs_to_frames(-1.0, 100), None);
        assert_eq!(secs_to_frames(f64::NAN, 100), None);
        assert_eq!(secs_to_frames(f64::INFINITY, 100), None);
    }
}
