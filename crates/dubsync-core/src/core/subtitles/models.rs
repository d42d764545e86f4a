//! Subtitle Data Models
//!
//! Defines the timed interval a dub clip is aligned to.

use serde::Serialize;

use super::ParseError;
use crate::core::{CueIndex, TimeMs, TimeSec};

// =============================================================================
// Subtitle Interval
// =============================================================================

/// A single subtitle cue: ordinal, time range, and caption text
///
/// Times are kept in integer milliseconds, the resolution subtitle files
/// are written in. `end_ms > start_ms` always holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleInterval {
    /// Cue ordinal from the subtitle file
    pub index: CueIndex,
    /// Start time in milliseconds
    start_ms: TimeMs,
    /// End time in milliseconds
    end_ms: TimeMs,
    /// Caption text, informational only
    pub text: String,
}

impl SubtitleInterval {
    /// Creates an interval, rejecting empty or inverted ranges
    pub fn new(
        index: CueIndex,
        start_ms: TimeMs,
        end_ms: TimeMs,
        text: impl Into<String>,
    ) -> Result<Self, ParseError> {
        if end_ms <= start_ms {
            return Err(ParseError::InvalidInterval {
                index,
                start_ms,
                end_ms,
            });
        }
        Ok(Self {
            index,
            start_ms,
            end_ms,
            text: text.into(),
        })
    }

    /// Creates an interval from second-based times, rounded to milliseconds
    pub fn from_secs(
        index: CueIndex,
        start: TimeSec,
        end: TimeSec,
        text: impl Into<String>,
    ) -> Result<Self, ParseError> {
        let to_ms = |secs: TimeSec| -> Result<TimeMs, ParseError> {
            if !secs.is_finite() || secs < 0.0 {
                return Err(ParseError::InvalidTimestamp(secs.to_string()));
            }
            Ok((secs * 1000.0).round() as TimeMs)
        };
        Self::new(index, to_ms(start)?, to_ms(end)?, text)
    }

    pub fn start_ms(&self) -> TimeMs {
        self.start_ms
    }

    pub fn end_ms(&self) -> TimeMs {
        self.end_ms
    }

    pub fn duration_ms(&self) -> TimeMs {
        self.end_ms - self.start_ms
    }

    pub fn start_sec(&self) -> TimeSec {
        self.start_ms as TimeSec / 1000.0
    }

    pub fn end_sec(&self) -> TimeSec {
        self.end_ms as TimeSec / 1000.0
    }

    /// Duration in seconds
    pub fn duration_sec(&self) -> TimeSec {
        self.duration_ms() as TimeSec / 1000.0
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_rejects_inverted_range() {
        assert!(SubtitleInterval::new(1, 2000, 1000, "").is_err());
        assert!(SubtitleInterval::new(1, 1000, 1000, "").is_err());
        assert!(SubtitleInterval::new(1, 1000, 1001, "").is_ok());
    }

    #[test]
    fn test_interval_from_secs() {
        let interval = SubtitleInterval::from_secs(2, 1.0, 3.5, "hi").unwrap();
        assert_eq!(interval.start_ms(), 1000);
        assert_eq!(interval.end_ms(), 3500);
        assert_eq!(interval.duration_ms(), 2500);
        assert!((interval.duration_sec() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_interval_from_secs_rejects_negative_start() {
        assert!(matches!(
            SubtitleInterval::from_secs(1, -0.5, 1.0, ""),
            Err(ParseError::InvalidTimestamp(_))
        ));
    }
}
