//! Run summary returned by the orchestrator

use std::path::PathBuf;

use serde::Serialize;

use crate::core::audio::FitStrategy;
use crate::core::{CueIndex, SampleRate, TimeSec};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentReport {
    pub output_path: PathBuf,
    pub sample_rate: SampleRate,
    pub channels: usize,
    pub frames: usize,
    pub duration_sec: TimeSec,
    pub strategy: FitStrategy,
    /// Cues whose clip was added to the timeline, in cue order
    pub placed: Vec<CueIndex>,
    /// Cues with no clip file
    pub missing: Vec<CueIndex>,
    /// Cues whose start fell at or past the timeline end
    pub out_of_range: Vec<CueIndex>,
    /// Placements whose tail was cut at the timeline end
    pub truncated: usize,
    /// Converted clips that could not be copied to the persist directory
    pub persist_failures: usize,
    pub warning_count: usize,
}

impl AlignmentReport {
    /// One-line human summary
    pub fn summary(&self) -> String {
        let mut line = format!(
            "Wrote {} ({} cues placed, {:.3}s at {} Hz)",
            self.output_path.display(),
            self.placed.len(),
            self.duration_sec,
            self.sample_rate
        );
        if !self.missing.is_empty() {
            line.push_str(&format!("; {} cues had no matching clip", self.missing.len()));
        }
        if !self.out_of_range.is_empty() {
            line.push_str(&format!(
                "; {} clips started beyond the timeline",
                self.out_of_range.len()
            ));
        }
        line
    }
}
