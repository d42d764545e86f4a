//! Alignment Module
//!
//! End-to-end pipeline: subtitles in, one PCM dub track out.
//!
//! - `orchestrator.rs` - directory and paired runs, plus in-memory alignment
//! - `pool.rs` - bounded concurrency for per-cue decode work
//! - `report.rs` - serializable run summary

mod orchestrator;
mod pool;
mod report;

pub use orchestrator::{align_segments, AlignmentOrchestrator};
pub use pool::{resolve_concurrency, DecodePool, MAX_CONCURRENT_DECODES};
pub use report::AlignmentReport;

use std::path::PathBuf;

use crate::core::audio::{FitStrategy, DEFAULT_FADE_MS};
use crate::core::subtitles::ParseMode;
use crate::core::SampleRate;

/// Tuning for one alignment run.
///
/// The fit strategy has no default; callers choose between exact timbre
/// (pad/trim) and exact duration (resample).
#[derive(Debug, Clone, PartialEq)]
pub struct AlignOptions {
    pub strategy: FitStrategy,
    /// Boundary ramp length; `<= 0` disables fades
    pub fade_ms: f64,
    /// Output rate; `None` takes the rate of the first decoded clip
    pub sample_rate: Option<SampleRate>,
    pub parse_mode: ParseMode,
    /// Concurrent decode jobs; `0` means one per CPU core
    pub max_concurrent_decodes: usize,
    /// Where converted clips are copied as `<index>.wav`, if anywhere
    pub write_wav_dir: Option<PathBuf>,
}

impl AlignOptions {
    pub fn new(strategy: FitStrategy) -> Self {
        Self {
            strategy,
            fade_ms: DEFAULT_FADE_MS,
            sample_rate: None,
            parse_mode: ParseMode::default(),
            max_concurrent_decodes: 0,
            write_wav_dir: None,
        }
    }

    pub fn with_fade_ms(mut self, fade_ms: f64) -> Self {
        self.fade_ms = fade_ms;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: Option<SampleRate>) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_parse_mode(mut self, parse_mode: ParseMode) -> Self {
        self.parse_mode = parse_mode;
        self
    }

    pub fn with_max_concurrent_decodes(mut self, jobs: usize) -> Self {
        self.max_concurrent_decodes = jobs;
        self
    }

    pub fn with_write_wav_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.write_wav_dir = dir;
        self
    }
}
