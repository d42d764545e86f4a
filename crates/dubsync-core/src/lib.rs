//! dubsync core library
//!
//! Builds one continuous dub track from per-cue recordings placed at their
//! subtitle timestamps. The CLI crate is a thin shell over [`core`].

pub mod core;

pub use crate::core::{
    align::{align_segments, AlignOptions, AlignmentOrchestrator, AlignmentReport},
    audio::{AudioBuffer, FitStrategy},
    subtitles::{parse_srt, ParseMode, SubtitleInterval},
    CoreError, CoreResult,
};
