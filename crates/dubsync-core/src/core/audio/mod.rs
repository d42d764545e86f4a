//! Audio Module
//!
//! Sample-level building blocks of the aligner:
//! - `buffer.rs`   - [`AudioBuffer`], normalized interleaved frames
//! - `pcm.rs`      - 16-bit PCM WAV reading/writing and sample conversion
//! - `fit.rs`      - pad/trim or linear-resample a clip to its cue length
//! - `fade.rs`     - linear in/out ramps
//! - `timeline.rs` - additive placement with one final saturation

mod buffer;
pub mod fade;
pub mod fit;
pub mod pcm;
pub mod timeline;

pub use buffer::AudioBuffer;
pub use fade::{FadeShaper, DEFAULT_FADE_MS};
pub use fit::{DurationFitter, FitStrategy};
pub use pcm::{read_pcm, write_pcm, PcmInfo};
pub use timeline::{Placement, TimelineAccumulator};
