//! dubsync Core Engine
//!
//! Subtitle parsing, clip discovery, PCM I/O, duration fitting, fades,
//! timeline accumulation, and the orchestrator that ties them together.

pub mod align;
pub mod audio;
pub mod clips;
pub mod ffmpeg;
pub mod process;
pub mod settings;
pub mod subtitles;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;

#[cfg(test)]
mod tests_pipeline;
