//! SRT Cue Parser
//!
//! Parses SubRip block text into ordered [`SubtitleInterval`]s.
//!
//! # SRT Format
//!
//! ```text
//! 1
//! 00:00:01,000 --> 00:00:04,000
//! First caption text
//!
//! 2
//! 00:00:05,500 --> 00:00:08,000
//! Second caption text
//! with multiple lines
//! ```

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::SubtitleInterval;
use crate::core::{CueIndex, TimeMs};

const ARROW: &str = "-->";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during subtitle parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Time literal is not `HH:MM:SS,mmm`
    InvalidTimestamp(String),
    /// Timing line or block layout is malformed
    InvalidFormat(String),
    /// Index line is not an integer (strict mode only)
    InvalidIndex(String),
    /// Cue ends at or before it starts
    InvalidInterval {
        index: CueIndex,
        start_ms: TimeMs,
        end_ms: TimeMs,
    },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTimestamp(s) => write!(f, "Invalid timestamp: {}", s),
            Self::InvalidFormat(s) => write!(f, "Invalid format: {}", s),
            Self::InvalidIndex(s) => write!(f, "Invalid cue index: {}", s),
            Self::InvalidInterval {
                index,
                start_ms,
                end_ms,
            } => write!(
                f,
                "Cue {} ends before it starts: {} --> {}",
                index,
                format_srt_timestamp(*start_ms),
                format_srt_timestamp(*end_ms)
            ),
        }
    }
}

impl std::error::Error for ParseError {}

// =============================================================================
// Parse Mode
// =============================================================================

/// How to treat an index line that is not an integer
///
/// A block whose first line is already the timing line (index omitted) is
/// recovered in both modes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    /// Reject the whole input
    Strict,
    /// Synthesize a sequential index and keep the line as caption text
    #[default]
    Permissive,
}

// =============================================================================
// SRT Parsing
// =============================================================================

/// A run of non-blank lines and the 1-based line number it starts on
struct Block<'a> {
    first_line: usize,
    lines: Vec<&'a str>,
}

/// Parses SRT content into intervals sorted by start time, then cue index.
///
/// Blocks with fewer than two non-blank lines are skipped.
pub fn parse_srt(content: &str, mode: ParseMode) -> Result<Vec<SubtitleInterval>, ParseError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut entries: Vec<SubtitleInterval> = Vec::new();

    for block in split_blocks(content) {
        if block.lines.len() < 2 {
            continue;
        }
        let synthesized = entries.len() as CueIndex + 1;
        entries.push(parse_block(&block, synthesized, mode)?);
    }

    entries.sort_by_key(|entry| (entry.start_ms(), entry.index));
    Ok(entries)
}

fn split_blocks(content: &str) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    let mut current: Option<Block<'_>> = None;

    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
            continue;
        }
        current
            .get_or_insert_with(|| Block {
                first_line: line_no + 1,
                lines: Vec::new(),
            })
            .lines
            .push(line);
    }
    if let Some(block) = current {
        blocks.push(block);
    }

    blocks
}

fn parse_block(
    block: &Block<'_>,
    synthesized: CueIndex,
    mode: ParseMode,
) -> Result<SubtitleInterval, ParseError> {
    let first = block.lines[0].trim();

    // (index, position of the timing line, caption lines carried over)
    let (index, timing_at, mut text_lines) = match first.parse::<CueIndex>() {
        Ok(index) => (index, 1, Vec::new()),
        Err(_) if first.contains(ARROW) => (synthesized, 0, Vec::new()),
        Err(_) => match mode {
            ParseMode::Strict => {
                return Err(ParseError::InvalidIndex(format!(
                    "line {}: {:?}",
                    block.first_line, first
                )));
            }
            ParseMode::Permissive => (synthesized, 1, vec![block.lines[0]]),
        },
    };

    let timing_line = block.lines[timing_at];
    let (start_ms, end_ms) = parse_srt_timestamp_line(timing_line)
        .map_err(|err| with_line(err, block.first_line + timing_at))?;

    text_lines.extend(&block.lines[timing_at + 1..]);
    SubtitleInterval::new(index, start_ms, end_ms, text_lines.join("\n"))
}

fn with_line(err: ParseError, line_no: usize) -> ParseError {
    match err {
        ParseError::InvalidTimestamp(s) => {
            ParseError::InvalidTimestamp(format!("line {}: {}", line_no, s))
        }
        ParseError::InvalidFormat(s) => ParseError::InvalidFormat(format!("line {}: {}", line_no, s)),
        other => other,
    }
}

/// Parses an SRT timestamp line (e.g., "00:00:01,000 --> 00:00:04,000")
fn parse_srt_timestamp_line(line: &str) -> Result<(TimeMs, TimeMs), ParseError> {
    let (start, end) = line.split_once(ARROW).ok_or_else(|| {
        ParseError::InvalidFormat(format!("Expected 'start --> end' format: {}", line.trim()))
    })?;

    let start = parse_srt_timestamp(start.trim())?;
    let end = parse_srt_timestamp(end.trim())?;

    Ok((start, end))
}

fn timestamp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{2}):(\d{2}):(\d{2}),(\d{3})$").expect("timestamp pattern is valid")
    })
}

/// Parses a fixed-width SRT timestamp (e.g., "00:01:23,456") into milliseconds
fn parse_srt_timestamp(ts: &str) -> Result<TimeMs, ParseError> {
    let caps = timestamp_pattern()
        .captures(ts)
        .ok_or_else(|| ParseError::InvalidTimestamp(ts.to_string()))?;

    let field = |i: usize| -> TimeMs { caps[i].parse().unwrap_or(0) };
    let (hours, minutes, seconds, millis) = (field(1), field(2), field(3), field(4));

    Ok(((hours * 60 + minutes) * 60 + seconds) * 1000 + millis)
}

/// Formats milliseconds as an SRT timestamp (00:00:00,000)
pub fn format_srt_timestamp(ms: TimeMs) -> String {
    let millis = ms % 1000;
    let total_secs = ms / 1000;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;

    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, millis)
}

// =============================================================================
// Tests
// =============================================================================
