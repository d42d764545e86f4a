//! Clip Discovery
//!
//! Maps a cue index to a recording in the dubs folder by file name.
//! Accepted names for cue `N` (in lookup order): `N`, `0N`, `00N`, `000N`,
//! `line_N`, `clip_N`, each with any supported audio extension, compared
//! case-insensitively. Files are not opened or validated here.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{CoreError, CoreResult, CueIndex};

/// Supported clip extensions, in lookup order
pub const CLIP_EXTENSIONS: &[&str] = &["wav", "mp3", "m4a", "aac", "ogg", "flac", "opus", "wma"];

/// Locates per-cue clips inside one directory
#[derive(Debug, Clone)]
pub struct ClipLocator {
    dir: PathBuf,
    /// Lowercased file name -> actual file name
    entries: HashMap<String, String>,
}

impl ClipLocator {
    /// Snapshots the directory listing of `dir`.
    pub fn scan(dir: &Path) -> CoreResult<Self> {
        let read_dir = fs::read_dir(dir).map_err(|e| CoreError::file_io(dir, e))?;

        let mut entries = HashMap::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| CoreError::file_io(dir, e))?;
            let is_file = entry.file_type().map(|t| !t.is_dir()).unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                entries.insert(name.to_lowercase(), name.to_string());
            }
        }

        debug!("Scanned {} candidate files in {}", entries.len(), dir.display());
        Ok(Self {
            dir: dir.to_path_buf(),
            entries,
        })
    }

    /// Directory this locator was built from
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the first file matching `index` in candidate order.
    pub fn locate(&self, index: CueIndex) -> Option<PathBuf> {
        candidate_bases(index)
            .iter()
            .flat_map(|base| CLIP_EXTENSIONS.iter().map(move |ext| format!("{base}.{ext}")))
            .find_map(|name| self.entries.get(&name.to_lowercase()))
            .map(|actual| self.dir.join(actual))
    }
}

/// Base names tried for `index`, bare number first
fn candidate_bases(index: CueIndex) -> [String; 6] {
    [
        format!("{index}"),
        format!("{index:02}"),
        format!("{index:03}"),
        format!("{index:04}"),
        format!("line_{index}"),
        format!("clip_{index}"),
    ]
}

/// One-shot lookup without keeping the listing around.
pub fn find_clip_file(dir: &Path, index: CueIndex) -> CoreResult<Option<PathBuf>> {
    Ok(ClipLocator::scan(dir)?.locate(index))
}

// =============================================================================
// Tests
// =============================================================================
