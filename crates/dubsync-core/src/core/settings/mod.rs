//! Settings Persistence System
//!
//! Persistent defaults for alignment runs with:
//! - Atomic file writes (temp file + rename)
//! - Tolerant normalization instead of hard validation
//! - Advisory locking against concurrent writers
//!
//! Storage location: {config_dir}/dubsync/settings.json

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::align::{AlignOptions, MAX_CONCURRENT_DECODES};
use crate::core::audio::{FitStrategy, DEFAULT_FADE_MS};
use crate::core::ffmpeg::DubMode;
use crate::core::subtitles::ParseMode;
use crate::core::{CoreError, CoreResult, SampleRate};

/// Settings schema version for migration support
pub const SETTINGS_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE: &str = "settings.json";

/// Lock file name (advisory lock to prevent concurrent writers)
pub const SETTINGS_LOCK_FILE: &str = "settings.json.lock";

/// Application directory name under the platform config dir
pub const APP_DIR_NAME: &str = "dubsync";

const STRATEGIES: &[&str] = &["pad_trim", "resample"];
const PARSE_MODES: &[&str] = &["strict", "permissive"];
const DUB_MODES: &[&str] = &["replace", "mix"];

/// Persisted alignment defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlignSettings {
    /// Schema version for migrations
    #[serde(default = "default_version")]
    pub version: u32,

    /// Output rate; null takes the first clip's rate
    #[serde(default)]
    pub sample_rate: Option<SampleRate>,

    #[serde(default = "default_fade_ms")]
    pub fade_ms: f64,

    /// "pad_trim" or "resample"
    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// "strict" or "permissive"
    #[serde(default = "default_parse_mode")]
    pub parse_mode: String,

    /// 0 = one decode per CPU core
    #[serde(default)]
    pub max_concurrent_decodes: u32,

    #[serde(default = "default_decoder_timeout")]
    pub decoder_timeout_secs: u64,

    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub write_wav_dir: Option<PathBuf>,

    #[serde(default)]
    pub dub: DubSettings,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

fn default_fade_ms() -> f64 {
    DEFAULT_FADE_MS
}

fn default_strategy() -> String {
    "pad_trim".to_string()
}

fn default_parse_mode() -> String {
    "permissive".to_string()
}

fn default_decoder_timeout() -> u64 {
    120
}

impl Default for AlignSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            sample_rate: None,
            fade_ms: default_fade_ms(),
            strategy: default_strategy(),
            parse_mode: default_parse_mode(),
            max_concurrent_decodes: 0,
            decoder_timeout_secs: default_decoder_timeout(),
            ffmpeg_path: None,
            write_wav_dir: None,
            dub: DubSettings::default(),
        }
    }
}

/// Video dub defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DubSettings {
    /// "replace" or "mix"
    #[serde(default = "default_dub_mode")]
    pub mode: String,

    /// Linear gain on the original audio in mix mode
    #[serde(default = "default_background_volume")]
    pub background_volume: f64,
}

fn default_dub_mode() -> String {
    "mix".to_string()
}

fn default_background_volume() -> f64 {
    0.3
}

impl Default for DubSettings {
    fn default() -> Self {
        Self {
            mode: default_dub_mode(),
            background_volume: default_background_volume(),
        }
    }
}

impl DubSettings {
    pub fn dub_mode(&self) -> DubMode {
        match self.mode.as_str() {
            "replace" => DubMode::Replace,
            _ => DubMode::Mix {
                background_volume: self.background_volume,
            },
        }
    }
}

impl AlignSettings {
    /// Normalizes and clamps settings so persisted state is always valid.
    ///
    /// Bad values are corrected, never rejected, so a hand-edited file
    /// cannot block a run.
    pub fn normalize(&mut self) {
        self.version = SETTINGS_VERSION;

        self.fade_ms = clamp_f64(self.fade_ms, 0.0, 1000.0);
        self.sample_rate = self.sample_rate.map(|rate| rate.clamp(8_000, 384_000));
        self.strategy = normalize_enum(&self.strategy, STRATEGIES, default_strategy());
        self.parse_mode = normalize_enum(&self.parse_mode, PARSE_MODES, default_parse_mode());
        self.max_concurrent_decodes = self
            .max_concurrent_decodes
            .min(MAX_CONCURRENT_DECODES as u32);
        self.decoder_timeout_secs = self.decoder_timeout_secs.clamp(1, 3600);

        if self
            .ffmpeg_path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            self.ffmpeg_path = None;
        }
        if self
            .write_wav_dir
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            self.write_wav_dir = None;
        }

        self.dub.mode = normalize_enum(&self.dub.mode, DUB_MODES, default_dub_mode());
        self.dub.background_volume = clamp_f64(self.dub.background_volume, 0.0, 1.0);
    }

    pub fn fit_strategy(&self) -> FitStrategy {
        match self.strategy.as_str() {
            "resample" => FitStrategy::Resample,
            _ => FitStrategy::PadTrim,
        }
    }

    pub fn parse_mode(&self) -> ParseMode {
        match self.parse_mode.as_str() {
            "strict" => ParseMode::Strict,
            _ => ParseMode::Permissive,
        }
    }

    pub fn decoder_timeout(&self) -> Duration {
        Duration::from_secs(self.decoder_timeout_secs)
    }

    /// Run options carrying these settings
    pub fn to_align_options(&self) -> AlignOptions {
        AlignOptions::new(self.fit_strategy())
            .with_fade_ms(self.fade_ms)
            .with_sample_rate(self.sample_rate)
            .with_parse_mode(self.parse_mode())
            .with_max_concurrent_decodes(self.max_concurrent_decodes as usize)
            .with_write_wav_dir(self.write_wav_dir.clone())
    }
}

fn clamp_f64(value: f64, min: f64, max: f64) -> f64 {
    if !value.is_finite() {
        return min;
    }
    value.clamp(min, max)
}

fn normalize_enum(value: &str, allowed: &[&str], fallback: String) -> String {
    let lowered = value.trim().to_ascii_lowercase().replace('-', "_");
    if allowed.contains(&lowered.as_str()) {
        lowered
    } else {
        fallback
    }
}

// =============================================================================
// Settings Manager
// =============================================================================

/// Settings manager for loading, saving, and resetting settings
pub struct SettingsManager {
    settings_path: PathBuf,
}

impl SettingsManager {
    /// Manager for `settings.json` inside `config_dir`
    pub fn new(config_dir: PathBuf) -> Self {
        Self {
            settings_path: config_dir.join(SETTINGS_FILE),
        }
    }

    /// Manager for an explicit settings file
    pub fn with_file(settings_path: PathBuf) -> Self {
        Self { settings_path }
    }

    /// `{config_dir}/dubsync`, when the platform has a config dir
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME))
    }

    /// Manager at the platform default location
    pub fn at_default_location() -> CoreResult<Self> {
        Self::default_dir()
            .map(Self::new)
            .ok_or_else(|| CoreError::NotFound("No user config directory".to_string()))
    }

    fn lock_path(&self) -> PathBuf {
        self.settings_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(SETTINGS_LOCK_FILE)
    }

    fn with_lock<T>(&self, exclusive: bool, op: impl FnOnce() -> CoreResult<T>) -> CoreResult<T> {
        // The lock file lives next to the settings file
        if let Some(parent) = self.settings_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CoreError::file_io(parent, e))?;
        }

        let lock_path = self.lock_path();
        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| CoreError::file_io(&lock_path, e))?;

        let locked = if exclusive {
            fs2::FileExt::lock_exclusive(&lock_file)
        } else {
            fs2::FileExt::lock_shared(&lock_file)
        };
        locked.map_err(|e| CoreError::file_io(&lock_path, e))?;

        let result = op();

        if let Err(e) = fs2::FileExt::unlock(&lock_file) {
            warn!("Failed to unlock settings lock file: {}", e);
        }

        result
    }

    /// Get the settings file path
    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Load settings from disk, returning defaults if missing or unreadable
    pub fn load(&self) -> AlignSettings {
        match self.try_load() {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to load settings, using defaults: {}", e);
                AlignSettings::default()
            }
        }
    }

    /// Like [`load`](Self::load) but surfaces read and parse errors
    pub fn try_load(&self) -> CoreResult<AlignSettings> {
        self.with_lock(false, || {
            if !self.settings_path.exists() {
                info!("Settings file not found, using defaults");
                return Ok(AlignSettings::default());
            }

            let content = fs::read_to_string(&self.settings_path)
                .map_err(|e| CoreError::file_io(&self.settings_path, e))?;
            let mut settings = serde_json::from_str::<AlignSettings>(&content)?;

            if settings.version < SETTINGS_VERSION {
                info!(
                    "Migrating settings from version {} to {}",
                    settings.version, SETTINGS_VERSION
                );
                settings = migrate(settings);
            }

            settings.normalize();
            Ok(settings)
        })
    }

    /// Save settings to disk using atomic write (temp file + rename)
    pub fn save(&self, settings: &AlignSettings) -> CoreResult<AlignSettings> {
        self.with_lock(true, || {
            let mut normalized = settings.clone();
            normalized.normalize();

            let content = serde_json::to_string_pretty(&normalized)?;

            let dir = match self.settings_path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p,
                _ => Path::new("."),
            };
            let mut temp = tempfile::Builder::new()
                .prefix(".settings-")
                .suffix(".json.tmp")
                .tempfile_in(dir)
                .map_err(|e| CoreError::file_io(dir, e))?;
            temp.write_all(content.as_bytes())
                .map_err(|e| CoreError::file_io(temp.path(), e))?;
            temp.as_file()
                .sync_all()
                .map_err(|e| CoreError::file_io(temp.path(), e))?;
            temp.persist(&self.settings_path)
                .map_err(|e| CoreError::file_io(&self.settings_path, e.error))?;

            info!("Settings saved to {}", self.settings_path.display());
            Ok(normalized)
        })
    }

    /// Reset settings to defaults and delete the settings file
    pub fn reset(&self) -> CoreResult<AlignSettings> {
        self.with_lock(true, || {
            if self.settings_path.exists() {
                fs::remove_file(&self.settings_path)
                    .map_err(|e| CoreError::file_io(&self.settings_path, e))?;
                info!("Settings file deleted");
            }
            Ok(AlignSettings::default())
        })
    }
}

/// Migrate settings from an older schema version
fn migrate(mut settings: AlignSettings) -> AlignSettings {
    settings.version = SETTINGS_VERSION;
    settings
}
