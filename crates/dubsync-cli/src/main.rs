//! dubsync command line
//!
//! Thin shell over `dubsync_core`: argument parsing, logging, settings
//! merge, decoder selection and output formatting.

mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use dubsync_core::core::ffmpeg::{
    default_dub_output, detect_ffmpeg, ClipDecoder, DubMode, FFmpegError, FFmpegRunner,
    FfmpegDecoder, PcmPassthroughDecoder,
};
use dubsync_core::core::settings::{AlignSettings, SettingsManager};
use dubsync_core::{AlignmentOrchestrator, AlignmentReport};

#[derive(Parser, Debug)]
#[command(name = "dubsync", author, version, about = "Align per-cue dub clips to subtitle timings", long_about = None)]
struct Cli {
    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write daily-rolling logs into this directory
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Settings file to use instead of the per-user one
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a dub track from a folder of clips named by cue index
    Align {
        #[arg(long)]
        srt: PathBuf,
        /// Folder with clips named N.wav, 001.mp3, line_N.ogg, ...
        #[arg(long)]
        audio_dir: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
        #[command(flatten)]
        tuning: TuningArgs,
    },

    /// Build a dub track from exactly one clip per cue, in cue order
    Pair {
        #[arg(long)]
        srt: PathBuf,
        #[arg(long = "clip", value_name = "FILE", required = true, num_args = 1..)]
        clips: Vec<PathBuf>,
        #[arg(short, long)]
        out: PathBuf,
        #[command(flatten)]
        tuning: TuningArgs,
    },

    /// Put an aligned track into a video, replacing or mixing its audio
    Dub {
        #[arg(long)]
        video: PathBuf,
        /// Aligned track; built first when missing and --srt/--audio-dir are given
        #[arg(long)]
        track: PathBuf,
        /// Defaults to <video>_dubbed.<ext>
        #[arg(short, long)]
        out: Option<PathBuf>,
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Original audio level in mix mode, 0-100 percent
        #[arg(long, value_name = "PCT")]
        bg_volume: Option<f64>,
        #[arg(long, requires = "audio_dir")]
        srt: Option<PathBuf>,
        #[arg(long, requires = "srt")]
        audio_dir: Option<PathBuf>,
        #[command(flatten)]
        tuning: TuningArgs,
    },

    /// Inspect or create the settings file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective settings as JSON
    Show,
    /// Write a settings file with defaults
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Print the settings file location
    Path,
}

/// Per-run overrides of the persisted settings
#[derive(Args, Debug, Clone, Default)]
struct TuningArgs {
    /// Output sample rate (default: rate of the first clip)
    #[arg(long = "sr", value_name = "HZ")]
    sample_rate: Option<u32>,

    /// Fade in/out length, 0 disables
    #[arg(long, value_name = "MS")]
    fade_ms: Option<f64>,

    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Reject subtitle blocks whose index line is not a number
    #[arg(long)]
    strict: bool,

    /// Keep each converted clip as <DIR>/<index>.wav
    #[arg(long, value_name = "DIR")]
    write_wav_dir: Option<PathBuf>,

    /// Concurrent decodes (0 = one per CPU core)
    #[arg(short, long)]
    jobs: Option<u32>,

    /// Path to the ffmpeg binary
    #[arg(long, value_name = "PATH")]
    ffmpeg: Option<PathBuf>,

    /// Read only 16-bit PCM WAV clips, never run ffmpeg
    #[arg(long)]
    no_ffmpeg: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum StrategyArg {
    PadTrim,
    Resample,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ModeArg {
    Replace,
    Mix,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Aligned track {0} does not exist; pass --srt and --audio-dir to build it first")]
    MissingTrack(PathBuf),

    #[error("Background volume must be between 0 and 100 percent, got {0}")]
    BackgroundVolume(f64),

    #[error("Settings file already exists at {0} (use --force to overwrite)")]
    ConfigExists(PathBuf),

    #[error("No settings location available; pass --config")]
    NoConfigLocation,
}

// =============================================================================
// Settings merge
// =============================================================================

/// Applies command line overrides on top of persisted settings
fn apply_tuning(mut settings: AlignSettings, tuning: &TuningArgs) -> AlignSettings {
    if let Some(rate) = tuning.sample_rate {
        settings.sample_rate = Some(rate);
    }
    if let Some(fade_ms) = tuning.fade_ms {
        settings.fade_ms = fade_ms;
    }
    if let Some(strategy) = tuning.strategy {
        settings.strategy = match strategy {
            StrategyArg::PadTrim => "pad_trim",
            StrategyArg::Resample => "resample",
        }
        .to_string();
    }
    if tuning.strict {
        settings.parse_mode = "strict".to_string();
    }
    if let Some(dir) = &tuning.write_wav_dir {
        settings.write_wav_dir = Some(dir.clone());
    }
    if let Some(jobs) = tuning.jobs {
        settings.max_concurrent_decodes = jobs;
    }
    if let Some(path) = &tuning.ffmpeg {
        settings.ffmpeg_path = Some(path.clone());
    }
    settings.normalize();
    settings
}

/// Resolves the dub mode, with `bg_volume` given in percent
fn resolve_dub_mode(
    settings: &AlignSettings,
    mode: Option<ModeArg>,
    bg_volume: Option<f64>,
) -> Result<DubMode, CliError> {
    let background_volume = match bg_volume {
        Some(pct) if !(0.0..=100.0).contains(&pct) => return Err(CliError::BackgroundVolume(pct)),
        Some(pct) => pct / 100.0,
        None => settings.dub.background_volume,
    };
    Ok(match mode {
        Some(ModeArg::Replace) => DubMode::Replace,
        Some(ModeArg::Mix) => DubMode::Mix { background_volume },
        None => match settings.dub.dub_mode() {
            DubMode::Replace => DubMode::Replace,
            DubMode::Mix { .. } => DubMode::Mix { background_volume },
        },
    })
}

fn settings_manager(config: Option<&Path>) -> Option<SettingsManager> {
    match config {
        Some(path) => Some(SettingsManager::with_file(path.to_path_buf())),
        None => SettingsManager::at_default_location().ok(),
    }
}

// =============================================================================
// Decoder selection
// =============================================================================

fn ffmpeg_runner(settings: &AlignSettings) -> Result<FFmpegRunner, FFmpegError> {
    let info = detect_ffmpeg(settings.ffmpeg_path.as_deref())?;
    info!("Using FFmpeg {} at {}", info.version, info.ffmpeg_path.display());
    Ok(FFmpegRunner::new(info).with_timeout(settings.decoder_timeout()))
}

/// FFmpeg when available; WAV-only passthrough when not found or disabled
fn build_decoder(settings: &AlignSettings, no_ffmpeg: bool) -> anyhow::Result<Arc<dyn ClipDecoder>> {
    if no_ffmpeg {
        return Ok(Arc::new(PcmPassthroughDecoder));
    }
    match ffmpeg_runner(settings) {
        Ok(runner) => Ok(Arc::new(FfmpegDecoder::new(runner))),
        Err(FFmpegError::NotFound) if settings.ffmpeg_path.is_none() => {
            warn!("FFmpeg not found; only 16-bit PCM WAV clips can be read");
            Ok(Arc::new(PcmPassthroughDecoder))
        }
        Err(e) => Err(e).context("FFmpeg is not usable"),
    }
}

// =============================================================================
// Commands
// =============================================================================

fn print_report(report: &AlignmentReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!("{}", report.summary());
    if !report.missing.is_empty() {
        let list: Vec<String> = report.missing.iter().map(u32::to_string).collect();
        println!("Missing clips for cues: {}", list.join(", "));
    }
    if !report.out_of_range.is_empty() {
        let list: Vec<String> = report.out_of_range.iter().map(u32::to_string).collect();
        println!("Skipped (beyond timeline): {}", list.join(", "));
    }
    Ok(())
}

async fn run_align(
    settings: &AlignSettings,
    tuning: &TuningArgs,
    srt: &Path,
    audio_dir: &Path,
    out: &Path,
) -> anyhow::Result<AlignmentReport> {
    let decoder = build_decoder(settings, tuning.no_ffmpeg)?;
    let orchestrator = AlignmentOrchestrator::new(decoder, settings.to_align_options());
    orchestrator
        .run_directory(srt, audio_dir, out)
        .await
        .with_context(|| format!("Alignment of {} failed", srt.display()))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let manager = settings_manager(cli.config.as_deref());
    let stored = manager
        .as_ref()
        .map(SettingsManager::load)
        .unwrap_or_default();

    match cli.command {
        Commands::Align {
            srt,
            audio_dir,
            out,
            tuning,
        } => {
            let settings = apply_tuning(stored, &tuning);
            let report = run_align(&settings, &tuning, &srt, &audio_dir, &out).await?;
            print_report(&report, tuning.json)
        }

        Commands::Pair {
            srt,
            clips,
            out,
            tuning,
        } => {
            let settings = apply_tuning(stored, &tuning);
            let decoder = build_decoder(&settings, tuning.no_ffmpeg)?;
            let orchestrator = AlignmentOrchestrator::new(decoder, settings.to_align_options());
            let report = orchestrator
                .run_paired(&srt, &clips, &out)
                .await
                .with_context(|| format!("Paired alignment of {} failed", srt.display()))?;
            print_report(&report, tuning.json)
        }

        Commands::Dub {
            video,
            track,
            out,
            mode,
            bg_volume,
            srt,
            audio_dir,
            tuning,
        } => {
            let settings = apply_tuning(stored, &tuning);
            let mode = resolve_dub_mode(&settings, mode, bg_volume)?;

            if !track.exists() {
                match (srt.as_deref(), audio_dir.as_deref()) {
                    (Some(srt), Some(audio_dir)) => {
                        let report = run_align(&settings, &tuning, srt, audio_dir, &track).await?;
                        print_report(&report, tuning.json)?;
                    }
                    _ => return Err(CliError::MissingTrack(track).into()),
                }
            }

            let runner = ffmpeg_runner(&settings).context("Muxing requires FFmpeg")?;
            let out = out.unwrap_or_else(|| default_dub_output(&video));
            runner
                .mux_dub(&video, &track, &out, mode)
                .await
                .with_context(|| format!("Muxing into {} failed", out.display()))?;
            println!("Dubbed video written: {}", out.display());
            Ok(())
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                println!("{}", serde_json::to_string_pretty(&stored)?);
                Ok(())
            }
            ConfigCommands::Init { force } => {
                let manager = manager.ok_or(CliError::NoConfigLocation)?;
                if manager.settings_path().exists() && !force {
                    return Err(CliError::ConfigExists(manager.settings_path().to_path_buf()).into());
                }
                manager.save(&AlignSettings::default())?;
                println!("Wrote {}", manager.settings_path().display());
                Ok(())
            }
            ConfigCommands::Path => {
                let manager = manager.ok_or(CliError::NoConfigLocation)?;
                println!("{}", manager.settings_path().display());
                Ok(())
            }
        },
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match logging::init_logging(cli.verbose, cli.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
