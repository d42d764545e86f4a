//! Alignment Orchestrator
//!
//! Drives parse -> locate -> decode -> fit -> fade -> accumulate -> write.
//!
//! Per-cue work up to the faded clip runs concurrently on a [`DecodePool`].
//! The timeline itself has a single writer: the driving task places each
//! clip as its job completes. Sums are integer additions, so the output does
//! not depend on completion order.
//!
//! File reads, sample math and the final write run on tokio's blocking
//! pool; async worker threads only await decoders and join results.

use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::{AlignOptions, AlignmentReport, DecodePool};
use crate::core::audio::fit::ensure_uniform_channels;
use crate::core::audio::pcm::{pcm_spec, probe_pcm, read_pcm, write_pcm_i16_to};
use crate::core::audio::{AudioBuffer, DurationFitter, FadeShaper, Placement, TimelineAccumulator};
use crate::core::clips::ClipLocator;
use crate::core::ffmpeg::ClipDecoder;
use crate::core::subtitles::{load_srt, SubtitleInterval};
use crate::core::{ms_to_frames, ChannelMode, CoreError, CoreResult, CueIndex, SampleRate, TimeMs};

/// File-based runs always produce a mono track
const OUTPUT_CHANNELS: u16 = 1;

// =============================================================================
// Per-cue shaping
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct ClipShaper {
    fitter: DurationFitter,
    fade: FadeShaper,
}

impl ClipShaper {
    fn from_options(options: &AlignOptions) -> Self {
        Self {
            fitter: DurationFitter::new(options.strategy),
            fade: FadeShaper::new(options.fade_ms),
        }
    }

    /// Fits `clip` to the cue's duration and applies the boundary fades
    fn shape(&self, clip: &AudioBuffer, interval: &SubtitleInterval) -> CoreResult<AudioBuffer> {
        let target = ms_to_frames(interval.duration_ms(), clip.sample_rate()).max(1);
        let mut fitted = self.fitter.fit_to_frames(clip, target)?;
        self.fade.apply(&mut fitted);
        Ok(fitted)
    }
}

/// Runs `f` on the blocking pool
async fn run_blocking<T, F>(what: &str, f: F) -> CoreResult<T>
where
    F: FnOnce() -> CoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CoreError::Internal(format!("{} task failed: {}", what, e)))?
}

// =============================================================================
// In-memory alignment
// =============================================================================

/// Aligns pre-decoded segments, paired 1:1 with `intervals` in order.
///
/// Segments may be mono or multi-channel but must all share one channel
/// count and carry `sample_rate`. The result spans `[0, ceil(max_end))`.
pub fn align_segments(
    intervals: &[SubtitleInterval],
    segments: &[AudioBuffer],
    sample_rate: SampleRate,
    options: &AlignOptions,
) -> CoreResult<AudioBuffer> {
    if sample_rate == 0 {
        return Err(CoreError::ValidationError(
            "Sample rate must be positive".to_string(),
        ));
    }
    if intervals.len() != segments.len() {
        return Err(CoreError::CountMismatch {
            cues: intervals.len(),
            clips: segments.len(),
        });
    }
    if intervals.is_empty() {
        return AudioBuffer::silent(sample_rate, 1, 0);
    }

    let channels = ensure_uniform_channels(segments)?;
    if let Some(odd) = segments.iter().find(|s| s.sample_rate() != sample_rate) {
        return Err(CoreError::ValidationError(format!(
            "Segment rate {} Hz does not match requested {} Hz",
            odd.sample_rate(),
            sample_rate
        )));
    }

    let shaper = ClipShaper::from_options(options);
    let mut timeline = TimelineAccumulator::for_intervals(sample_rate, channels, intervals)?;

    for (interval, segment) in intervals.iter().zip(segments) {
        let shaped = shaper
            .shape(segment, interval)
            .map_err(|e| e.for_cue(interval.index))?;
        let placement = timeline.place_at(&shaped, interval.start_ms())?;
        if placement.is_out_of_range() {
            warn!("Segment for cue {} starts beyond the timeline, skipping", interval.index);
        }
    }

    Ok(timeline.into_audio_buffer())
}

// =============================================================================
// File-based runs
// =============================================================================

struct CueJob {
    interval: SubtitleInterval,
    source: PathBuf,
}

struct PreparedClip {
    order: usize,
    index: CueIndex,
    start_ms: TimeMs,
    clip: AudioBuffer,
    persist_failed: bool,
}

/// Builds dub tracks from clip files using an injected decoder
pub struct AlignmentOrchestrator {
    decoder: Arc<dyn ClipDecoder>,
    options: AlignOptions,
}

impl AlignmentOrchestrator {
    pub fn new(decoder: Arc<dyn ClipDecoder>, options: AlignOptions) -> Self {
        Self { decoder, options }
    }

    pub fn options(&self) -> &AlignOptions {
        &self.options
    }

    /// Aligns the clips found in `audio_dir` by cue-index file names.
    ///
    /// Cues without a clip are skipped with a warning and stay silent.
    /// Fails if no cue has a clip at all.
    pub async fn run_directory(
        &self,
        srt_path: &Path,
        audio_dir: &Path,
        output: &Path,
    ) -> CoreResult<AlignmentReport> {
        let intervals = self.load_intervals(srt_path).await?;
        let dir = audio_dir.to_path_buf();
        let locator = run_blocking("Clip scan", move || ClipLocator::scan(&dir)).await?;

        let mut jobs = Vec::new();
        let mut missing = Vec::new();
        for interval in &intervals {
            match locator.locate(interval.index) {
                Some(source) => jobs.push(CueJob {
                    interval: interval.clone(),
                    source,
                }),
                None => {
                    warn!("Missing clip for cue {}, skipping", interval.index);
                    missing.push(interval.index);
                }
            }
        }

        if jobs.is_empty() {
            return Err(CoreError::NotFound(format!(
                "No matching audio clips found for any cue in {}",
                audio_dir.display()
            )));
        }

        info!(
            cues = intervals.len(),
            clips = jobs.len(),
            decoder = self.decoder.name(),
            "Aligning clips from {}",
            audio_dir.display()
        );
        self.assemble(&intervals, jobs, missing, output).await
    }

    /// Aligns exactly one clip per cue, in cue order.
    ///
    /// The counts are checked before anything is decoded or written.
    pub async fn run_paired(
        &self,
        srt_path: &Path,
        clips: &[PathBuf],
        output: &Path,
    ) -> CoreResult<AlignmentReport> {
        let intervals = self.load_intervals(srt_path).await?;
        if intervals.len() != clips.len() {
            return Err(CoreError::CountMismatch {
                cues: intervals.len(),
                clips: clips.len(),
            });
        }

        let jobs = intervals
            .iter()
            .zip(clips)
            .map(|(interval, source)| CueJob {
                interval: interval.clone(),
                source: source.clone(),
            })
            .collect();

        info!(cues = intervals.len(), decoder = self.decoder.name(), "Aligning paired clips");
        self.assemble(&intervals, jobs, Vec::new(), output).await
    }

    async fn load_intervals(&self, srt_path: &Path) -> CoreResult<Vec<SubtitleInterval>> {
        let path = srt_path.to_path_buf();
        let mode = self.options.parse_mode;
        run_blocking("Subtitle load", move || load_srt(&path, mode)).await
    }

    /// Explicit rate, else the rate of the first clip decoded as-is
    async fn resolve_sample_rate(&self, first: &CueJob) -> CoreResult<SampleRate> {
        if let Some(rate) = self.options.sample_rate {
            return Ok(rate);
        }

        let index = first.interval.index;
        let decoded = self
            .decoder
            .decode(&first.source, None, OUTPUT_CHANNELS)
            .await
            .map_err(|e| e.for_cue(index))?;
        // `decoded` moves along so a temp conversion outlives the probe
        let info = run_blocking("Clip probe", move || probe_pcm(decoded.path()))
            .await
            .map_err(|e| e.for_cue(index))?;

        info!(
            "Using sample rate {} Hz from {}",
            info.sample_rate,
            first.source.display()
        );
        Ok(info.sample_rate)
    }

    /// Creates the persist directory; a failure only disables persistence
    async fn prepare_persist_dir(&self) -> CoreResult<Option<PathBuf>> {
        let Some(dir) = &self.options.write_wav_dir else {
            return Ok(None);
        };
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| CoreError::file_io(dir, e))?;
        Ok(Some(dir.clone()))
    }

    async fn assemble(
        &self,
        intervals: &[SubtitleInterval],
        jobs: Vec<CueJob>,
        missing: Vec<CueIndex>,
        output: &Path,
    ) -> CoreResult<AlignmentReport> {
        let first = jobs
            .first()
            .ok_or_else(|| CoreError::NotFound("No clips to align".to_string()))?;
        let sample_rate = self.resolve_sample_rate(first).await?;
        let mut timeline =
            TimelineAccumulator::for_intervals(sample_rate, OUTPUT_CHANNELS as usize, intervals)?;

        let mut persist_failures = 0;
        let persist_dir = match self.prepare_persist_dir().await {
            Ok(dir) => dir,
            Err(e) => {
                warn!("Converted clips will not be kept: {}", e);
                persist_failures += 1;
                None
            }
        };

        let shaper = ClipShaper::from_options(&self.options);
        let pool = DecodePool::new(self.options.max_concurrent_decodes);
        debug!(limit = pool.limit(), "Starting clip jobs");

        let mut tasks = JoinSet::new();
        for (order, job) in jobs.into_iter().enumerate() {
            let decoder = self.decoder.clone();
            let persist_dir = persist_dir.clone();
            pool.spawn(&mut tasks, async move {
                let index = job.interval.index;
                prepare_clip(decoder, job, order, sample_rate, shaper, persist_dir)
                    .await
                    .map_err(|e| e.for_cue(index))
            });
        }

        // Single writer: only this loop touches the timeline. Returning
        // early drops `tasks`, which aborts the remaining jobs.
        let mut placed = Vec::new();
        let mut out_of_range = Vec::new();
        let mut truncated = 0;
        while let Some(joined) = tasks.join_next().await {
            let prepared = joined
                .map_err(|e| CoreError::Internal(format!("Clip task failed: {}", e)))??;
            if prepared.persist_failed {
                persist_failures += 1;
            }

            match timeline.place_at(&prepared.clip, prepared.start_ms)? {
                Placement::OutOfRange { start_frame } => {
                    warn!(
                        "Clip for cue {} starts at frame {} beyond the timeline, skipping",
                        prepared.index, start_frame
                    );
                    out_of_range.push((prepared.order, prepared.index));
                }
                Placement::Truncated { dropped, .. } => {
                    debug!(cue = prepared.index, dropped, "Clip tail cut at timeline end");
                    truncated += 1;
                    placed.push((prepared.order, prepared.index));
                }
                Placement::Placed { .. } => placed.push((prepared.order, prepared.index)),
            }
        }
        placed.sort_unstable();
        out_of_range.sort_unstable();

        let channels = timeline.channels();
        let frames = timeline.frame_count();
        let duration_sec = timeline.duration_sec();
        let samples = timeline.finalize();
        let target = output.to_path_buf();
        run_blocking("Track write", move || {
            write_track_atomic(&target, sample_rate, channels, &samples)
        })
        .await?;

        if !missing.is_empty() {
            info!("{} cues had no matching clip files", missing.len());
        }

        let warning_count = missing.len() + out_of_range.len() + persist_failures;
        let report = AlignmentReport {
            output_path: output.to_path_buf(),
            sample_rate,
            channels,
            frames,
            duration_sec,
            strategy: self.options.strategy,
            placed: placed.into_iter().map(|(_, index)| index).collect(),
            missing,
            out_of_range: out_of_range.into_iter().map(|(_, index)| index).collect(),
            truncated,
            persist_failures,
            warning_count,
        };
        info!("{}", report.summary());
        Ok(report)
    }
}

/// Decodes one clip on the pool, then reads, fits and fades it off the
/// async threads.
async fn prepare_clip(
    decoder: Arc<dyn ClipDecoder>,
    job: CueJob,
    order: usize,
    sample_rate: SampleRate,
    shaper: ClipShaper,
    persist_dir: Option<PathBuf>,
) -> CoreResult<PreparedClip> {
    let CueJob { interval, source } = job;

    let decoded = decoder
        .decode(&source, Some(sample_rate), OUTPUT_CHANNELS)
        .await?;

    let persist_failed = match &persist_dir {
        Some(dir) => !persist_clip(decoded.path(), dir, interval.index).await,
        None => false,
    };

    run_blocking("Clip shaping", move || {
        let clip = read_pcm(decoded.path(), ChannelMode::Mono)?;
        // Temp conversions are removed as soon as the samples are in memory
        drop(decoded);

        if clip.sample_rate() != sample_rate {
            return Err(CoreError::SampleRateMismatch {
                path: source,
                expected: sample_rate,
                found: clip.sample_rate(),
            });
        }

        let shaped = shaper.shape(&clip, &interval)?;
        debug!(
            cue = interval.index,
            source_frames = clip.frame_count(),
            fitted_frames = shaped.frame_count(),
            "Prepared clip {}",
            source.display()
        );

        Ok(PreparedClip {
            order,
            index: interval.index,
            start_ms: interval.start_ms(),
            clip: shaped,
            persist_failed,
        })
    })
    .await
}

/// Copies a converted clip to `dir/<index>.wav`; returns false on failure
async fn persist_clip(decoded: &Path, dir: &Path, index: CueIndex) -> bool {
    let target = dir.join(format!("{}.wav", index));
    match tokio::fs::copy(decoded, &target).await {
        Ok(_) => true,
        Err(e) => {
            warn!(
                "Could not write converted WAV for cue {} to {}: {}",
                index,
                target.display(),
                e
            );
            false
        }
    }
}

/// Writes the finished track next to `path` and renames it into place
fn write_track_atomic(
    path: &Path,
    sample_rate: SampleRate,
    channels: usize,
    samples: &[i16],
) -> CoreResult<()> {
    let spec = pcm_spec(sample_rate, channels)?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| CoreError::file_io(parent, e))?;

    let mut temp = tempfile::Builder::new()
        .prefix(".dubsync-")
        .suffix(".wav.tmp")
        .tempfile_in(parent)
        .map_err(|e| CoreError::file_io(parent, e))?;

    write_pcm_i16_to(BufWriter::new(temp.as_file_mut()), spec, samples)
        .map_err(|e| CoreError::from_wav(path, e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| CoreError::file_io(path, e))?;
    temp.persist(path)
        .map_err(|e| CoreError::file_io(path, e.error))?;

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
