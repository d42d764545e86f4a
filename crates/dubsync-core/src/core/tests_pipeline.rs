//! End-to-end pipeline scenarios.
//!
//! Clips are authored as 16-bit WAV fixtures and read through the
//! passthrough decoder, so no ffmpeg subprocess is involved.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use crate::core::align::{AlignOptions, AlignmentOrchestrator};
use crate::core::audio::pcm::{read_pcm_i16, write_pcm_i16};
use crate::core::audio::FitStrategy;
use crate::core::ffmpeg::{ClipDecoder, DecodedClip, PcmPassthroughDecoder};
use crate::core::subtitles::ParseMode;
use crate::core::{ChannelMode, CoreError, CoreResult, SampleRate};

const TWO_CUES: &str = "1\n00:00:01,000 --> 00:00:03,000\nFirst line\n\n\
                        2\n00:00:04,000 --> 00:00:05,000\nSecond line\n";

const THREE_CUES: &str = "1\n00:00:00,000 --> 00:00:01,000\nOne\n\n\
                          2\n00:00:01,000 --> 00:00:02,000\nTwo\n\n\
                          3\n00:00:02,000 --> 00:00:03,000\nThree\n";

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn srt(&self, content: &str) -> PathBuf {
        let path = self.path("episode.srt");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn clips_dir(&self) -> PathBuf {
        let dir = self.path("dubs");
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Mono clip of `frames` constant samples
    fn clip(&self, name: &str, rate: SampleRate, frames: usize, value: i16) -> PathBuf {
        let path = self.clips_dir().join(name);
        write_pcm_i16(&path, rate, 1, &vec![value; frames]).unwrap();
        path
    }
}

fn orchestrator(options: AlignOptions) -> AlignmentOrchestrator {
    AlignmentOrchestrator::new(Arc::new(PcmPassthroughDecoder), options)
}

fn no_fade(strategy: FitStrategy) -> AlignOptions {
    AlignOptions::new(strategy).with_fade_ms(0.0)
}

fn read_output(path: &Path) -> Vec<i16> {
    read_pcm_i16(path, ChannelMode::Preserve).unwrap().1
}

fn assert_all(samples: &[i16], expected: i16) {
    for (i, &s) in samples.iter().enumerate() {
        assert_eq!(s, expected, "frame {i}");
    }
}

#[tokio::test]
async fn paired_resample_places_clips_at_cue_times() {
    let fx = Fixture::new();
    let srt = fx.srt(TWO_CUES);
    let clips = vec![
        fx.clip("a.wav", 100, 50, i16::MAX),
        fx.clip("b.wav", 100, 150, 16384),
    ];
    let out = fx.path("out/aligned.wav");

    let report = orchestrator(no_fade(FitStrategy::Resample))
        .run_paired(&srt, &clips, &out)
        .await
        .unwrap();

    assert_eq!(report.frames, 500);
    assert_eq!(report.sample_rate, 100);
    assert_eq!(report.placed, vec![1, 2]);
    assert_eq!(report.warning_count, 0);

    let samples = read_output(&out);
    assert_eq!(samples.len(), 500);
    assert_all(&samples[..100], 0);
    assert_all(&samples[100..300], i16::MAX);
    assert_all(&samples[300..400], 0);
    assert_all(&samples[400..500], 16384);
}

#[tokio::test]
async fn paired_count_mismatch_writes_nothing() {
    let fx = Fixture::new();
    let srt = fx.srt(TWO_CUES);
    let clips = vec![
        fx.clip("a.wav", 100, 10, 1),
        fx.clip("b.wav", 100, 10, 1),
        fx.clip("c.wav", 100, 10, 1),
    ];
    let out = fx.path("aligned.wav");

    let err = orchestrator(no_fade(FitStrategy::Resample))
        .run_paired(&srt, &clips, &out)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("counts must match"));
    assert!(!out.exists());
}

#[tokio::test]
async fn directory_missing_clip_is_recovered() {
    let fx = Fixture::new();
    let srt = fx.srt(THREE_CUES);
    fx.clip("1.wav", 100, 100, 1000);
    fx.clip("line_3.WAV", 100, 100, 2000);
    let out = fx.path("aligned.wav");

    let report = orchestrator(no_fade(FitStrategy::PadTrim))
        .run_directory(&srt, &fx.clips_dir(), &out)
        .await
        .unwrap();

    assert_eq!(report.missing, vec![2]);
    assert_eq!(report.placed, vec![1, 3]);
    assert_eq!(report.warning_count, 1);

    let samples = read_output(&out);
    assert_eq!(samples.len(), 300);
    assert_all(&samples[..100], 1000);
    assert_all(&samples[100..200], 0);
    assert_all(&samples[200..300], 2000);
}

#[tokio::test]
async fn directory_without_any_clip_is_fatal() {
    let fx = Fixture::new();
    let srt = fx.srt(THREE_CUES);
    let dir = fx.clips_dir();
    std::fs::write(dir.join("notes.txt"), "nothing here").unwrap();
    let out = fx.path("aligned.wav");

    let result = orchestrator(no_fade(FitStrategy::PadTrim))
        .run_directory(&srt, &dir, &out)
        .await;

    assert!(matches!(result, Err(CoreError::NotFound(_))));
    assert!(!out.exists());
}

#[tokio::test]
async fn pad_trim_cuts_long_clips_and_pads_short_ones() {
    let fx = Fixture::new();
    let srt = fx.srt(TWO_CUES);
    fx.clip("01.wav", 100, 500, 300);
    fx.clip("clip_2.wav", 100, 40, 400);
    let out = fx.path("aligned.wav");

    orchestrator(no_fade(FitStrategy::PadTrim))
        .run_directory(&srt, &fx.clips_dir(), &out)
        .await
        .unwrap();

    let samples = read_output(&out);
    assert_all(&samples[100..300], 300);
    assert_all(&samples[300..400], 0);
    assert_all(&samples[400..440], 400);
    assert_all(&samples[440..500], 0);
}

#[tokio::test]
async fn overlapping_full_scale_clips_saturate() {
    let fx = Fixture::new();
    let srt = fx.srt(
        "1\n00:00:00,000 --> 00:00:01,000\nA\n\n\
         2\n00:00:00,000 --> 00:00:01,000\nB\n",
    );
    fx.clip("1.wav", 50, 50, i16::MIN);
    fx.clip("2.wav", 50, 50, i16::MIN);
    let out = fx.path("aligned.wav");

    orchestrator(no_fade(FitStrategy::PadTrim))
        .run_directory(&srt, &fx.clips_dir(), &out)
        .await
        .unwrap();

    assert_all(&read_output(&out), i16::MIN);
}

#[tokio::test]
async fn fades_silence_clip_boundaries() {
    let fx = Fixture::new();
    let srt = fx.srt("1\n00:00:01,000 --> 00:00:02,000\nHi\n");
    fx.clip("1.wav", 1000, 1000, 10000);
    let out = fx.path("aligned.wav");

    orchestrator(AlignOptions::new(FitStrategy::PadTrim).with_fade_ms(10.0))
        .run_directory(&srt, &fx.clips_dir(), &out)
        .await
        .unwrap();

    let samples = read_output(&out);
    assert_eq!(samples[1000], 0);
    assert_eq!(samples[1999], 0);
    assert_eq!(samples[1500], 10000);
    assert!(samples[1005] > 0 && samples[1005] < 10000);
}

#[tokio::test]
async fn stereo_clips_are_downmixed() {
    let fx = Fixture::new();
    let srt = fx.srt("1\n00:00:00,000 --> 00:00:01,000\nHi\n");
    let path = fx.clips_dir().join("1.wav");
    let interleaved: Vec<i16> = (0..20).flat_map(|_| [300i16, 100]).collect();
    write_pcm_i16(&path, 20, 2, &interleaved).unwrap();
    let out = fx.path("aligned.wav");

    let report = orchestrator(no_fade(FitStrategy::PadTrim))
        .run_directory(&srt, &fx.clips_dir(), &out)
        .await
        .unwrap();

    assert_eq!(report.channels, 1);
    assert_all(&read_output(&out), 200);
}

#[tokio::test]
async fn explicit_rate_mismatch_names_the_clip() {
    let fx = Fixture::new();
    let srt = fx.srt(TWO_CUES);
    fx.clip("1.wav", 100, 10, 1);
    fx.clip("2.wav", 100, 10, 1);
    let out = fx.path("aligned.wav");

    let err = orchestrator(no_fade(FitStrategy::PadTrim).with_sample_rate(Some(200)))
        .run_directory(&srt, &fx.clips_dir(), &out)
        .await
        .unwrap_err();

    match err {
        CoreError::Cue { source, .. } => {
            assert!(matches!(*source, CoreError::SampleRateMismatch { .. }));
        }
        other => panic!("unexpected: {other}"),
    }
    assert!(!out.exists());
}

#[tokio::test]
async fn strict_parse_error_is_fatal() {
    let fx = Fixture::new();
    let srt = fx.srt("intro\n00:00:00,000 --> 00:00:01,000\nHi\n");
    fx.clip("1.wav", 100, 10, 1);
    let out = fx.path("aligned.wav");

    let options = no_fade(FitStrategy::PadTrim).with_parse_mode(ParseMode::Strict);
    let result = orchestrator(options)
        .run_directory(&srt, &fx.clips_dir(), &out)
        .await;

    assert!(matches!(result, Err(CoreError::SubtitleParse { .. })));
    assert!(!out.exists());
}

#[tokio::test]
async fn converted_clips_are_persisted_by_index() {
    let fx = Fixture::new();
    let srt = fx.srt(TWO_CUES);
    fx.clip("0001.wav", 100, 10, 5);
    fx.clip("2.wav", 100, 10, 5);
    let keep = fx.path("converted");
    let out = fx.path("aligned.wav");

    let options = no_fade(FitStrategy::PadTrim).with_write_wav_dir(Some(keep.clone()));
    let report = orchestrator(options)
        .run_directory(&srt, &fx.clips_dir(), &out)
        .await
        .unwrap();

    assert_eq!(report.persist_failures, 0);
    assert!(keep.join("1.wav").exists());
    assert!(keep.join("2.wav").exists());
}

/// Fails for one file name, counts calls for the rest
struct FlakyDecoder {
    fail_on: &'static str,
    calls: AtomicUsize,
}

#[async_trait]
impl ClipDecoder for FlakyDecoder {
    async fn decode(
        &self,
        input: &Path,
        target_rate: Option<SampleRate>,
        channels: u16,
    ) -> CoreResult<DecodedClip> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(channels, 1);
        if input.file_name().is_some_and(|n| n == self.fail_on) {
            return Err(CoreError::ExternalTool {
                tool: "fake".to_string(),
                path: input.to_path_buf(),
                diagnostics: format!("cannot decode at {:?}", target_rate),
            });
        }
        Ok(DecodedClip::original(input))
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

#[tokio::test]
async fn decoder_failure_aborts_with_cue_context() {
    let fx = Fixture::new();
    let srt = fx.srt(THREE_CUES);
    fx.clip("1.wav", 100, 10, 1);
    fx.clip("2.wav", 100, 10, 1);
    fx.clip("3.wav", 100, 10, 1);
    let out = fx.path("aligned.wav");

    let decoder = Arc::new(FlakyDecoder {
        fail_on: "2.wav",
        calls: AtomicUsize::new(0),
    });
    let orchestrator = AlignmentOrchestrator::new(
        decoder.clone(),
        no_fade(FitStrategy::PadTrim).with_max_concurrent_decodes(1),
    );

    let err = orchestrator
        .run_directory(&srt, &fx.clips_dir(), &out)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Cue { index: 2, .. }));
    assert!(err.to_string().contains("cue 2"));
    assert!(decoder.calls.load(Ordering::SeqCst) >= 2);
    assert!(!out.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn output_is_independent_of_concurrency() {
    let fx = Fixture::new();
    let mut srt = String::new();
    for i in 0..12u32 {
        // Overlapping half-second cues every quarter second
        let start = i * 250;
        let end = start + 500;
        srt.push_str(&format!(
            "{}\n00:00:{:02},{:03} --> 00:00:{:02},{:03}\nLine\n\n",
            i + 1,
            start / 1000,
            start % 1000,
            end / 1000,
            end % 1000
        ));
        fx.clip(&format!("{}.wav", i + 1), 200, 90, (i as i16 + 1) * 1000);
    }
    let srt = fx.srt(&srt);

    let serial = fx.path("serial.wav");
    let parallel = fx.path("parallel.wav");
    orchestrator(AlignOptions::new(FitStrategy::Resample).with_max_concurrent_decodes(1))
        .run_directory(&srt, &fx.clips_dir(), &serial)
        .await
        .unwrap();
    orchestrator(AlignOptions::new(FitStrategy::Resample).with_max_concurrent_decodes(8))
        .run_directory(&srt, &fx.clips_dir(), &parallel)
        .await
        .unwrap();

    assert_eq!(read_output(&serial), read_output(&parallel));
}

/// Passthrough that holds each decode open for a while and records overlap
#[derive(Default)]
struct SlowDecoder {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl ClipDecoder for SlowDecoder {
    async fn decode(
        &self,
        input: &Path,
        _target_rate: Option<SampleRate>,
        _channels: u16,
    ) -> CoreResult<DecodedClip> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(DecodedClip::original(input))
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn decodes_overlap_up_to_the_configured_limit() {
    let fx = Fixture::new();
    let mut srt = String::new();
    for i in 0..8u32 {
        srt.push_str(&format!(
            "{}\n00:00:{:02},000 --> 00:00:{:02},500\nLine\n\n",
            i + 1,
            i,
            i
        ));
        fx.clip(&format!("{}.wav", i + 1), 100, 50, 1000);
    }
    let srt = fx.srt(&srt);
    let out = fx.path("overlap.wav");

    let decoder = Arc::new(SlowDecoder::default());
    let report = AlignmentOrchestrator::new(
        decoder.clone(),
        no_fade(FitStrategy::PadTrim)
            .with_sample_rate(Some(100))
            .with_max_concurrent_decodes(3),
    )
    .run_directory(&srt, &fx.clips_dir(), &out)
    .await
    .unwrap();

    assert_eq!(report.placed.len(), 8);
    let peak = decoder.peak.load(Ordering::SeqCst);
    assert!(peak > 1, "decodes never overlapped");
    assert!(peak <= 3, "limit exceeded: {peak}");
    assert_eq!(decoder.in_flight.load(Ordering::SeqCst), 0);
}
