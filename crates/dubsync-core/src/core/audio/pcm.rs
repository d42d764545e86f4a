//! PCM Container I/O
//!
//! Reads and writes uncompressed 16-bit PCM WAV files and converts between
//! fixed-point samples and normalized [`AudioBuffer`]s.
//!
//! The fixed-point mapping is asymmetric: positive values scale by 32767,
//! negative values by 32768, so both `1.0` and `-1.0` are exactly
//! representable.

use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use super::AudioBuffer;
use crate::core::{ChannelMode, CoreError, CoreResult, SampleRate};

/// Only bit depth accepted on read and produced on write
pub const PCM_BITS_PER_SAMPLE: u16 = 16;

/// Header facts of a PCM file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PcmInfo {
    pub sample_rate: SampleRate,
    pub channels: u16,
    pub frames: u32,
}

// =============================================================================
// Sample Conversion
// =============================================================================

/// Normalized float to 16-bit, saturating out-of-range input
pub fn encode_sample(value: f32) -> i16 {
    if value.is_nan() {
        return 0;
    }
    let scaled = if value >= 0.0 {
        value as f64 * 32767.0
    } else {
        value as f64 * 32768.0
    };
    scaled.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

/// 16-bit to normalized float
pub fn decode_sample(value: i16) -> f32 {
    if value >= 0 {
        value as f32 / 32767.0
    } else {
        value as f32 / 32768.0
    }
}

/// Averages interleaved frames into one channel, truncating toward zero
pub fn downmix_to_mono(samples: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

// =============================================================================
// Reading
// =============================================================================

fn open_reader(path: &Path) -> CoreResult<hound::WavReader<std::io::BufReader<std::fs::File>>> {
    let reader = hound::WavReader::open(path).map_err(|e| CoreError::from_wav(path, e))?;
    let spec = reader.spec();

    if spec.sample_format != hound::SampleFormat::Int {
        return Err(CoreError::UnsupportedFormat(format!(
            "{}: floating-point samples, expected 16-bit PCM",
            path.display()
        )));
    }
    if spec.bits_per_sample != PCM_BITS_PER_SAMPLE {
        return Err(CoreError::UnsupportedFormat(format!(
            "{}: {}-bit samples, expected 16-bit PCM",
            path.display(),
            spec.bits_per_sample
        )));
    }

    Ok(reader)
}

/// Reads the header of a 16-bit PCM file without loading samples
pub fn probe_pcm(path: &Path) -> CoreResult<PcmInfo> {
    let reader = open_reader(path)?;
    let spec = reader.spec();
    Ok(PcmInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        frames: reader.duration(),
    })
}

/// Loads raw interleaved 16-bit samples, optionally downmixed to mono
pub fn read_pcm_i16(path: &Path, mode: ChannelMode) -> CoreResult<(PcmInfo, Vec<i16>)> {
    let mut reader = open_reader(path)?;
    let spec = reader.spec();

    let samples = reader
        .samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CoreError::from_wav(path, e))?;

    let channels = spec.channels as usize;
    let (channels, samples) = match mode {
        ChannelMode::Mono if channels > 1 => (1, downmix_to_mono(&samples, channels)),
        _ => (channels, samples),
    };

    let info = PcmInfo {
        sample_rate: spec.sample_rate,
        channels: channels as u16,
        frames: (samples.len() / channels.max(1)) as u32,
    };
    Ok((info, samples))
}

/// Loads a 16-bit PCM file as a normalized buffer
pub fn read_pcm(path: &Path, mode: ChannelMode) -> CoreResult<AudioBuffer> {
    let (info, samples) = read_pcm_i16(path, mode)?;
    let normalized = samples.into_iter().map(decode_sample).collect();
    AudioBuffer::new(info.sample_rate, info.channels as usize, normalized)
}

// =============================================================================
// Writing
// =============================================================================

/// 16-bit integer container spec; rejects zero or oversized channel counts
pub fn pcm_spec(sample_rate: SampleRate, channels: usize) -> CoreResult<hound::WavSpec> {
    let channels = u16::try_from(channels)
        .ok()
        .filter(|&c| c > 0)
        .ok_or_else(|| CoreError::ValidationError(format!("Invalid channel count: {}", channels)))?;
    Ok(hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: PCM_BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    })
}

/// Writes interleaved 16-bit samples to any seekable sink.
///
/// Build `spec` with [`pcm_spec`] so layout errors surface before any
/// bytes are written.
pub fn write_pcm_i16_to<W: Write + Seek>(
    sink: W,
    spec: hound::WavSpec,
    samples: &[i16],
) -> Result<(), hound::Error> {
    let mut writer = hound::WavWriter::new(sink, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()
}

/// Writes interleaved 16-bit samples to `path`
pub fn write_pcm_i16(
    path: &Path,
    sample_rate: SampleRate,
    channels: usize,
    samples: &[i16],
) -> CoreResult<()> {
    let spec = pcm_spec(sample_rate, channels)?;
    let file = std::fs::File::create(path).map_err(|e| CoreError::file_io(path, e))?;
    write_pcm_i16_to(BufWriter::new(file), spec, samples)
        .map_err(|e| CoreError::from_wav(path, e))
}

/// Encodes a normalized buffer and writes it to `path`
pub fn write_pcm(path: &Path, buffer: &AudioBuffer) -> CoreResult<()> {
    let encoded: Vec<i16> = buffer.samples().iter().map(|&s| encode_sample(s)).collect();
    write_pcm_i16(path, buffer.sample_rate(), buffer.channels(), &encoded)
}

// =============================================================================
// Tests
// =============================================================================
