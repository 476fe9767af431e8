//! WAV concatenation.
//!
//! Segments must share one format; their sample frames are copied verbatim
//! into a single output file. Nothing is resampled or remixed.

use super::format::{AudioError, AudioSegment, FormatDescriptor};
use hound::{SampleFormat, WavReader, WavWriter};
use log::debug;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Outcome of a successful concatenation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatenationResult {
    /// Final audio file
    pub path: PathBuf,
    /// Sum of the frame counts of all segments
    pub frames: u64,
    /// Format inherited from the first segment
    pub format: FormatDescriptor,
}

/// Probe and concatenate WAV files in the given order.
pub fn concatenate_files<P: AsRef<Path>>(
    paths: &[P],
    output_path: &Path,
) -> Result<ConcatenationResult, AudioError> {
    let segments = paths
        .iter()
        .map(AudioSegment::open)
        .collect::<Result<Vec<_>, _>>()?;
    concatenate(&segments, output_path)
}

/// Concatenate audio segments into `output_path`.
///
/// Every header is checked against the first segment before any sample is
/// written. Output goes to a temporary file next to `output_path` and is only
/// renamed into place once every segment has been copied, so a failure never
/// leaves a usable output file behind.
pub fn concatenate(
    segments: &[AudioSegment],
    output_path: &Path,
) -> Result<ConcatenationResult, AudioError> {
    let first = segments.first().ok_or(AudioError::EmptyInput)?;
    let format = first.format;

    for (index, segment) in segments.iter().enumerate().skip(1) {
        if let Some((field, expected, actual)) = format.mismatch(&segment.format) {
            return Err(AudioError::FormatMismatch {
                index,
                path: segment.path.clone(),
                field,
                expected,
                actual,
            });
        }
    }

    let out_dir = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&out_dir)?;

    let temp = tempfile::Builder::new()
        .prefix(".concat-")
        .suffix(".wav.part")
        .tempfile_in(&out_dir)?;

    let frames = write_segments(&temp, segments, format)?;

    // Dropping `temp` on any earlier error deletes the partial file.
    temp.persist(output_path).map_err(|e| AudioError::Io(e.error))?;

    debug!(
        "Concatenated {} segments ({} frames) into {}",
        segments.len(),
        frames,
        output_path.display()
    );

    Ok(ConcatenationResult {
        path: output_path.to_path_buf(),
        frames,
        format,
    })
}

fn write_segments(
    temp: &NamedTempFile,
    segments: &[AudioSegment],
    format: FormatDescriptor,
) -> Result<u64, AudioError> {
    let mut writer = WavWriter::new(BufWriter::new(temp.as_file()), format.into()).map_err(|source| {
        AudioError::Wav {
            path: temp.path().to_path_buf(),
            source,
        }
    })?;

    let mut frames = 0u64;
    for segment in segments {
        frames += copy_frames(&mut writer, segment)?;
    }

    writer.finalize().map_err(|source| AudioError::Wav {
        path: temp.path().to_path_buf(),
        source,
    })?;

    Ok(frames)
}

/// Append all samples of `segment` to `writer`, returning the frames copied.
fn copy_frames<W>(writer: &mut WavWriter<W>, segment: &AudioSegment) -> Result<u64, AudioError>
where
    W: std::io::Write + std::io::Seek,
{
    let wav_err = |source| AudioError::Wav {
        path: segment.path.clone(),
        source,
    };

    let reader: WavReader<BufReader<File>> = WavReader::open(&segment.path).map_err(wav_err)?;
    let channels = u64::from(reader.spec().channels.max(1));
    let mut samples = 0u64;

    match segment.format.sample_format {
        SampleFormat::Int => {
            for sample in reader.into_samples::<i32>() {
                writer.write_sample(sample.map_err(wav_err)?).map_err(wav_err)?;
                samples += 1;
            }
        }
        SampleFormat::Float => {
            for sample in reader.into_samples::<f32>() {
                writer.write_sample(sample.map_err(wav_err)?).map_err(wav_err)?;
                samples += 1;
            }
        }
    }

    Ok(samples / channels)
}
