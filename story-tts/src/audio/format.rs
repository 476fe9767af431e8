//! WAV format descriptors and segment probing.

use hound::{SampleFormat, WavReader};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Audio assembly errors.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("No audio segments to concatenate")]
    EmptyInput,

    #[error(
        "Incompatible WAV format for segment {index} ({}): {field} is {actual}, expected {expected}",
        .path.display()
    )]
    FormatMismatch {
        index: usize,
        path: PathBuf,
        field: FormatField,
        expected: String,
        actual: String,
    },

    #[error("Failed to read WAV {}: {source}", .path.display())]
    Wav {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The descriptor field that disagreed between two segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatField {
    Channels,
    SampleWidth,
    FrameRate,
    SampleFormat,
}

impl fmt::Display for FormatField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormatField::Channels => "channel count",
            FormatField::SampleWidth => "sample width",
            FormatField::FrameRate => "frame rate",
            FormatField::SampleFormat => "sample format",
        };
        f.write_str(name)
    }
}

/// Channel count, sample width and frame rate of a WAV stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatDescriptor {
    pub channels: u16,
    /// Bytes per sample
    pub sample_width: u16,
    /// Frames per second
    pub frame_rate: u32,
    pub sample_format: SampleFormat,
}

impl FormatDescriptor {
    /// Compare against `other` field by field, returning the first mismatch
    /// as `(field, expected, actual)` with `self` as the expected side.
    pub fn mismatch(&self, other: &FormatDescriptor) -> Option<(FormatField, String, String)> {
        if self.channels != other.channels {
            return Some((
                FormatField::Channels,
                self.channels.to_string(),
                other.channels.to_string(),
            ));
        }
        if self.sample_width != other.sample_width {
            return Some((
                FormatField::SampleWidth,
                format!("{} bytes", self.sample_width),
                format!("{} bytes", other.sample_width),
            ));
        }
        if self.frame_rate != other.frame_rate {
            return Some((
                FormatField::FrameRate,
                format!("{} Hz", self.frame_rate),
                format!("{} Hz", other.frame_rate),
            ));
        }
        if self.sample_format != other.sample_format {
            return Some((
                FormatField::SampleFormat,
                format!("{:?}", self.sample_format),
                format!("{:?}", other.sample_format),
            ));
        }
        None
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.sample_width * 8
    }
}

impl From<hound::WavSpec> for FormatDescriptor {
    fn from(spec: hound::WavSpec) -> Self {
        Self {
            channels: spec.channels,
            sample_width: spec.bits_per_sample.div_ceil(8),
            frame_rate: spec.sample_rate,
            sample_format: spec.sample_format,
        }
    }
}

impl From<FormatDescriptor> for hound::WavSpec {
    fn from(format: FormatDescriptor) -> Self {
        hound::WavSpec {
            channels: format.channels,
            sample_rate: format.frame_rate,
            bits_per_sample: format.bits_per_sample(),
            sample_format: format.sample_format,
        }
    }
}

/// A WAV file on disk together with its probed header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSegment {
    pub path: PathBuf,
    pub format: FormatDescriptor,
    /// Number of sample frames
    pub frames: u64,
}

impl AudioSegment {
    /// Probe a WAV file header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AudioError> {
        let path = path.as_ref();
        let reader = WavReader::open(path).map_err(|source| AudioError::Wav {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            format: reader.spec().into(),
            frames: u64::from(reader.duration()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};
    use tempfile::TempDir;

    fn descriptor(channels: u16, sample_width: u16, frame_rate: u32) -> FormatDescriptor {
        FormatDescriptor {
            channels,
            sample_width,
            frame_rate,
            sample_format: SampleFormat::Int,
        }
    }

    #[test]
    fn test_mismatch_none_for_equal() {
        let a = descriptor(1, 2, 24000);
        assert!(a.mismatch(&a).is_none());
    }

    #[test]
    fn test_mismatch_reports_first_field() {
        let a = descriptor(1, 2, 24000);
        let (field, expected, actual) = a.mismatch(&descriptor(1, 2, 22050)).unwrap();
        assert_eq!(field, FormatField::FrameRate);
        assert_eq!(expected, "24000 Hz");
        assert_eq!(actual, "22050 Hz");

        let (field, _, _) = a.mismatch(&descriptor(2, 4, 22050)).unwrap();
        assert_eq!(field, FormatField::Channels);
    }

    #[test]
    fn test_spec_round_trip() {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 24,
            sample_format: SampleFormat::Int,
        };
        let format = FormatDescriptor::from(spec);
        assert_eq!(format.sample_width, 3);
        assert_eq!(WavSpec::from(format), spec);
    }

    #[test]
    fn test_open_probes_header() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("probe.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for i in 0..20 {
            writer.write_sample(i as i16).unwrap();
        }
        writer.finalize().unwrap();

        let segment = AudioSegment::open(&path).unwrap();
        assert_eq!(segment.frames, 10);
        assert_eq!(segment.format, descriptor(2, 2, 16000));
    }

    #[test]
    fn test_open_missing_file() {
        let err = AudioSegment::open("/nonexistent/segment.wav").unwrap_err();
        assert!(matches!(err, AudioError::Wav { .. }));
    }
}
