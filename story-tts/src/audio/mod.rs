//! Audio assembly: WAV probing and byte-exact concatenation.

pub mod assembler;
pub mod format;

pub use assembler::{ConcatenationResult, concatenate, concatenate_files};
pub use format::{AudioError, AudioSegment, FormatDescriptor, FormatField};
