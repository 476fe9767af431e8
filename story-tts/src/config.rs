//! Run settings for chunking, synthesis and assembly.
//!
//! Settings are read from the optional `[settings]` table of a task file and
//! can be overridden from the command line.

use crate::text::chunker::{DEFAULT_MAX_CHARS, DEFAULT_MIN_CHARS};
use serde::{Deserialize, Serialize};

// Default values for the external engine
const DEFAULT_ENGINE_PROGRAM: &str = "indextts";
const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 300;

/// Placeholder replaced with the chunk text in engine arguments.
pub const TEXT_PLACEHOLDER: &str = "{text}";
/// Placeholder replaced with the reference voice path in engine arguments.
pub const VOICE_PLACEHOLDER: &str = "{voice}";
/// Placeholder replaced with the destination audio path in engine arguments.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Extension of per-chunk and final audio files.
pub const AUDIO_EXTENSION: &str = "wav";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Soft minimum chunk length in characters
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,

    /// Hard maximum chunk length in characters
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// File name prefix for per-chunk audio
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Engine attempts per chunk before it is recorded as failed
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Keep per-chunk audio after a successful merge
    #[serde(default)]
    pub keep_segments: bool,

    /// External synthesis engine
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Executable name or path
    #[serde(default = "default_engine_program")]
    pub program: String,

    /// Argument template; see the placeholder constants
    #[serde(default = "default_engine_args")]
    pub args: Vec<String>,

    /// Per-chunk timeout in seconds (0 disables it)
    #[serde(default = "default_engine_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_min_chars() -> usize {
    DEFAULT_MIN_CHARS
}

fn default_max_chars() -> usize {
    DEFAULT_MAX_CHARS
}

fn default_prefix() -> String {
    "chunk".to_string()
}

fn default_max_attempts() -> u32 {
    1
}

fn default_engine_program() -> String {
    DEFAULT_ENGINE_PROGRAM.to_string()
}

fn default_engine_args() -> Vec<String> {
    [
        "--voice",
        VOICE_PLACEHOLDER,
        "--output",
        OUTPUT_PLACEHOLDER,
        "--text",
        TEXT_PLACEHOLDER,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_engine_timeout_secs() -> u64 {
    DEFAULT_ENGINE_TIMEOUT_SECS
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            min_chars: default_min_chars(),
            max_chars: default_max_chars(),
            prefix: default_prefix(),
            max_attempts: default_max_attempts(),
            keep_segments: false,
            engine: EngineConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: default_engine_program(),
            args: default_engine_args(),
            timeout_secs: default_engine_timeout_secs(),
        }
    }
}

/// Command-line overrides applied on top of file settings.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub min_chars: Option<usize>,
    pub max_chars: Option<usize>,
    pub prefix: Option<String>,
    pub engine: Option<String>,
    pub keep_segments: bool,
}

impl RunConfig {
    /// Apply command-line overrides.
    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(min) = overrides.min_chars {
            self.min_chars = min;
        }
        if let Some(max) = overrides.max_chars {
            self.max_chars = max;
        }
        if let Some(prefix) = overrides.prefix.as_deref().map(str::trim) {
            if !prefix.is_empty() {
                self.prefix = prefix.to_string();
            }
        }
        if let Some(engine) = &overrides.engine {
            self.engine.program = engine.clone();
        }
        self.keep_segments |= overrides.keep_segments;
        self.max_attempts = self.max_attempts.max(1);
        self
    }
}

/// Per-chunk file name for a 1-based ordinal.
pub fn segment_file_name(prefix: &str, ordinal: usize) -> String {
    format!("{}_{:03}.{}", prefix, ordinal, AUDIO_EXTENSION)
}
