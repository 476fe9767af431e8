//! Batch task description.
//!
//! A task file names the story text, the reference voice and a title:
//!
//! ```toml
//! [story]
//! path = "task/story.txt"
//! voice = "task/voice.wav"
//! title = "My Story"
//!
//! [settings]
//! max_chars = 120
//! ```

use crate::config::{AUDIO_EXTENSION, RunConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Title used when none is given or nothing survives sanitization.
pub const DEFAULT_TITLE: &str = "story";

/// Default task file location, relative to the working directory.
pub const DEFAULT_TASK_FILE: &str = "task/taskfile.toml";

static ILLEGAL_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/:*?"<>|]+"#).expect("filename pattern is valid"));
static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Task loading errors.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("{what} not found: {}", .path.display())]
    SourceNotFound { what: &'static str, path: PathBuf },

    #[error("Failed to parse task file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{0} is required in the task file")]
    MissingField(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Deserialize)]
struct RawTaskFile {
    story: Option<RawStory>,
    #[serde(default)]
    settings: RunConfig,
}

#[derive(Debug, Deserialize)]
struct RawStory {
    path: Option<PathBuf>,
    voice: Option<PathBuf>,
    title: Option<String>,
}

/// A validated task description.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFile {
    /// Source text file
    pub text_path: PathBuf,
    /// Reference voice audio
    pub voice_path: PathBuf,
    /// Human-readable title
    pub title: String,
    /// Run settings from the `[settings]` table
    pub settings: RunConfig,
}

impl TaskFile {
    /// Load and validate a task file.
    pub fn load(path: &Path) -> Result<Self, TaskError> {
        if !path.exists() {
            return Err(TaskError::SourceNotFound {
                what: "Task file",
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| match e {
            TaskError::Parse { source, .. } => TaskError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse task file contents.
    pub fn parse(content: &str) -> Result<Self, TaskError> {
        let raw: RawTaskFile = toml::from_str(content).map_err(|source| TaskError::Parse {
            path: PathBuf::new(),
            source,
        })?;

        let story = raw.story.ok_or(TaskError::MissingField("[story] section"))?;
        let text_path = story.path.ok_or(TaskError::MissingField("story.path"))?;
        let voice_path = story.voice.ok_or(TaskError::MissingField("story.voice"))?;
        let title = story
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        Ok(Self {
            text_path,
            voice_path,
            title,
            settings: raw.settings,
        })
    }

    /// Read the story text.
    pub fn read_text(&self) -> Result<String, TaskError> {
        read_source("Story text file", &self.text_path)
    }

    /// Name of the merged audio file.
    pub fn output_file_name(&self) -> String {
        format!("{}.{}", sanitize_filename(&self.title), AUDIO_EXTENSION)
    }
}

/// Read a UTF-8 text file, reporting a missing file as `SourceNotFound`.
pub fn read_source(what: &'static str, path: &Path) -> Result<String, TaskError> {
    ensure_exists(what, path)?;
    Ok(std::fs::read_to_string(path)?)
}

/// Fail with `SourceNotFound` unless `path` exists.
pub fn ensure_exists(what: &'static str, path: &Path) -> Result<(), TaskError> {
    if path.exists() {
        Ok(())
    } else {
        Err(TaskError::SourceNotFound {
            what,
            path: path.to_path_buf(),
        })
    }
}

/// Turn a title into a safe file stem.
///
/// Strips characters that are illegal in file names, collapses whitespace
/// runs to `_`, and falls back to [`DEFAULT_TITLE`] when nothing is left.
pub fn sanitize_filename(name: &str) -> String {
    let name = name.trim();
    let name = ILLEGAL_FILENAME_CHARS.replace_all(name, "");
    let name = WHITESPACE_RUN.replace_all(&name, "_");
    if name.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        name.into_owned()
    }
}
