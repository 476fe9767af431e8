//! Speech engine trait and types.
//!
//! The engine is an external collaborator: it receives chunk text, a
//! reference voice and a destination path, and either writes an audio file
//! there or fails.

pub mod command;
#[cfg(test)]
pub mod mock;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

pub use command::CommandEngine;

/// Engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to initialize speech engine: {0}")]
    Init(String),

    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    #[error("Synthesis timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// Speech engine trait - every synthesis backend implements this.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Synthesize `text` in the voice of `voice_ref`, writing audio to `output_path`.
    async fn synthesize(&self, text: &str, voice_ref: &Path, output_path: &Path) -> Result<()>;

    /// Engine name for display.
    fn name(&self) -> &str;
}
