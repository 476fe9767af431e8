//! Speech engine backed by an external program.
//!
//! The program is run once per chunk. Its arguments come from a template in
//! which `{text}`, `{voice}` and `{output}` are substituted.

use super::{EngineError, SpeechEngine};
use crate::config::{EngineConfig, OUTPUT_PLACEHOLDER, TEXT_PLACEHOLDER, VOICE_PLACEHOLDER};
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

/// Engine that shells out to a synthesis program.
#[derive(Debug)]
pub struct CommandEngine {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
    name: String,
}

impl CommandEngine {
    /// Create a new command engine.
    ///
    /// Returns an error if the program cannot be found.
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let program = which::which(&config.program).map_err(|_| {
            EngineError::Init(format!(
                "engine program '{}' not found in PATH",
                config.program
            ))
        })?;

        if !config.args.iter().any(|a| a.contains(OUTPUT_PLACEHOLDER)) {
            return Err(EngineError::Init(format!(
                "engine arguments must contain the {} placeholder",
                OUTPUT_PLACEHOLDER
            )));
        }

        let name = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| config.program.clone());

        Ok(Self {
            program,
            args: config.args.clone(),
            timeout: (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs)),
            name,
        })
    }

    /// Expand the argument template for one chunk.
    fn render_args(&self, text: &str, voice_ref: &Path, output_path: &Path) -> Vec<String> {
        let voice = voice_ref.to_string_lossy();
        let output = output_path.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(VOICE_PLACEHOLDER, &voice)
                    .replace(OUTPUT_PLACEHOLDER, &output)
                    .replace(TEXT_PLACEHOLDER, text)
            })
            .collect()
    }
}

#[async_trait]
impl SpeechEngine for CommandEngine {
    async fn synthesize(&self, text: &str, voice_ref: &Path, output_path: &Path) -> Result<()> {
        let args = self.render_args(text, voice_ref, output_path);
        debug!("Running {} with {} args", self.program.display(), args.len());

        let mut cmd = Command::new(&self.program);
        cmd.args(&args).kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.output())
                .await
                .map_err(|_| EngineError::Timeout {
                    secs: limit.as_secs(),
                })?,
            None => cmd.output().await,
        }
        .with_context(|| format!("Failed to run {}", self.program.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::Synthesis(format!(
                "{} exited with {}: {}",
                self.name,
                output.status,
                stderr.trim()
            ))
            .into());
        }

        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
