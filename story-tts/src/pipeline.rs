//! Batch orchestration: text → chunks → per-chunk audio → one WAV file.

use crate::audio::concatenate_files;
use crate::config::RunConfig;
use crate::driver::{CancelFlag, ProgressEvent, ProgressSink, SynthesisDriver, SynthesisReport};
use crate::task::{TaskFile, read_source, sanitize_filename};
use crate::text::{TextChunk, chunk_text};
use crate::tts::SpeechEngine;
use anyhow::{Context, Result, bail};
use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Summary of a completed batch run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub title: String,
    /// Merged audio file
    pub output: PathBuf,
    pub frames: u64,
    pub duration_secs: f64,
    /// Segment directory, when it was kept
    pub segment_dir: Option<PathBuf>,
    pub synthesis: SynthesisReport,
}

/// Runs chunking, synthesis and assembly with one engine.
pub struct Pipeline {
    config: RunConfig,
    engine: Arc<dyn SpeechEngine>,
    cancel: CancelFlag,
    progress: ProgressSink,
}

impl Pipeline {
    pub fn new(config: RunConfig, engine: Arc<dyn SpeechEngine>) -> Self {
        Self {
            config,
            engine,
            cancel: CancelFlag::default(),
            progress: ProgressSink::none(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Split text into chunks, failing when nothing is left to synthesize.
    pub fn plan(&self, text: &str) -> Result<Vec<TextChunk>> {
        let chunks = chunk_text(text, self.config.min_chars, self.config.max_chars)?;
        if chunks.is_empty() {
            bail!("No text chunks produced; the story text is empty");
        }
        info!("Preparing to synthesize {} chunks", chunks.len());
        self.progress.send(ProgressEvent::ChunksPlanned {
            total: chunks.len(),
        });
        Ok(chunks)
    }

    fn driver(&self, voice_ref: &Path, segment_dir: &Path) -> SynthesisDriver {
        SynthesisDriver::new(
            self.engine.clone(),
            voice_ref,
            segment_dir,
            self.config.prefix.clone(),
        )
        .with_max_attempts(self.config.max_attempts)
        .with_cancel(self.cancel.clone())
        .with_progress(self.progress.clone())
    }

    /// Write one audio file per chunk into `output_dir` without merging.
    pub async fn generate(
        &self,
        text_path: &Path,
        voice_ref: &Path,
        output_dir: &Path,
    ) -> Result<SynthesisReport> {
        let text = read_source("Story text file", text_path)?;
        let chunks = self.plan(&text)?;
        let report = self.driver(voice_ref, output_dir).run(&chunks).await?;
        info!(
            "Generated {} of {} chunk files in {}",
            report.produced.len(),
            report.total,
            output_dir.display()
        );
        Ok(report)
    }

    /// Synthesize a task and merge the result into `{output_dir}/{title}.wav`.
    ///
    /// Per-chunk audio goes to `{output_dir}/{title}_segments`, which is
    /// removed after a successful merge unless `keep_segments` is set. It is
    /// left in place when the run is cancelled or the merge fails.
    pub async fn run(&self, task: &TaskFile, output_dir: &Path) -> Result<RunOutcome> {
        let text = task.read_text()?;
        let chunks = self.plan(&text)?;

        let output_path = output_dir.join(task.output_file_name());
        let segment_dir = output_dir.join(format!("{}_segments", sanitize_filename(&task.title)));

        let synthesis = self.driver(&task.voice_path, &segment_dir).run(&chunks).await?;

        if synthesis.cancelled {
            bail!(
                "Cancelled after {} of {} chunks; segments kept in {}",
                synthesis.produced.len() + synthesis.failed.len(),
                synthesis.total,
                segment_dir.display()
            );
        }
        if synthesis.produced.is_empty() {
            bail!("No chunk files were produced; aborting");
        }
        if !synthesis.failed.is_empty() {
            warn!(
                "{} chunk(s) failed and will be missing from the output: {:?}",
                synthesis.failed.len(),
                synthesis.failed
            );
        }

        info!(
            "Concatenating {} wavs into {}",
            synthesis.produced.len(),
            output_path.display()
        );
        self.progress.send(ProgressEvent::Concatenating {
            segments: synthesis.produced.len(),
            output: output_path.clone(),
        });

        let merged = concatenate_files(&synthesis.produced, &output_path).with_context(|| {
            format!(
                "Failed to concatenate segments; they are kept in {}",
                segment_dir.display()
            )
        })?;

        let segment_dir = if self.config.keep_segments {
            Some(segment_dir)
        } else {
            if let Err(e) = std::fs::remove_dir_all(&segment_dir) {
                warn!("Failed to remove {}: {}", segment_dir.display(), e);
            }
            None
        };

        info!("Done, wrote {}", merged.path.display());
        self.progress.send(ProgressEvent::Finished {
            output: merged.path.clone(),
            frames: merged.frames,
        });

        Ok(RunOutcome {
            title: task.title.clone(),
            duration_secs: merged.frames as f64 / f64::from(merged.format.frame_rate),
            output: merged.path,
            frames: merged.frames,
            segment_dir,
            synthesis,
        })
    }
}
