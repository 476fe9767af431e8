//! Sequential synthesis of a chunk sequence.
//!
//! Each chunk is offered to the engine in order and written to
//! `{prefix}_{ordinal:03}.wav` in the segment directory. A failing chunk is
//! logged and skipped; the batch carries on with the next one.

pub mod events;

pub use events::{CancelFlag, ProgressEvent, ProgressSink};

use crate::config::segment_file_name;
use crate::task::ensure_exists;
use crate::text::TextChunk;
use crate::tts::{EngineError, SpeechEngine};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of driving a chunk sequence through the engine.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisReport {
    /// Number of chunks in the sequence.
    pub total: usize,
    /// Audio files produced, in chunk order (failed chunks skipped).
    pub produced: Vec<PathBuf>,
    /// 1-based ordinals of chunks that failed.
    pub failed: Vec<usize>,
    /// Whether driving stopped early on request.
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SynthesisReport {
    /// Chunks that were never submitted because of cancellation.
    pub fn skipped(&self) -> usize {
        self.total - self.produced.len() - self.failed.len()
    }
}

/// Drives chunks through a speech engine one at a time.
pub struct SynthesisDriver {
    engine: Arc<dyn SpeechEngine>,
    voice_ref: PathBuf,
    segment_dir: PathBuf,
    prefix: String,
    max_attempts: u32,
    cancel: CancelFlag,
    progress: ProgressSink,
}

impl SynthesisDriver {
    /// Create a driver for `engine`, writing segments into `segment_dir`.
    pub fn new(
        engine: Arc<dyn SpeechEngine>,
        voice_ref: impl Into<PathBuf>,
        segment_dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            voice_ref: voice_ref.into(),
            segment_dir: segment_dir.into(),
            prefix: prefix.into(),
            max_attempts: 1,
            cancel: CancelFlag::default(),
            progress: ProgressSink::none(),
        }
    }

    /// Set the number of engine attempts per chunk.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Destination of the chunk with the given 1-based ordinal.
    pub fn segment_path(&self, ordinal: usize) -> PathBuf {
        self.segment_dir.join(segment_file_name(&self.prefix, ordinal))
    }

    /// Synthesize every chunk in order.
    ///
    /// Fails before touching any chunk when the voice reference is missing or
    /// the segment directory cannot be created. Per-chunk failures never fail
    /// the call; they are listed in the report.
    pub async fn run(&self, chunks: &[TextChunk]) -> Result<SynthesisReport> {
        ensure_exists("Voice reference file", &self.voice_ref)?;
        std::fs::create_dir_all(&self.segment_dir).with_context(|| {
            format!(
                "Failed to create segment directory {}",
                self.segment_dir.display()
            )
        })?;

        let started_at = Utc::now();
        let total = chunks.len();
        let mut produced = Vec::with_capacity(total);
        let mut failed = Vec::new();
        let mut cancelled = false;

        self.progress.send(ProgressEvent::EngineReady {
            name: self.engine.name().to_string(),
        });

        for chunk in chunks {
            let ordinal = chunk.ordinal();
            if self.cancel.is_cancelled() {
                info!("Cancelled before chunk {}/{}", ordinal, total);
                self.progress.send(ProgressEvent::Cancelled { ordinal });
                cancelled = true;
                break;
            }

            let out_path = self.segment_path(ordinal);
            let preview = chunk.preview();
            info!("Generating chunk {}/{}: {}", ordinal, total, preview);
            self.progress.send(ProgressEvent::ChunkStarted {
                ordinal,
                total,
                preview: preview.clone(),
            });

            match self.synthesize_chunk(chunk, &out_path).await {
                Ok(()) => {
                    self.progress.send(ProgressEvent::ChunkCompleted {
                        ordinal,
                        path: out_path.clone(),
                    });
                    produced.push(out_path);
                }
                Err(e) => {
                    warn!("Error generating chunk {} ({}): {:#}", ordinal, preview, e);
                    self.progress.send(ProgressEvent::ChunkFailed {
                        ordinal,
                        preview,
                        error: format!("{:#}", e),
                    });
                    failed.push(ordinal);
                }
            }
        }

        Ok(SynthesisReport {
            total,
            produced,
            failed,
            cancelled,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Run the engine for one chunk, retrying up to `max_attempts` times.
    async fn synthesize_chunk(&self, chunk: &TextChunk, out_path: &Path) -> Result<()> {
        let mut attempt = 1;
        loop {
            match self.attempt(chunk, out_path).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.max_attempts => {
                    warn!(
                        "Chunk {} failed (attempt {}/{}), retrying: {:#}",
                        chunk.ordinal(),
                        attempt,
                        self.max_attempts,
                        e
                    );
                    self.progress.send(ProgressEvent::ChunkRetry {
                        ordinal: chunk.ordinal(),
                        attempt,
                        error: format!("{:#}", e),
                    });
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt(&self, chunk: &TextChunk, out_path: &Path) -> Result<()> {
        // A stale file from an earlier run must not pass for fresh output.
        match std::fs::remove_file(out_path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                return Err(e).with_context(|| format!("Failed to remove {}", out_path.display()));
            }
            _ => {}
        }

        self.engine
            .synthesize(&chunk.text, &self.voice_ref, out_path)
            .await?;

        if !out_path.exists() {
            return Err(EngineError::Synthesis(format!(
                "{} reported success but wrote no file at {}",
                self.engine.name(),
                out_path.display()
            ))
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskError;
    use crate::text::chunk_text;
    use crate::tts::mock::MockEngine;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        voice: PathBuf,
        segments: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let voice = dir.path().join("voice.wav");
        std::fs::write(&voice, b"RIFF").unwrap();
        let segments = dir.path().join("segments");
        Fixture {
            voice,
            segments,
            _dir: dir,
        }
    }

    fn chunks(n: usize) -> Vec<TextChunk> {
        (0..n)
            .map(|i| TextChunk::new(i, format!("Sentence number {}.", i + 1), false))
            .collect()
    }

    #[tokio::test]
    async fn test_run_produces_ordered_segments() {
        let fx = fixture();
        let engine = Arc::new(MockEngine::always_succeeds());
        let driver = SynthesisDriver::new(engine.clone(), &fx.voice, &fx.segments, "chunk");

        let report = driver.run(&chunks(3)).await.unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(
            report.produced,
            vec![
                fx.segments.join("chunk_001.wav"),
                fx.segments.join("chunk_002.wav"),
                fx.segments.join("chunk_003.wav"),
            ]
        );
        assert!(report.failed.is_empty());
        assert!(!report.cancelled);
        assert_eq!(
            engine.texts(),
            vec!["Sentence number 1.", "Sentence number 2.", "Sentence number 3."]
        );
    }

    #[tokio::test]
    async fn test_failed_chunk_is_skipped_and_batch_continues() {
        let fx = fixture();
        let engine = Arc::new(MockEngine::always_succeeds().failing_calls(&[2]));
        let (sink, mut rx) = ProgressSink::channel();
        let driver = SynthesisDriver::new(engine.clone(), &fx.voice, &fx.segments, "gen")
            .with_progress(sink);

        let report = driver.run(&chunks(3)).await.unwrap();

        assert_eq!(report.failed, vec![2]);
        assert_eq!(
            report.produced,
            vec![fx.segments.join("gen_001.wav"), fx.segments.join("gen_003.wav")]
        );
        assert_eq!(engine.call_count(), 3);

        let mut saw_failure = false;
        while let Ok(event) = rx.try_recv() {
            if let ProgressEvent::ChunkFailed { ordinal, preview, .. } = event {
                assert_eq!(ordinal, 2);
                assert_eq!(preview, "Sentence number 2.");
                saw_failure = true;
            }
        }
        assert!(saw_failure);
    }

    #[tokio::test]
    async fn test_retry_recovers_chunk() {
        let fx = fixture();
        let engine = Arc::new(MockEngine::always_succeeds().failing_calls(&[1]));
        let driver = SynthesisDriver::new(engine.clone(), &fx.voice, &fx.segments, "chunk")
            .with_max_attempts(2);

        let report = driver.run(&chunks(2)).await.unwrap();

        assert!(report.failed.is_empty());
        assert_eq!(report.produced.len(), 2);
        assert_eq!(engine.call_count(), 3);
    }

    #[tokio::test]
    async fn test_cancel_before_start_submits_nothing() {
        let fx = fixture();
        let engine = Arc::new(MockEngine::always_succeeds());
        let cancel = CancelFlag::new();
        cancel.cancel();
        let driver = SynthesisDriver::new(engine.clone(), &fx.voice, &fx.segments, "chunk")
            .with_cancel(cancel);

        let report = driver.run(&chunks(3)).await.unwrap();

        assert!(report.cancelled);
        assert!(report.produced.is_empty());
        assert_eq!(report.skipped(), 3);
        assert_eq!(engine.call_count(), 0);
    }

    /// Engine that raises the cancel flag after its first call.
    struct CancelAfterFirst {
        inner: MockEngine,
        cancel: CancelFlag,
    }

    #[async_trait]
    impl SpeechEngine for CancelAfterFirst {
        async fn synthesize(&self, text: &str, voice_ref: &Path, output_path: &Path) -> Result<()> {
            self.inner.synthesize(text, voice_ref, output_path).await?;
            self.cancel.cancel();
            Ok(())
        }

        fn name(&self) -> &str {
            "cancel-after-first"
        }
    }

    #[tokio::test]
    async fn test_cancel_mid_batch_keeps_produced_segments() {
        let fx = fixture();
        let cancel = CancelFlag::new();
        let engine = Arc::new(CancelAfterFirst {
            inner: MockEngine::always_succeeds(),
            cancel: cancel.clone(),
        });
        let driver =
            SynthesisDriver::new(engine, &fx.voice, &fx.segments, "chunk").with_cancel(cancel);

        let report = driver.run(&chunks(3)).await.unwrap();

        assert!(report.cancelled);
        assert_eq!(report.produced, vec![fx.segments.join("chunk_001.wav")]);
        assert!(report.produced[0].exists());
        assert_eq!(report.skipped(), 2);
    }

    /// Engine that claims success without writing anything.
    struct SilentEngine;

    #[async_trait]
    impl SpeechEngine for SilentEngine {
        async fn synthesize(&self, _: &str, _: &Path, _: &Path) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "silent"
        }
    }

    #[tokio::test]
    async fn test_missing_output_counts_as_failure() {
        let fx = fixture();
        std::fs::create_dir_all(&fx.segments).unwrap();
        // Leftover from an earlier run must not be picked up.
        std::fs::write(fx.segments.join("chunk_001.wav"), b"stale").unwrap();

        let driver = SynthesisDriver::new(Arc::new(SilentEngine), &fx.voice, &fx.segments, "chunk");
        let report = driver.run(&chunks(1)).await.unwrap();

        assert_eq!(report.failed, vec![1]);
        assert!(report.produced.is_empty());
    }

    #[tokio::test]
    async fn test_missing_voice_aborts_before_any_chunk() {
        let fx = fixture();
        let engine = Arc::new(MockEngine::always_succeeds());
        let driver = SynthesisDriver::new(
            engine.clone(),
            fx.voice.with_file_name("missing.wav"),
            &fx.segments,
            "chunk",
        );

        let err = driver.run(&chunks(2)).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TaskError>(),
            Some(TaskError::SourceNotFound { .. })
        ));
        assert_eq!(engine.call_count(), 0);
    }

    #[tokio::test]
    async fn test_drives_chunker_output() {
        let fx = fixture();
        let engine = Arc::new(MockEngine::always_succeeds());
        let text = "A short one. Another short one. This sentence is long enough to stand alone as a chunk.";
        let plan = chunk_text(text, 20, 60).unwrap();
        let driver = SynthesisDriver::new(engine.clone(), &fx.voice, &fx.segments, "chunk");

        let report = driver.run(&plan).await.unwrap();

        assert_eq!(report.produced.len(), plan.len());
        let sent: Vec<String> = plan.iter().map(|c| c.text.clone()).collect();
        assert_eq!(engine.texts(), sent);
    }
}
