//! Progress messages from the synthesis worker and cooperative cancellation.

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// A discrete progress event published by the worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Text was split into `total` chunks.
    ChunksPlanned { total: usize },
    /// The engine is ready and synthesis is about to start.
    EngineReady { name: String },
    /// A chunk was handed to the engine.
    ChunkStarted {
        ordinal: usize,
        total: usize,
        preview: String,
    },
    /// An attempt failed and the chunk will be tried again.
    ChunkRetry {
        ordinal: usize,
        attempt: u32,
        error: String,
    },
    /// A chunk produced an audio file.
    ChunkCompleted { ordinal: usize, path: PathBuf },
    /// A chunk failed for good and was skipped.
    ChunkFailed {
        ordinal: usize,
        preview: String,
        error: String,
    },
    /// Driving stopped before chunk `ordinal` was submitted.
    Cancelled { ordinal: usize },
    /// Segments are being merged.
    Concatenating { segments: usize, output: PathBuf },
    /// The final file is in place.
    Finished { output: PathBuf, frames: u64 },
}

/// Sending half of the progress channel.
///
/// Events are dropped silently when nobody listens.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressSink {
    /// Create a sink and the receiver the interactive side consumes.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink with no listener.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn send(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

/// Shared flag checked before each chunk is submitted.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
