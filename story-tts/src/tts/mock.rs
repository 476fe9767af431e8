//! Mock speech engine for testing
//!
//! Writes a short silent WAV per call and can be told to fail specific calls.

use super::{EngineError, SpeechEngine};
use anyhow::Result;
use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A mock engine that records every request.
pub struct MockEngine {
    /// 1-based call numbers that should fail
    fail_calls: HashSet<usize>,
    /// Frame rate of the written audio
    sample_rate: u32,
    /// Frames written per call
    frames: u32,
    call_count: AtomicUsize,
    /// (text, output path) of every call, in order
    calls: Mutex<Vec<(String, PathBuf)>>,
}

impl MockEngine {
    /// Create an engine that always succeeds.
    pub fn always_succeeds() -> Self {
        Self {
            fail_calls: HashSet::new(),
            sample_rate: 24000,
            frames: 100,
            call_count: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fail the given 1-based calls.
    pub fn failing_calls(mut self, calls: &[usize]) -> Self {
        self.fail_calls = calls.iter().copied().collect();
        self
    }

    /// Write audio at a different frame rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Get the number of times synthesize() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Texts received, in call order.
    pub fn texts(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn frames_per_call(&self) -> u32 {
        self.frames
    }
}

#[async_trait]
impl SpeechEngine for MockEngine {
    async fn synthesize(&self, text: &str, _voice_ref: &Path, output_path: &Path) -> Result<()> {
        let call_num = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), output_path.to_path_buf()));

        if self.fail_calls.contains(&call_num) {
            return Err(EngineError::Synthesis(format!("mock failure on call {}", call_num)).into());
        }

        let spec = WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(output_path, spec)?;
        for _ in 0..self.frames {
            writer.write_sample(0i16)?;
        }
        writer.finalize()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
