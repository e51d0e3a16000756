//! Scripted pipeline capabilities for tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::config::Device;
use crate::error::PipelineError;

use super::pipeline::{AudioChunk, ChunkIter, Pipeline, PipelineFactory};
use super::segmenter::SplitPattern;

type Constructor = dyn Fn(&str, Device) -> Result<StubPipeline, PipelineError> + Send + Sync;

/// Factory that counts constructions and hands out drop counters.
pub struct StubFactory {
    constructor: Box<Constructor>,
    constructed: Arc<AtomicUsize>,
    dropped: Arc<AtomicUsize>,
}

impl StubFactory {
    pub fn new(constructor: impl Fn(&str, Device) -> Result<StubPipeline, PipelineError> + Send + Sync + 'static) -> Self {
        Self { constructor: Box::new(constructor), constructed: Arc::default(), dropped: Arc::default() }
    }

    /// Factory whose pipelines emit one chunk per entry of `chunk_sizes`.
    pub fn with_chunks(chunk_sizes: Vec<usize>) -> Self {
        Self::new(move |lang, device| Ok(StubPipeline::new(lang, device, chunk_sizes.clone())))
    }

    pub fn constructed(&self) -> Arc<AtomicUsize> {
        self.constructed.clone()
    }

    pub fn dropped(&self) -> Arc<AtomicUsize> {
        self.dropped.clone()
    }
}

impl PipelineFactory for StubFactory {
    fn construct(&self, language_code: &str, device: Device) -> Result<Box<dyn Pipeline>, PipelineError> {
        let mut pipeline = (self.constructor)(language_code, device)?;
        pipeline.dropped = Some(self.dropped.clone());
        self.constructed.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(pipeline))
    }
}

/// Pipeline that emits chunks of fixed sizes, ignoring the text.
///
/// Chunk `i` is filled with the value `(i + 1) / 10` so ordering is visible in
/// the assembled waveform.
pub struct StubPipeline {
    language_code: String,
    device: Device,
    chunk_sizes: Vec<usize>,
    fail_after: Option<usize>,
    delay: Duration,
    dropped: Option<Arc<AtomicUsize>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl StubPipeline {
    pub fn new(language_code: &str, device: Device, chunk_sizes: Vec<usize>) -> Self {
        Self {
            language_code: language_code.to_string(),
            device,
            chunk_sizes,
            fail_after: None,
            delay: Duration::ZERO,
            dropped: None,
            active: Arc::default(),
            max_active: Arc::default(),
        }
    }

    /// Yield an error after `chunks` chunks.
    pub fn failing_after(mut self, chunks: usize) -> Self {
        self.fail_after = Some(chunks);
        self
    }

    /// Sleep while producing each chunk.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Highest number of chunks ever produced concurrently.
    pub fn max_active(&self) -> Arc<AtomicUsize> {
        self.max_active.clone()
    }
}

impl Pipeline for StubPipeline {
    fn language_code(&self) -> &str {
        &self.language_code
    }

    fn device(&self) -> Device {
        self.device
    }

    fn generate<'a>(&'a self, _text: &'a str, voice: &'a str, _speed: f32, _split: &'a SplitPattern) -> Result<ChunkIter<'a>, PipelineError> {
        if voice == "missing" {
            return Err(PipelineError::UnknownVoice(voice.to_string()));
        }

        let iter = self.chunk_sizes.iter().enumerate().map(move |(index, &size)| {
            if self.fail_after == Some(index) {
                return Err(PipelineError::Generation(format!("stub failure at chunk {index}")));
            }

            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
            self.active.fetch_sub(1, Ordering::SeqCst);

            let value = (index + 1) as f32 / 10.0;
            Ok(AudioChunk::new(index, format!("unit {index}"), vec![value; size]))
        });

        Ok(Box::new(iter))
    }
}

impl Drop for StubPipeline {
    fn drop(&mut self) {
        if let Some(dropped) = &self.dropped {
            dropped.fetch_add(1, Ordering::SeqCst);
        }
    }
}
