//! Model capability boundary.
//!
//! A [`PipelineFactory`] constructs language-bound [`Pipeline`]s; a pipeline turns
//! text into a lazy sequence of [`AudioChunk`]s. Everything behind these traits
//! (acoustic model, vocoder, phonemizer) is opaque to the serving core.

use crate::config::Device;
use crate::error::PipelineError;

use super::segmenter::SplitPattern;

/// Metadata for the text unit a chunk was generated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkMetadata {
    /// Position of the unit within the request text.
    pub index: usize,
    /// The unit text (graphemes).
    pub text: String,
}

/// One unit of generated audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub metadata: ChunkMetadata,
    pub samples: Vec<f32>,
}

impl AudioChunk {
    pub fn new(index: usize, text: impl Into<String>, samples: Vec<f32>) -> Self {
        Self { metadata: ChunkMetadata { index, text: text.into() }, samples }
    }
}

/// Lazy chunk sequence produced by a pipeline, in unit order.
pub type ChunkIter<'a> = Box<dyn Iterator<Item = Result<AudioChunk, PipelineError>> + 'a>;

/// A text-to-speech pipeline bound to one language and one device.
///
/// Implementations may hold device memory; it is released when the pipeline is dropped.
pub trait Pipeline: Send + Sync {
    /// The Kokoro language code this pipeline was built for.
    fn language_code(&self) -> &str;

    /// The device this pipeline runs on.
    fn device(&self) -> Device;

    /// Start generating audio for `text`.
    ///
    /// The pipeline segments `text` with `split` and yields one chunk per unit.
    /// Errors before the first chunk (such as an unknown voice) are returned
    /// directly; errors mid-stream are yielded by the iterator.
    fn generate<'a>(&'a self, text: &'a str, voice: &'a str, speed: f32, split: &'a SplitPattern) -> Result<ChunkIter<'a>, PipelineError>;
}

/// Constructs pipelines. Construction may be slow and may fail.
pub trait PipelineFactory: Send + Sync {
    fn construct(&self, language_code: &str, device: Device) -> Result<Box<dyn Pipeline>, PipelineError>;
}
