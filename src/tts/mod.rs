//! Text-to-speech core: segmentation, pipeline lifecycle and synthesis.

pub mod driver;
#[cfg(feature = "kokoro")]
mod kokoro;
mod pipeline;
mod registry;
mod segmenter;
#[cfg(test)]
pub(crate) mod testing;

#[cfg(feature = "kokoro")]
pub use kokoro::KokoroFactory;
pub use pipeline::{AudioChunk, PipelineFactory};
pub use registry::PipelineRegistry;
pub use segmenter::SplitPattern;
