//! Synthesis driver: runs a pipeline over request text.

use parking_lot::MutexGuard;
use tracing::debug;

use crate::error::{Result, TtsError};

use super::pipeline::{AudioChunk, ChunkIter};
use super::registry::PipelineHandle;
use super::segmenter::SplitPattern;

/// Finite, non-restartable stream of chunks for one request.
///
/// Holds the pipeline's generation lock until it is dropped or exhausted, so a
/// pipeline never runs two syntheses at once. Chunks arrive lazily, but the
/// request path drains the stream completely before responding; audio is never
/// streamed to the client.
pub struct ChunkStream<'a> {
    inner: ChunkIter<'a>,
    produced: usize,
    finished: bool,
    _exclusive: MutexGuard<'a, ()>,
}

impl Iterator for ChunkStream<'_> {
    type Item = Result<AudioChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.inner.next() {
            Some(Ok(chunk)) => {
                self.produced += 1;
                debug!("Chunk {} \"{}\" ready ({} samples)", chunk.metadata.index, chunk.metadata.text, chunk.samples.len());
                Some(Ok(chunk))
            }
            Some(Err(source)) => {
                // One error ends the stream
                self.finished = true;
                Some(Err(TtsError::Synthesis { chunks_produced: self.produced, source }))
            }
            None => {
                self.finished = true;
                None
            }
        }
    }
}

/// Start synthesizing `text` on `handle`.
///
/// Blocks until the pipeline is free, then returns the lazy chunk stream. The
/// text is segmented up front so the unit count is known; the pipeline performs
/// its own segmentation with the same pattern.
///
/// # Errors
/// Returns `TtsError::Synthesis` with zero chunks if the pipeline refuses to start.
pub fn run<'a>(handle: &'a PipelineHandle, text: &'a str, voice: &'a str, speed: f32, split: &'a SplitPattern) -> Result<ChunkStream<'a>> {
    let units = split.segment(text).len();
    debug!("Synthesizing {} unit(s) with voice '{}' on pipeline #{}", units, voice, handle.id());

    let exclusive = handle.lock_generation();
    let inner = handle.pipeline().generate(text, voice, speed, split).map_err(|source| TtsError::Synthesis { chunks_produced: 0, source })?;

    Ok(ChunkStream { inner, produced: 0, finished: false, _exclusive: exclusive })
}
