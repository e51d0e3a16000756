//! Audio assembly: drain a chunk stream into one encoded waveform.

use tracing::debug;

use crate::error::{Result, TtsError};
use crate::tts::AudioChunk;

use super::wav::encode_wav;

/// A complete WAV file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedAudio {
    pub bytes: Vec<u8>,
    pub sample_rate: u32,
    pub num_samples: usize,
}

impl EncodedAudio {
    /// Duration of the encoded audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.num_samples as f64 / self.sample_rate as f64
    }
}

/// Concatenate chunk samples in order, with no gaps or cross-fades.
///
/// Drains `chunks` to completion; the first error aborts assembly.
///
/// # Errors
/// Returns `TtsError::EmptyAudio` when the sequence yields no samples, or the
/// first error the sequence yields.
pub fn concatenate<I>(chunks: I) -> Result<Vec<f32>>
where
    I: IntoIterator<Item = Result<AudioChunk>>,
{
    let mut waveform = Vec::new();
    let mut count = 0usize;

    for chunk in chunks {
        let chunk = chunk?;
        waveform.extend_from_slice(&chunk.samples);
        count += 1;
    }

    // Chunks that carry no samples count as no audio
    if waveform.is_empty() {
        return Err(TtsError::EmptyAudio);
    }

    debug!("Assembled {} chunk(s) into {} samples", count, waveform.len());
    Ok(waveform)
}

/// Drain `chunks`, concatenate them and encode the result as WAV.
///
/// # Errors
/// Returns `TtsError::EmptyAudio` for an empty sequence, any error the sequence
/// yields, or `TtsError::Encoding` if WAV encoding fails.
pub fn assemble<I>(chunks: I, sample_rate: u32) -> Result<EncodedAudio>
where
    I: IntoIterator<Item = Result<AudioChunk>>,
{
    let waveform = concatenate(chunks)?;
    let bytes = encode_wav(&waveform, sample_rate)?;

    Ok(EncodedAudio { bytes, sample_rate, num_samples: waveform.len() })
}
