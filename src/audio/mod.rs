//! Audio assembly and encoding.
//!
//! Generated chunks are buffered in memory, concatenated and encoded as a
//! single WAV file; nothing is written to disk.

mod assembler;
mod wav;

pub use assembler::{EncodedAudio, assemble};
