//! Error types for the synthesis core.
//!
//! `PipelineError` is raised by a model capability (construction or generation).
//! `TtsError` is what the request path surfaces to the serving layer; it wraps
//! capability errors with the context needed to report them.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a model pipeline capability.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unsupported language code '{0}'")]
    UnsupportedLanguage(String),

    #[error("model file not found: {}", .0.display())]
    ModelFileMissing(PathBuf),

    #[error("unknown voice '{0}'")]
    UnknownVoice(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("expected {expected} Hz audio, engine produced {actual} Hz")]
    SampleRateMismatch { expected: u32, actual: u32 },
}

/// Errors surfaced by the request path.
#[derive(Debug, Error)]
pub enum TtsError {
    #[error("missing required field: {0}")]
    FieldMissing(&'static str),

    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("failed to initialize pipeline for language '{language_code}'")]
    PipelineInitialization {
        language_code: String,
        #[source]
        source: PipelineError,
    },

    #[error("synthesis failed after {chunks_produced} chunk(s)")]
    Synthesis {
        chunks_produced: usize,
        #[source]
        source: PipelineError,
    },

    #[error("no audio generated")]
    EmptyAudio,

    #[error("WAV encoding failed")]
    Encoding(#[from] hound::Error),
}

pub type Result<T, E = TtsError> = std::result::Result<T, E>;
