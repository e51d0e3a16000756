//! Configuration module for the TTS server.
//!
//! Provides CLI argument parsing, fixed synthesis constants and the voice catalogue.

#[allow(clippy::module_inception)]
mod config;
pub mod voices;

pub use config::{AppConfig, CONTENT_TYPE_WAV, DEFAULT_LANGUAGE_CODE, DEFAULT_SPEED, DEFAULT_VOICE, Device, SAMPLE_RATE};
