//! Kokoro pipelines backed by sherpa-rs.

use std::path::PathBuf;

use parking_lot::Mutex;
use sherpa_rs::OnnxConfig;
use sherpa_rs::tts::{CommonTtsConfig, KokoroTts, KokoroTtsConfig};
use tracing::{debug, info};

use crate::config::voices::{self, Language};
use crate::config::{AppConfig, Device, SAMPLE_RATE};
use crate::error::PipelineError;

use super::pipeline::{AudioChunk, ChunkIter, Pipeline, PipelineFactory};
use super::segmenter::SplitPattern;

/// Builds Kokoro pipelines from the multi-lang v1.0 model directory.
pub struct KokoroFactory {
    model_dir: PathBuf,
    num_threads: i32,
    debug: bool,
}

impl KokoroFactory {
    pub fn new(config: &AppConfig) -> Self {
        Self { model_dir: config.kokoro_dir(), num_threads: config.num_threads.try_into().unwrap_or(2), debug: config.verbose }
    }

    fn path(&self, name: &str) -> String {
        self.model_dir.join(name).to_string_lossy().to_string()
    }

    fn require(&self, name: &str) -> Result<String, PipelineError> {
        let path = self.model_dir.join(name);
        if !path.exists() {
            return Err(PipelineError::ModelFileMissing(path));
        }
        Ok(path.to_string_lossy().to_string())
    }

    /// Lexicon list for languages that ship one; espeak languages use none.
    fn lexicon(&self, language: &Language) -> Result<String, PipelineError> {
        let paths = language.lexicons.iter().map(|name| self.require(name)).collect::<Result<Vec<_>, _>>()?;
        Ok(paths.join(","))
    }
}

impl PipelineFactory for KokoroFactory {
    fn construct(&self, language_code: &str, device: Device) -> Result<Box<dyn Pipeline>, PipelineError> {
        let language = voices::get_language(language_code).ok_or_else(|| PipelineError::UnsupportedLanguage(language_code.to_string()))?;

        info!("Initializing Kokoro pipeline for {} with {} device", language.name, device);

        let tts_config = KokoroTtsConfig {
            model: self.require("model.onnx")?,
            voices: self.require("voices.bin")?,
            tokens: self.require("tokens.txt")?,
            data_dir: self.path("espeak-ng-data"),
            dict_dir: self.path("dict"),
            lexicon: self.lexicon(language)?,
            lang: language.espeak.to_string(),
            length_scale: 1.0,
            onnx_config: OnnxConfig { provider: device.as_sherpa_provider().to_string(), num_threads: self.num_threads, debug: self.debug },
            common_config: CommonTtsConfig { max_num_sentences: 1, ..Default::default() }, // Kokoro only supports 1
        };

        let tts = KokoroTts::new(tts_config);

        Ok(Box::new(KokoroPipeline { language, device, tts: Mutex::new(tts) }))
    }
}

/// A Kokoro engine loaded for one language.
pub struct KokoroPipeline {
    language: &'static Language,
    device: Device,
    tts: Mutex<KokoroTts>,
}

impl KokoroPipeline {
    fn synthesize_unit(&self, index: usize, unit: String, speaker_id: i32, speed: f32) -> Result<AudioChunk, PipelineError> {
        debug!("Synthesizing unit {}: \"{}\"", index, unit);

        let audio = self.tts.lock().create(&unit, speaker_id, speed).map_err(|e| PipelineError::Generation(e.to_string()))?;

        if audio.sample_rate != SAMPLE_RATE {
            return Err(PipelineError::SampleRateMismatch { expected: SAMPLE_RATE, actual: audio.sample_rate });
        }

        Ok(AudioChunk::new(index, unit, audio.samples))
    }
}

impl Pipeline for KokoroPipeline {
    fn language_code(&self) -> &str {
        self.language.code
    }

    fn device(&self) -> Device {
        self.device
    }

    fn generate<'a>(&'a self, text: &'a str, voice: &'a str, speed: f32, split: &'a SplitPattern) -> Result<ChunkIter<'a>, PipelineError> {
        let voice = voices::get_voice(voice).ok_or_else(|| PipelineError::UnknownVoice(voice.to_string()))?;
        if voice.language.code != self.language.code {
            debug!("Voice {} is {}, pipeline is {}", voice.name, voice.language.name, self.language.name);
        }

        let units = split.segment(text);
        Ok(Box::new(units.into_iter().enumerate().map(move |(index, unit)| self.synthesize_unit(index, unit, voice.speaker_id, speed))))
    }
}

impl Drop for KokoroPipeline {
    fn drop(&mut self) {
        info!("Unloading Kokoro pipeline for {}", self.language.name);
    }
}
