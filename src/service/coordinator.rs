//! Request coordinator: decode, synthesize, assemble, package.
//!
//! Every method blocks until its work is done. Callers on an async runtime
//! should run [`RequestCoordinator::handle`] on a blocking thread.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::audio::{self, EncodedAudio};
use crate::config::voices::normalize_language_code;
use crate::config::{AppConfig, CONTENT_TYPE_WAV, DEFAULT_LANGUAGE_CODE, DEFAULT_SPEED, DEFAULT_VOICE, Device, SAMPLE_RATE};
use crate::error::{Result, TtsError};
use crate::tts::{PipelineRegistry, SplitPattern, driver};

/// Fixed per-worker synthesis settings.
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub default_language: String,
    pub default_voice: String,
    pub speed: f32,
    pub sample_rate: u32,
    pub device: Device,
    pub split: SplitPattern,
}

impl CoordinatorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            default_language: normalize_language_code(&config.default_language),
            default_voice: config.default_voice.clone(),
            speed: config.speed,
            device: config.effective_device(),
            ..Self::default()
        }
    }
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            default_language: DEFAULT_LANGUAGE_CODE.to_string(),
            default_voice: DEFAULT_VOICE.to_string(),
            speed: DEFAULT_SPEED,
            sample_rate: SAMPLE_RATE,
            device: Device::Cpu,
            split: SplitPattern::default(),
        }
    }
}

/// A decoded synthesis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub language_code: String,
    pub voice: String,
}

/// Wire shape of the request body. All fields are optional here so a missing
/// `text` is reported as such rather than as a generic parse error.
#[derive(Debug, Deserialize)]
struct RawRequest {
    text: Option<String>,
    language_code: Option<String>,
    voice: Option<String>,
}

/// Bytes ready for the transport, plus their content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechResponse {
    pub body: Vec<u8>,
    pub content_type: &'static str,
}

/// Lifecycle of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Decoded,
    PipelineReady,
    Synthesizing,
    Assembling,
    Encoded,
    Responded,
    Failed,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Tracks and logs the state of one in-flight request.
#[derive(Debug)]
struct RequestTracker {
    state: RequestState,
    started: Instant,
}

impl RequestTracker {
    fn new() -> Self {
        Self::starting_at(RequestState::Received)
    }

    fn starting_at(state: RequestState) -> Self {
        Self { state, started: Instant::now() }
    }

    fn advance(&mut self, next: RequestState) {
        debug!("Request {} -> {} (+{}ms)", self.state, next, self.started.elapsed().as_millis());
        self.state = next;
    }

    fn fail(&mut self, error: &TtsError) {
        warn!("❌ Request failed while {}: {}", self.state, error);
        self.state = RequestState::Failed;
    }
}

/// Drives a request through registry, driver and assembler.
pub struct RequestCoordinator {
    registry: Arc<PipelineRegistry>,
    settings: CoordinatorSettings,
}

impl RequestCoordinator {
    pub fn new(registry: Arc<PipelineRegistry>, settings: CoordinatorSettings) -> Self {
        Self { registry, settings }
    }

    pub fn registry(&self) -> &PipelineRegistry {
        &self.registry
    }

    /// Decode a request body, filling defaults for optional fields.
    ///
    /// Touches no pipeline state.
    ///
    /// # Errors
    /// `FieldMissing("text")` if `text` is absent or null; `InvalidField` if the
    /// body is not an object, a field has the wrong type, or a field is blank.
    pub fn decode(&self, raw: Value) -> Result<SpeechRequest> {
        if !raw.is_object() {
            return Err(TtsError::InvalidField { field: "body", reason: "expected a JSON object".to_string() });
        }

        let raw: RawRequest = serde_json::from_value(raw).map_err(|e| TtsError::InvalidField { field: "body", reason: e.to_string() })?;

        let text = raw.text.ok_or(TtsError::FieldMissing("text"))?;
        if text.trim().is_empty() {
            return Err(TtsError::InvalidField { field: "text", reason: "must not be empty".to_string() });
        }

        let language_code = non_blank("language_code", raw.language_code)?.map(|code| normalize_language_code(&code)).unwrap_or_else(|| self.settings.default_language.clone());
        let voice = non_blank("voice", raw.voice)?.unwrap_or_else(|| self.settings.default_voice.clone());

        Ok(SpeechRequest { text, language_code, voice })
    }

    /// Synthesize a decoded request into a WAV file.
    ///
    /// # Errors
    /// Propagates `PipelineInitialization`, `Synthesis`, `EmptyAudio` and
    /// `Encoding` errors unchanged.
    pub fn infer(&self, request: &SpeechRequest) -> Result<EncodedAudio> {
        let mut tracker = RequestTracker::starting_at(RequestState::Decoded);
        let result = self.infer_tracked(request, &mut tracker);
        if let Err(e) = &result {
            tracker.fail(e);
        }
        result
    }

    fn infer_tracked(&self, request: &SpeechRequest, tracker: &mut RequestTracker) -> Result<EncodedAudio> {
        let started = Instant::now();
        let settings = &self.settings;

        let handle = self.registry.ensure(&request.language_code, settings.device)?;
        tracker.advance(RequestState::PipelineReady);

        let stream = driver::run(&handle, &request.text, &request.voice, settings.speed, &settings.split)?;
        tracker.advance(RequestState::Synthesizing);

        // Chunks are generated as the assembler drains the stream; the whole
        // waveform is buffered before encoding and never streamed out
        tracker.advance(RequestState::Assembling);
        let encoded = audio::assemble(stream, settings.sample_rate)?;
        tracker.advance(RequestState::Encoded);

        info!("🎵 Generated {:.2}s of audio with {} in {:.2}s", encoded.duration_secs(), request.voice, started.elapsed().as_secs_f32());
        Ok(encoded)
    }

    /// Package encoded audio for the transport.
    pub fn encode(&self, audio: EncodedAudio) -> SpeechResponse {
        SpeechResponse { body: audio.bytes, content_type: CONTENT_TYPE_WAV }
    }

    /// Run a raw request end to end.
    ///
    /// # Errors
    /// Any decode or synthesis error, unchanged. No partial audio is returned.
    pub fn handle(&self, raw: Value) -> Result<SpeechResponse> {
        let mut tracker = RequestTracker::new();

        let request = match self.decode(raw) {
            Ok(request) => request,
            Err(e) => {
                tracker.fail(&e);
                return Err(e);
            }
        };
        tracker.advance(RequestState::Decoded);

        // Synthesis failures are logged by `infer` with the state they hit
        let audio = self.infer(&request)?;
        let response = self.encode(audio);
        tracker.advance(RequestState::Responded);
        Ok(response)
    }
}

/// Reject present-but-blank optional fields.
fn non_blank(field: &'static str, value: Option<String>) -> Result<Option<String>> {
    match value {
        Some(v) if v.trim().is_empty() => Err(TtsError::InvalidField { field, reason: "must not be empty".to_string() }),
        other => Ok(other),
    }
}
