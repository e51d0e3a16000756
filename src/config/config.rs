//! Application configuration and CLI argument parsing.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::voices;

/// Sample rate of every chunk produced by a Kokoro pipeline.
pub const SAMPLE_RATE: u32 = 24000;

/// Language code used when a request does not specify one.
pub const DEFAULT_LANGUAGE_CODE: &str = "a";

/// Voice used when a request does not specify one.
pub const DEFAULT_VOICE: &str = "af_heart";

/// Speech speed multiplier applied to every request.
pub const DEFAULT_SPEED: f32 = 1.0;

/// Content type of every successful response body.
pub const CONTENT_TYPE_WAV: &str = "audio/wav";

/// Directory (under the model directory) holding the multi-lang Kokoro model.
const KOKORO_MODEL_SUBDIR: &str = "kokoro-multi-lang-v1_0";

/// Compute device a pipeline is bound to.
/// Auto-detected based on platform if not specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// CPU inference (default fallback, always available)
    #[default]
    Cpu,
    /// NVIDIA CUDA acceleration (Linux only, requires CUDA toolkit)
    Cuda,
    /// Apple CoreML acceleration (macOS only, uses Neural Engine)
    #[value(name = "coreml")]
    CoreMl,
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sherpa_provider())
    }
}

impl Device {
    /// Convert to sherpa-rs provider string.
    pub fn as_sherpa_provider(&self) -> &'static str {
        match self {
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
            Device::CoreMl => "coreml",
        }
    }
}

/// Server configuration.
#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(name = "kokoro-serve")]
#[command(author, version, about = "Text-to-speech HTTP server for Kokoro models", long_about = None)]
pub struct AppConfig {
    /// List all available TTS voices and exit
    #[arg(long)]
    pub list_voices: bool,

    /// Show detailed information about a specific voice and exit
    #[arg(long)]
    pub voice_info: Option<String>,

    /// Address to bind the HTTP server to
    #[arg(long, env = "KOKORO_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, short = 'p', env = "KOKORO_PORT", default_value = "8000")]
    pub port: u16,

    /// Directory containing the Kokoro model files
    #[arg(long, short = 'd', env = "MODEL_DIR", default_value_os_t = default_model_dir())]
    pub model_dir: PathBuf,

    /// Compute device for synthesis pipelines (auto-detected if not specified)
    #[arg(long, env = "KOKORO_DEVICE", value_enum)]
    pub device: Option<Device>,

    /// Language code used when a request omits `language_code`
    #[arg(long, default_value = DEFAULT_LANGUAGE_CODE)]
    pub default_language: String,

    /// Voice used when a request omits `voice`
    #[arg(long, default_value = DEFAULT_VOICE)]
    pub default_voice: String,

    /// Speech speed multiplier
    #[arg(long, default_value_t = DEFAULT_SPEED)]
    pub speed: f32,

    /// Inference threads per pipeline (0 = auto-detect based on CPU cores)
    #[arg(long, default_value = "0")]
    pub num_threads: usize,

    /// Enable verbose logging
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl AppConfig {
    /// Parse configuration from command line arguments.
    pub fn from_args() -> Self {
        let config = Self::parse();

        // Handle voice listing commands
        if config.list_voices {
            voices::print_voices();
            std::process::exit(0);
        }

        if let Some(ref voice_name) = config.voice_info {
            match voices::print_voice_info(voice_name) {
                Ok(_) => std::process::exit(0),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }

        config.normalized()
    }

    /// Resolve auto-detected values (device, thread count).
    ///
    /// With CUDA a single thread is used because the GPU handles parallelism
    /// internally; on CPU `cores/3` leaves headroom for concurrent requests.
    pub fn normalized(mut self) -> Self {
        let device = self.device.unwrap_or_else(detect_device);
        self.device = Some(device);

        if self.num_threads == 0 {
            self.num_threads = if device == Device::Cuda { 1 } else { (num_cpus::get() / 3).max(1) };
        }
        self
    }

    /// The device pipelines are bound to.
    pub fn effective_device(&self) -> Device {
        self.device.unwrap_or_else(detect_device)
    }

    /// The socket address to listen on.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port).parse().with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }

    /// Directory holding the multi-lang Kokoro model.
    pub fn kokoro_dir(&self) -> PathBuf {
        self.model_dir.join("tts").join(KOKORO_MODEL_SUBDIR)
    }

    /// Get the path to the Kokoro TTS model.
    pub fn tts_model_path(&self) -> PathBuf {
        self.kokoro_dir().join("model.onnx")
    }

    /// Get the path to the Kokoro TTS voices.bin file.
    pub fn tts_voices_path(&self) -> PathBuf {
        self.kokoro_dir().join("voices.bin")
    }

    /// Get the path to the TTS tokens file.
    pub fn tts_tokens_path(&self) -> PathBuf {
        self.kokoro_dir().join("tokens.txt")
    }

    /// Model files every pipeline needs, regardless of language.
    pub fn required_model_files(&self) -> [PathBuf; 3] {
        [self.tts_model_path(), self.tts_voices_path(), self.tts_tokens_path()]
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.speed <= 0.0 {
            anyhow::bail!("Speed must be positive");
        }

        if self.default_language.trim().is_empty() {
            anyhow::bail!("Default language code must not be empty");
        }

        if self.default_voice.trim().is_empty() {
            anyhow::bail!("Default voice must not be empty");
        }

        #[cfg(feature = "kokoro")]
        {
            if !self.model_dir.exists() {
                anyhow::bail!("Model directory does not exist: {}", self.model_dir.display());
            }

            for path in &self.required_model_files() {
                if !path.exists() {
                    anyhow::bail!("Required model file not found: {}", path.display());
                }
            }
        }

        Ok(())
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        info!("Configuration:");
        info!("  Listen address: {}:{}", self.host, self.port);
        info!("  Model directory: {}", self.model_dir.display());
        info!("  Device: {}", self.effective_device());
        info!("  Threads: {}", self.num_threads);
        info!("  Default language: {}", self.default_language);
        info!("  Default voice: {}", self.default_voice);
        info!("  Speed: {}", self.speed);
        info!("  Sample rate: {} Hz", SAMPLE_RATE);
    }
}

/// Get the default model directory (~/.kokoro-serve/models).
fn default_model_dir() -> PathBuf {
    if let Some(home_dir) = dirs::home_dir() {
        home_dir.join(".kokoro-serve").join("models")
    } else {
        PathBuf::from("models")
    }
}

/// Auto-detect the best compute device.
fn detect_device() -> Device {
    #[cfg(target_os = "macos")]
    {
        info!("Detected macOS, using CoreML device");
        Device::CoreMl
    }

    #[cfg(target_os = "linux")]
    {
        if has_nvidia_gpu() {
            info!("Detected NVIDIA GPU, using CUDA device");
            Device::Cuda
        } else {
            info!("No GPU detected, using CPU device");
            Device::Cpu
        }
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        info!("Using CPU device");
        Device::Cpu
    }
}

/// Check if an NVIDIA GPU is available (Linux only).
#[cfg(target_os = "linux")]
fn has_nvidia_gpu() -> bool {
    use std::path::Path;

    // Device nodes, including Jetson (Tegra) ones
    let nvidia_paths = ["/dev/nvidia0", "/dev/nvidiactl", "/dev/nvidia-uvm", "/dev/nvhost-ctrl", "/dev/nvhost-ctrl-gpu", "/etc/nv_tegra_release"];

    nvidia_paths.iter().any(|path| Path::new(path).exists())
}
