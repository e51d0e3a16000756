//! Kokoro Serve - an HTTP text-to-speech server.
//!
//! Accepts `{ text, language_code?, voice? }` on `POST /predict` and answers with
//! a complete WAV file synthesized by a Kokoro model (via sherpa-onnx). One
//! language pipeline is resident at a time and is swapped when a request asks
//! for a different language.

mod audio;
mod config;
mod error;
mod service;
mod tts;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::LocalTime;

use config::AppConfig;
use service::{AppState, CoordinatorSettings, RequestCoordinator};
use tts::{PipelineFactory, PipelineRegistry};

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("🛑 Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(e) => {
                        error!("Failed to register SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("🛑 Received SIGTERM, shutting down...");
        }
    }
}

/// Create the pipeline factory for the compiled-in backend.
#[cfg(feature = "kokoro")]
fn pipeline_factory(config: &AppConfig) -> Result<Box<dyn PipelineFactory>> {
    Ok(Box::new(tts::KokoroFactory::new(config)))
}

#[cfg(not(feature = "kokoro"))]
fn pipeline_factory(_config: &AppConfig) -> Result<Box<dyn PipelineFactory>> {
    anyhow::bail!("Built without a synthesis backend; rebuild with `--features kokoro`")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let config = AppConfig::from_args();

    // Respect RUST_LOG env var, fallback to verbose flag, default to info
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| if config.verbose { EnvFilter::try_new("debug") } else { EnvFilter::try_new("info") })
        .context("Invalid log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(LocalTime::new(time::macros::format_description!("[hour]:[minute]:[second]")))
        .init();

    info!("🔊 Kokoro Serve v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate() {
        error!("❌ Configuration error: {}", e);
        std::process::exit(1);
    }
    config.log_config();

    let registry = Arc::new(PipelineRegistry::new(pipeline_factory(&config)?));
    let coordinator = Arc::new(RequestCoordinator::new(registry.clone(), CoordinatorSettings::from_config(&config)));
    let app = service::router(AppState::new(coordinator));

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr).await.with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app).with_graceful_shutdown(wait_for_shutdown()).await.context("Server error")?;

    registry.release();
    info!("✅ Kokoro Serve stopped");
    Ok(())
}
