//! HTTP surface for the coordinator.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::config::voices;
use crate::error::TtsError;

use super::coordinator::RequestCoordinator;

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    coordinator: Arc<RequestCoordinator>,
    in_flight: Arc<AtomicUsize>, // Number of /predict calls in progress
}

impl AppState {
    pub fn new(coordinator: Arc<RequestCoordinator>) -> Self {
        Self { coordinator, in_flight: Arc::new(AtomicUsize::new(0)) }
    }
}

/// Counts a request as in flight until dropped.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Error body returned with every non-2xx response.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<TtsError> for ApiError {
    fn from(err: TtsError) -> Self {
        let status = match &err {
            TtsError::FieldMissing(_) | TtsError::InvalidField { .. } => StatusCode::BAD_REQUEST,
            TtsError::EmptyAudio => StatusCode::UNPROCESSABLE_ENTITY,
            TtsError::PipelineInitialization { .. } => StatusCode::SERVICE_UNAVAILABLE,
            TtsError::Synthesis { .. } | TtsError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Include the underlying cause, e.g. which model file is missing
        let message = match std::error::Error::source(&err) {
            Some(source) => format!("{}: {}", err, source),
            None => err.to_string(),
        };

        Self { status, message }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // Keep axum's status (400, 415, 422) but report it in the JSON error shape
        Self { status: rejection.status(), message: rejection.body_text() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health))
        .route("/voices", get(list_voices))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Synthesize speech for a JSON request body.
async fn predict(State(state): State<AppState>, payload: Result<Json<Value>, JsonRejection>) -> Result<Response, ApiError> {
    let Json(body) = payload?;
    let _in_flight = InFlight::enter(&state.in_flight);
    let coordinator = state.coordinator.clone();

    let response = tokio::task::spawn_blocking(move || coordinator.handle(body)).await.map_err(|e| {
        error!("Synthesis worker panicked: {}", e);
        ApiError { status: StatusCode::INTERNAL_SERVER_ERROR, message: "synthesis worker failed".to_string() }
    })??;

    Ok(([(header::CONTENT_TYPE, response.content_type)], response.body).into_response())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    active_language: Option<String>,
    in_flight: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        active_language: state.coordinator.registry().active_language(),
        in_flight: state.in_flight.load(Ordering::SeqCst),
    })
}

#[derive(Serialize)]
struct VoiceEntry {
    name: &'static str,
    speaker_id: i32,
}

#[derive(Serialize)]
struct LanguageEntry {
    code: &'static str,
    name: &'static str,
    voices: Vec<VoiceEntry>,
}

async fn list_voices() -> Json<Vec<LanguageEntry>> {
    let languages = voices::languages()
        .iter()
        .map(|language| LanguageEntry {
            code: language.code,
            name: language.name,
            voices: voices::voices_for(language).into_iter().map(|v| VoiceEntry { name: v.name, speaker_id: v.speaker_id }).collect(),
        })
        .collect();

    Json(languages)
}
