//! Axum route handlers for the pitch simulation HTTP server.
//!
//! # Routes
//!
//! - `GET  /health`               - Returns `{"status": "ok", "version": ...}`
//! - `POST /conversation`         - Runs a simulation and stores its report
//! - `GET  /conversation/analyze` - Demographic breakdown and scores of the latest run
//! - `GET  /conversation/play`    - WAV rendering of the latest run's best conversation

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::{ErrorBody, ErrorKind, SimError};
use crate::pipeline::SimulationPipeline;
use crate::report::SimulationReport;
use crate::speech::SpeechRenderer;

/// Header carrying the speaker switch offsets of `/conversation/play`.
pub const SPEECH_SWITCH_HEADER: &str = "x-speech-switch";

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<SimulationPipeline>,
    pub renderer: SpeechRenderer,
    /// Report of the most recent completed run.
    pub latest: Arc<RwLock<Option<SimulationReport>>>,
    /// Where each report is written, if anywhere.
    pub report_path: Option<PathBuf>,
}

impl AppState {
    pub fn new(pipeline: SimulationPipeline, renderer: SpeechRenderer) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            renderer,
            latest: Arc::new(RwLock::new(None)),
            report_path: None,
        }
    }

    pub fn with_report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = Some(path.into());
        self
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/conversation", post(conversation_handler))
        .route("/conversation/analyze", get(analyze_handler))
        .route("/conversation/play", get(play_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of a request, rendered as `{kind, message}`.
#[derive(Debug)]
pub enum ApiError {
    Sim(SimError),
    /// No simulation has completed yet.
    NoReport,
}

impl From<SimError> for ApiError {
    fn from(e: SimError) -> Self {
        ApiError::Sim(e)
    }
}

/// HTTP status for an error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::EmptyInput | ErrorKind::InvalidInput | ErrorKind::Alignment => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorKind::UpstreamModel | ErrorKind::EvaluationParse => StatusCode::BAD_GATEWAY,
        ErrorKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Config | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Sim(e) => {
                let body: ErrorBody = e.to_body();
                if e.is_caller_error() {
                    log::debug!("Rejected request: {}", e);
                } else {
                    log::error!("Request failed: {}", e);
                }
                (status_for(body.kind), Json(body)).into_response()
            }
            ApiError::NoReport => (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "kind": "not_found",
                    "message": "no simulation has been run yet",
                })),
            )
                .into_response(),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /health - liveness probe.
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": "pitch-sim",
    }))
}

/// Body of `POST /conversation`.
#[derive(Debug, Deserialize)]
pub struct ConversationRequest {
    pub product_description: String,
    /// Falls back to the configured persona count.
    #[serde(default)]
    pub persona_count: Option<usize>,
}

/// POST /conversation - run a full simulation and return its report.
async fn conversation_handler(
    State(state): State<AppState>,
    Json(request): Json<ConversationRequest>,
) -> Result<Json<SimulationReport>, ApiError> {
    let n = request
        .persona_count
        .unwrap_or_else(|| state.pipeline.persona_count());
    let report = state.pipeline.run(&request.product_description, n).await?;

    if let Some(path) = &state.report_path {
        if let Err(e) = report.save(path) {
            log::warn!("Failed to save report to {}: {}", path.display(), e);
        }
    }
    *state.latest.write() = Some(report.clone());
    Ok(Json(report))
}

/// GET /conversation/analyze - demographics and scores of the latest run.
async fn analyze_handler(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let guard = state.latest.read();
    let report = guard.as_ref().ok_or(ApiError::NoReport)?;
    let analysis = report.demographics.as_ref().ok_or_else(|| {
        SimError::empty_input("the latest run has no completed conversations")
    })?;
    Ok(Json(json!({
        "analysis": analysis,
        "scores": report.scores,
    })))
}

/// GET /conversation/play - speak the best conversation of the latest run.
async fn play_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    let best = {
        let guard = state.latest.read();
        let report = guard.as_ref().ok_or(ApiError::NoReport)?;
        report
            .best()
            .cloned()
            .ok_or_else(|| SimError::empty_input("the latest run has no evaluated conversations"))?
    };

    let rendered = state.renderer.render(&best).await?;
    let switches = serde_json::to_string(&rendered.speech_switch_ms).map_err(SimError::from)?;
    let switches = HeaderValue::from_str(&switches)
        .map_err(|e| SimError::upstream(format!("invalid speech switch header: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("audio/wav")),
            (header::HeaderName::from_static(SPEECH_SWITCH_HEADER), switches),
            (
                header::ACCESS_CONTROL_EXPOSE_HEADERS,
                HeaderValue::from_static(SPEECH_SWITCH_HEADER),
            ),
        ],
        rendered.audio,
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
