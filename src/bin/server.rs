//! pitch-sim HTTP server binary.
//!
//! Starts an axum HTTP server that runs simulations on demand and serves
//! their analysis and audio to the front end.
//!
//! # Environment Variables
//!
//! - `GEMINI_KEY` - Gemini API key (or `GEMINI_API_KEY` / `GOOGLE_API_KEY`)
//! - `GEMINI_MODEL` - Model name (default: gemini-2.0-flash)
//! - `NUMBER_OF_PERSONAS` - Personas per run (default: 10)
//! - `MAX_CONCURRENCY` - Concurrent conversations (default: available parallelism)
//! - `DEMOGRAPHICS_PATH` - YAML or JSON demographic table
//! - `TTS_API_KEY` - Text-to-Speech API key (default: the Gemini key)
//! - `REPORT_PATH` - Write each run's report here as JSON
//! - `PORT` - HTTP port (default: 8000)
//! - `RUST_LOG` - Tracing filter (default: "info,pitch_sim=debug")
//!
//! # Usage
//!
//! ```bash
//! GEMINI_KEY=... cargo run --bin server
//! ```

use std::sync::Arc;

use anyhow::Context;
use pitch_sim::providers::GoogleSpeech;
use pitch_sim::server::{app_router, AppState};
use pitch_sim::speech::SpeechRenderer;
use pitch_sim::{SimConfig, SimulationPipeline};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pitch_sim=debug".into()),
        )
        .init();

    let config = SimConfig::from_env().context("failed to load configuration")?;
    let pipeline =
        SimulationPipeline::from_config(&config).context("failed to build simulation pipeline")?;
    let speech = GoogleSpeech::new(config.tts_api_key.clone())
        .context("failed to build speech provider")?;

    let mut state = AppState::new(pipeline, SpeechRenderer::new(Arc::new(speech)));
    if let Some(path) = &config.report_path {
        state = state.with_report_path(path.clone());
    }
    let app = app_router(state);

    let bind_addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("pitch-sim server starting on {}", bind_addr);
    tracing::info!(
        "model={}, personas per run={}",
        config.gemini_model,
        config.persona_count
    );

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    axum::serve(listener, app).await.context("server failed")?;
    Ok(())
}
