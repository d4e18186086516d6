//! Runtime configuration read from the environment.

use std::path::PathBuf;

use crate::error::{Result, SimError};
use crate::providers::DEFAULT_GEMINI_MODEL;

/// Personas simulated per run when the caller does not say otherwise.
pub const DEFAULT_PERSONA_COUNT: usize = 10;

/// Upper bound on the personas a single run may request.
pub const DEFAULT_MAX_PERSONAS: usize = 100;

/// Port the HTTP server listens on by default.
pub const DEFAULT_PORT: u16 = 8000;

/// Configuration for a simulation run and the server around it.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Gemini API key.
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub persona_count: usize,
    /// Largest persona count a run accepts.
    pub max_personas: usize,
    /// Concurrent conversations; `None` uses the available parallelism.
    pub max_concurrency: Option<usize>,
    /// YAML or JSON demographic table; `None` uses the built-in table.
    pub demographics_path: Option<PathBuf>,
    /// Text-to-Speech API key. Falls back to the Gemini key.
    pub tts_api_key: String,
    /// Where to write the JSON report of each run.
    pub report_path: Option<PathBuf>,
    pub port: u16,
}

impl SimConfig {
    /// Load from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let gemini_api_key = var("GEMINI_KEY")
            .or_else(|| var("GEMINI_API_KEY"))
            .or_else(|| var("GOOGLE_API_KEY"))
            .ok_or_else(|| {
                SimError::config("Gemini API key not set. Set GEMINI_KEY or GEMINI_API_KEY.")
            })?;

        let persona_count = match var("NUMBER_OF_PERSONAS") {
            Some(v) => parse_positive("NUMBER_OF_PERSONAS", &v)?,
            None => DEFAULT_PERSONA_COUNT,
        };
        let max_personas = match var("MAX_PERSONAS") {
            Some(v) => parse_positive("MAX_PERSONAS", &v)?,
            None => DEFAULT_MAX_PERSONAS,
        };
        if persona_count > max_personas {
            return Err(SimError::config(format!(
                "NUMBER_OF_PERSONAS ({}) exceeds MAX_PERSONAS ({})",
                persona_count, max_personas
            )));
        }
        let max_concurrency = var("MAX_CONCURRENCY")
            .map(|v| parse_positive("MAX_CONCURRENCY", &v))
            .transpose()?;
        let port = match var("PORT") {
            Some(v) => v
                .trim()
                .parse::<u16>()
                .map_err(|e| SimError::config(format!("invalid PORT {:?}: {}", v, e)))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            tts_api_key: var("TTS_API_KEY").unwrap_or_else(|| gemini_api_key.clone()),
            gemini_api_key,
            gemini_model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.into()),
            persona_count,
            max_personas,
            max_concurrency,
            demographics_path: var("DEMOGRAPHICS_PATH").map(PathBuf::from),
            report_path: var("REPORT_PATH").map(PathBuf::from),
            port,
        })
    }
}

fn parse_positive(name: &str, value: &str) -> Result<usize> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err(SimError::config(format!("{} must be at least 1", name))),
        Ok(n) => Ok(n),
        Err(e) => Err(SimError::config(format!(
            "invalid {} {:?}: {}",
            name, value, e
        ))),
    }
}
