//! The serializable outcome of one simulation run.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::demographics::DemographicSummary;
use crate::dialogue::ConversationResult;
use crate::error::Result;
use crate::evaluation::{EvaluationFailure, ScoreSummary, Verdict};
use crate::pool::PersonaFailure;

/// Everything a run produced.
///
/// `verdicts` is positionally aligned with `results`; a `None` entry has a
/// matching record in `evaluation_failures`. Aggregates only cover
/// conversations that completed, and `scores` only covers those that were
/// also judged successfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub product_description: String,
    /// Personas requested for the run.
    pub persona_count: usize,
    pub results: Vec<ConversationResult>,
    pub failures: Vec<PersonaFailure>,
    pub verdicts: Vec<Option<Verdict>>,
    pub evaluation_failures: Vec<EvaluationFailure>,
    pub scores: Option<ScoreSummary>,
    pub demographics: Option<DemographicSummary>,
    /// Index into `results` of the highest-sentiment conversation.
    pub best_index: Option<usize>,
}

impl SimulationReport {
    pub fn new(product_description: impl Into<String>, persona_count: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            product_description: product_description.into(),
            persona_count,
            results: Vec::new(),
            failures: Vec::new(),
            verdicts: Vec::new(),
            evaluation_failures: Vec::new(),
            scores: None,
            demographics: None,
            best_index: None,
        }
    }

    pub fn best(&self) -> Option<&ConversationResult> {
        self.best_index.and_then(|i| self.results.get(i))
    }

    /// Successfully judged conversations with their verdicts.
    pub fn evaluated(&self) -> impl Iterator<Item = (&ConversationResult, &Verdict)> {
        self.results
            .iter()
            .zip(&self.verdicts)
            .filter_map(|(r, v)| v.as_ref().map(|v| (r, v)))
    }

    /// Write the report as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::info!("Saved report {} to {}", self.id, path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
