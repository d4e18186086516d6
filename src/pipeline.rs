//! End-to-end simulation: personas, conversations, judging and aggregation.

use std::sync::Arc;

use crate::config::{SimConfig, DEFAULT_MAX_PERSONAS, DEFAULT_PERSONA_COUNT};
use crate::demographics::{DemographicAggregator, DemographicCategoryTable, PersonaGenerator};
use crate::dialogue::{ChatCapability, JudgeCapability};
use crate::error::{Result, SimError};
use crate::evaluation::{pick_best, EvaluationFailure, PitchEvaluator, ScoreAggregator, Verdict};
use crate::pool::{CancelHandle, ConversationPool};
use crate::providers::GeminiChat;
use crate::report::SimulationReport;

/// Wires persona generation, the conversation pool and the evaluator
/// together behind a single [`run`](Self::run) call.
#[derive(Debug, Clone)]
pub struct SimulationPipeline {
    table: Arc<DemographicCategoryTable>,
    pool: ConversationPool,
    evaluator: PitchEvaluator,
    persona_count: usize,
    max_personas: usize,
}

impl SimulationPipeline {
    pub fn new(
        table: DemographicCategoryTable,
        pool: ConversationPool,
        evaluator: PitchEvaluator,
    ) -> Self {
        Self {
            table: Arc::new(table),
            pool,
            evaluator,
            persona_count: DEFAULT_PERSONA_COUNT,
            max_personas: DEFAULT_MAX_PERSONAS,
        }
    }

    /// Build a pipeline whose seller, buyer and judge all share `chat`.
    pub fn with_chat<C>(table: DemographicCategoryTable, chat: Arc<C>) -> Self
    where
        C: ChatCapability + 'static,
    {
        let capability: Arc<dyn ChatCapability> = chat.clone();
        let judge: Arc<dyn JudgeCapability> = chat;
        Self::new(
            table,
            ConversationPool::new(capability),
            PitchEvaluator::new(judge),
        )
    }

    /// Build the production pipeline: Gemini for every role and the
    /// configured demographic table.
    pub fn from_config(config: &SimConfig) -> Result<Self> {
        let table = match &config.demographics_path {
            Some(path) => DemographicCategoryTable::load(path)?,
            None => DemographicCategoryTable::default(),
        };
        let chat = Arc::new(GeminiChat::new(
            config.gemini_model.clone(),
            config.gemini_api_key.clone(),
        )?);
        let mut pipeline = Self::with_chat(table, chat)
            .with_persona_count(config.persona_count)
            .with_max_personas(config.max_personas);
        if let Some(workers) = config.max_concurrency {
            pipeline.pool = pipeline.pool.with_workers(workers);
        }
        Ok(pipeline)
    }

    /// Default persona count used by callers that do not pass one.
    pub fn with_persona_count(mut self, persona_count: usize) -> Self {
        self.persona_count = persona_count;
        self
    }

    /// Largest `n` that [`run`](Self::run) accepts.
    pub fn with_max_personas(mut self, max_personas: usize) -> Self {
        self.max_personas = max_personas;
        self
    }

    pub fn persona_count(&self) -> usize {
        self.persona_count
    }

    pub fn table(&self) -> &DemographicCategoryTable {
        &self.table
    }

    pub async fn run(&self, product_description: &str, n: usize) -> Result<SimulationReport> {
        self.run_with_cancel(product_description, n, &CancelHandle::new())
            .await
    }

    /// Run `n` conversations about `product_description`, judge them and
    /// aggregate the verdicts.
    ///
    /// Conversations and evaluations that fail are recorded in the report
    /// rather than failing the run. Only cancellation, bad input and an
    /// invalid table abort it.
    pub async fn run_with_cancel(
        &self,
        product_description: &str,
        n: usize,
        cancel: &CancelHandle,
    ) -> Result<SimulationReport> {
        let product = product_description.trim();
        if product.is_empty() {
            return Err(SimError::empty_input("product description is empty"));
        }
        if n == 0 {
            return Err(SimError::empty_input("persona count must be at least 1"));
        }
        if n > self.max_personas {
            return Err(SimError::invalid_input(format!(
                "persona count {} exceeds the limit of {}",
                n, self.max_personas
            )));
        }

        let personas = PersonaGenerator::generate_batch(&self.table, n)?;
        let outcome = self
            .pool
            .run_batch_with_cancel(personas, product, cancel)
            .await?;

        let mut report = SimulationReport::new(product, n);
        report.failures = outcome.failures;
        report.results = outcome.results;
        log::info!(
            "{} of {} conversations completed",
            report.results.len(),
            n
        );
        if report.results.is_empty() {
            return Ok(report);
        }

        let outcomes = tokio::select! {
            outcomes = self.evaluator.evaluate_all(&report.results) => outcomes,
            _ = cancel.cancelled() => return Err(SimError::Cancelled),
        };

        let mut verdicts: Vec<Verdict> = Vec::new();
        let mut indices: Vec<usize> = Vec::new();
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(verdict) => {
                    indices.push(index);
                    verdicts.push(verdict.clone());
                    report.verdicts.push(Some(verdict));
                }
                Err(error) => {
                    log::warn!("Evaluation of conversation #{} failed: {}", index, error);
                    report.evaluation_failures.push(EvaluationFailure {
                        index,
                        error: error.to_body(),
                    });
                    report.verdicts.push(None);
                }
            }
        }

        report.demographics = Some(DemographicAggregator::summarize(
            report.results.iter().map(|r| &r.persona),
            &self.table,
        )?);

        if !verdicts.is_empty() {
            let scores = ScoreAggregator::summarize(&verdicts)?;
            report.best_index = Some(*pick_best(&indices, &scores.sentiment_scores)?);
            report.scores = Some(scores);
        }

        Ok(report)
    }
}
