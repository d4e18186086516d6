//! Judges finished transcripts.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use super::verdict::{parse_verdict, Verdict};
use crate::dialogue::prompts::{judge_config, BEGIN_EVALUATION_PROMPT};
use crate::dialogue::{ConversationResult, JudgeCapability, RoleConfig, Transcript};
use crate::error::{ErrorBody, Result, SimError};

/// Default number of judge calls in flight during [`PitchEvaluator::evaluate_all`].
pub const DEFAULT_EVALUATION_CONCURRENCY: usize = 4;

/// A transcript whose evaluation failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationFailure {
    /// Index into the evaluated result list.
    pub index: usize,
    pub error: ErrorBody,
}

/// Sends each transcript to a fresh judge session and decodes the verdict.
#[derive(Clone)]
pub struct PitchEvaluator {
    judge: Arc<dyn JudgeCapability>,
    config: RoleConfig,
    concurrency: usize,
}

impl std::fmt::Debug for PitchEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PitchEvaluator")
            .field("config", &self.config.name)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl PitchEvaluator {
    pub fn new(judge: Arc<dyn JudgeCapability>) -> Self {
        Self {
            judge,
            config: judge_config(),
            concurrency: DEFAULT_EVALUATION_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Evaluate one transcript.
    ///
    /// The transcript is replayed as prior context, then the judge is asked
    /// to begin. Upstream failures and undecodable replies are returned as
    /// errors, never defaulted.
    pub async fn evaluate(&self, transcript: &Transcript) -> Result<Verdict> {
        if transcript.is_empty() {
            return Err(SimError::empty_input("cannot evaluate an empty transcript"));
        }
        let mut session = self
            .judge
            .open_judge_session(&self.config, transcript.turns())
            .await?;
        let reply = session.send(BEGIN_EVALUATION_PROMPT).await?;
        let verdict = parse_verdict(&reply)?;
        log::debug!(
            "Verdict: decision={}, sentiment={}",
            verdict.decision,
            verdict.sentiment_analysis
        );
        Ok(verdict)
    }

    /// Evaluate every result. The output is positionally aligned with
    /// `results`.
    pub async fn evaluate_all(&self, results: &[ConversationResult]) -> Vec<Result<Verdict>> {
        let pending: Vec<_> = results
            .iter()
            .map(|r| self.evaluate(&r.transcript))
            .collect();
        stream::iter(pending)
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::{EndReason, Role, Turn};
    use crate::evaluation::Decision;
    use crate::testing::ScriptedChat;

    fn transcript() -> Transcript {
        vec![
            Turn::new(Role::ProductSide, "Buy this phone."),
            Turn::new(Role::PersonaSide, "Sure, I'll take one."),
        ]
        .into()
    }

    fn result(transcript: Transcript) -> ConversationResult {
        ConversationResult {
            persona: vec![("sex".to_string(), "Male".to_string())]
                .into_iter()
                .collect(),
            transcript,
            end_reason: EndReason::NormalEnd,
            ended_by: Some(Role::PersonaSide),
        }
    }

    #[tokio::test]
    async fn test_evaluate_replays_transcript() {
        let judge = ScriptedChat::new().script(
            "judge",
            &["```json\n{\"decision\": \"accept\", \"sentiment_analysis\": 9, \"reasoning\": \"Bought it.\"}\n```"],
        );
        let evaluator = PitchEvaluator::new(Arc::new(judge.clone()));

        let verdict = evaluator.evaluate(&transcript()).await.unwrap();
        assert_eq!(verdict.decision, Decision::Accept);
        assert_eq!(verdict.sentiment_analysis, 9);

        let sent = judge.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].prior_turns, 2);
        assert_eq!(sent[0].message, BEGIN_EVALUATION_PROMPT);
    }

    #[tokio::test]
    async fn test_evaluate_surfaces_parse_error() {
        let judge = ScriptedChat::new().script("judge", &["I think they liked it."]);
        let evaluator = PitchEvaluator::new(Arc::new(judge));
        let err = evaluator.evaluate(&transcript()).await.unwrap_err();
        assert!(matches!(err, SimError::EvaluationParse { .. }));
    }

    #[tokio::test]
    async fn test_evaluate_empty_transcript() {
        let evaluator = PitchEvaluator::new(Arc::new(ScriptedChat::new()));
        let err = evaluator.evaluate(&Transcript::new()).await.unwrap_err();
        assert!(matches!(err, SimError::EmptyInput { .. }));
    }

    #[tokio::test]
    async fn test_evaluate_all_is_aligned_and_isolates_failures() {
        // Each judge session starts its script from the top, so every
        // transcript gets the first reply unless the session fails.
        let judge = ScriptedChat::new().script(
            "judge",
            &[r#"{"decision": "reject", "sentiment_analysis": 3, "reasoning": "Not convinced."}"#],
        );
        let evaluator = PitchEvaluator::new(Arc::new(judge)).with_concurrency(2);
        let results = vec![result(transcript()), result(Transcript::new()), result(transcript())];

        let outcomes = evaluator.evaluate_all(&results).await;
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].as_ref().unwrap().sentiment_analysis, 3);
        assert!(outcomes[1].is_err());
        assert_eq!(outcomes[2].as_ref().unwrap().decision, Decision::Reject);
    }
}
