//! Accept/reject counts and sentiment statistics over a set of verdicts.

use serde::{Deserialize, Serialize};

use super::verdict::{Decision, Verdict};
use crate::error::{Result, SimError};

/// Summary of a verdict list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub accept_count: usize,
    pub reject_count: usize,
    /// Sentiment per verdict, in input order.
    pub sentiment_scores: Vec<u8>,
    pub average_score: f64,
}

/// Reduces verdicts into a [`ScoreSummary`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreAggregator;

impl ScoreAggregator {
    /// Single pass over `verdicts`. Fails on an empty list, where the
    /// average is undefined.
    pub fn summarize(verdicts: &[Verdict]) -> Result<ScoreSummary> {
        if verdicts.is_empty() {
            return Err(SimError::empty_input(
                "score summary needs at least one verdict",
            ));
        }

        let mut accept_count = 0;
        let mut reject_count = 0;
        let mut sentiment_scores = Vec::with_capacity(verdicts.len());
        let mut total: u64 = 0;

        for verdict in verdicts {
            match verdict.decision {
                Decision::Accept => accept_count += 1,
                Decision::Reject => reject_count += 1,
            }
            sentiment_scores.push(verdict.sentiment_analysis);
            total += u64::from(verdict.sentiment_analysis);
        }

        Ok(ScoreSummary {
            accept_count,
            reject_count,
            average_score: total as f64 / verdicts.len() as f64,
            sentiment_scores,
        })
    }
}
