//! Evaluation of finished conversations.
//!
//! - [`verdict`] - the verdict type and its strict decoder
//! - [`evaluator`] - per-transcript judging
//! - [`scores`] - accept/reject and sentiment aggregation
//! - [`best`] - selecting the highest-scoring conversation

pub mod best;
pub mod evaluator;
pub mod scores;
pub mod verdict;

pub use best::pick_best;
pub use evaluator::{EvaluationFailure, PitchEvaluator};
pub use scores::{ScoreAggregator, ScoreSummary};
pub use verdict::{parse_verdict, Decision, Verdict};
