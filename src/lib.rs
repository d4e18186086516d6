//! # pitch-sim
//!
//! Simulates sales pitches against synthetic customer personas.
//!
//! A run samples personas from a demographic table, lets an LLM seller and an
//! LLM buyer talk until one of them ends the conversation, asks an LLM judge
//! for a verdict on every transcript, and aggregates the verdicts alongside a
//! demographic breakdown. The best conversation can be rendered to speech.
//!
//! Model and speech providers sit behind capability traits
//! ([`ChatCapability`], [`JudgeCapability`], [`speech::SpeechCapability`])
//! so the core runs unchanged against scripted doubles.

pub mod config;
pub mod demographics;
pub mod dialogue;
pub mod error;
pub mod evaluation;
pub mod pipeline;
pub mod pool;
pub mod providers;
pub mod report;
pub mod server;
pub mod speech;

#[cfg(test)]
mod testing;

pub use config::SimConfig;
pub use demographics::{
    DemographicAggregator, DemographicCategoryTable, DemographicSummary, Persona,
    PersonaGenerator,
};
pub use dialogue::{
    ChatCapability, ChatSession, ConversationResult, DialogueEngine, EndReason,
    JudgeCapability, Role, Transcript, Turn,
};
pub use error::{ErrorKind, Result, SimError};
pub use evaluation::{pick_best, Decision, PitchEvaluator, ScoreAggregator, ScoreSummary, Verdict};
pub use pipeline::SimulationPipeline;
pub use pool::{BatchOutcome, CancelHandle, ConversationPool};
pub use report::SimulationReport;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
