//! Chat capability traits consumed by the dialogue engine and the evaluator.
//!
//! The core never talks to a model provider directly. Callers construct a
//! capability once (see [`crate::providers`]) and pass it down explicitly.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::turn::Turn;
use crate::error::Result;

/// Default sampling temperature for every role.
pub const DEFAULT_TEMPERATURE: f64 = 0.1;
/// Default nucleus sampling parameter.
pub const DEFAULT_TOP_P: f64 = 0.5;
/// Default top-k sampling parameter.
pub const DEFAULT_TOP_K: u32 = 64;
/// Default output cap in tokens.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1000;

/// Fixed configuration of one chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Short name used in logs ("seller", "buyer", "judge").
    pub name: String,
    pub system_instruction: String,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl RoleConfig {
    pub fn new(name: impl Into<String>, system_instruction: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_instruction: system_instruction.into(),
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            top_k: DEFAULT_TOP_K,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }
}

/// A stateful conversation with a model. Each `send` sees everything sent
/// and received on this session before it.
#[async_trait]
pub trait ChatSession: Send {
    async fn send(&mut self, message: &str) -> Result<String>;
}

/// Factory for independent chat sessions.
///
/// Implementations must allow many sessions to be open and used
/// concurrently. Failures surface as [`crate::SimError::UpstreamModel`].
#[async_trait]
pub trait ChatCapability: Send + Sync + fmt::Debug {
    /// Open a session configured with `config`, seeded with `prior_turns`
    /// as earlier conversation context.
    async fn open_session(
        &self,
        config: &RoleConfig,
        prior_turns: &[Turn],
    ) -> Result<Box<dyn ChatSession>>;
}

/// Capability used to judge finished transcripts.
///
/// Any [`ChatCapability`] can act as a judge; the separate trait keeps the
/// evaluator's dependency explicit.
#[async_trait]
pub trait JudgeCapability: Send + Sync {
    async fn open_judge_session(
        &self,
        config: &RoleConfig,
        prior_turns: &[Turn],
    ) -> Result<Box<dyn ChatSession>>;
}

#[async_trait]
impl<T: ChatCapability + ?Sized> JudgeCapability for T {
    async fn open_judge_session(
        &self,
        config: &RoleConfig,
        prior_turns: &[Turn],
    ) -> Result<Box<dyn ChatSession>> {
        self.open_session(config, prior_turns).await
    }
}
