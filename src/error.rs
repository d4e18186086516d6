//! Error types for the simulation core.
//!
//! Every fallible operation in the crate returns [`Result`], whose error type
//! is [`SimError`]. The boundary layer uses [`SimError::kind`] to pick a
//! transport status and [`SimError::to_body`] to render a structured message.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors produced by the simulation core and its adapters.
#[derive(Debug, Error)]
pub enum SimError {
    /// Malformed or missing demographic category table, or bad settings.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// The chat, judge or speech capability failed (timeout, non-2xx, bad payload).
    #[error("upstream model error: {message}")]
    UpstreamModel { message: String },

    /// The judge reply could not be decoded into a verdict.
    #[error("evaluation parse error: {message}")]
    EvaluationParse {
        message: String,
        /// The reply exactly as received from the judge.
        raw_reply: String,
    },

    /// An aggregator was handed zero elements.
    #[error("empty input: {message}")]
    EmptyInput { message: String },

    /// A request argument is out of its allowed range.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Parallel arrays disagree in length.
    #[error("alignment error: {results} results but {scores} scores")]
    Alignment { results: usize, scores: usize },

    /// The batch was cancelled before it completed.
    #[error("batch cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SimError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamModel {
            message: message.into(),
        }
    }

    pub fn evaluation_parse(message: impl Into<String>, raw_reply: impl Into<String>) -> Self {
        Self::EvaluationParse {
            message: message.into(),
            raw_reply: raw_reply.into(),
        }
    }

    pub fn empty_input(message: impl Into<String>) -> Self {
        Self::EmptyInput {
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SimError::Config { .. } => ErrorKind::Config,
            SimError::UpstreamModel { .. } => ErrorKind::UpstreamModel,
            SimError::EvaluationParse { .. } => ErrorKind::EvaluationParse,
            SimError::EmptyInput { .. } => ErrorKind::EmptyInput,
            SimError::InvalidInput { .. } => ErrorKind::InvalidInput,
            SimError::Alignment { .. } => ErrorKind::Alignment,
            SimError::Cancelled => ErrorKind::Cancelled,
            SimError::Io(_) | SimError::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Whether the caller supplied bad input (as opposed to an upstream or
    /// internal failure).
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Config
                | ErrorKind::EmptyInput
                | ErrorKind::InvalidInput
                | ErrorKind::Alignment
        )
    }

    /// Structured form handed to the boundary layer.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// Error categories exposed at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    UpstreamModel,
    EvaluationParse,
    EmptyInput,
    InvalidInput,
    Alignment,
    Cancelled,
    Internal,
}

/// Human-readable error plus its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}
