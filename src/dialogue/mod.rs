//! Scripted seller/buyer dialogue.
//!
//! - [`turn`] - roles, turns and transcripts
//! - [`capability`] - the chat and judge capability traits
//! - [`prompts`] - role instructions and the sentinel token
//! - [`engine`] - the dialogue state machine

pub mod capability;
pub mod engine;
pub mod prompts;
pub mod turn;

pub use capability::{ChatCapability, ChatSession, JudgeCapability, RoleConfig};
pub use engine::{
    ConversationResult, DialogueEngine, DialogueState, EndReason, DEFAULT_MAX_ROUND_TRIPS,
};
pub use prompts::SENTINEL;
pub use turn::{Role, Transcript, Turn};
