//! The two-party scripted sales dialogue.
//!
//! ```text
//! Opening ──seller reply──▶ BuyerTurn ──buyer reply──▶ SellerTurn ──seller reply──▶ BuyerTurn ...
//!                               │                          │
//!                               └── "finished" ────────────┴──▶ Finished(NormalEnd)
//!                               └── round-trip cap ───────────▶ Finished(MaxTurnsReached)
//! ```
//!
//! The sentinel reply ends the conversation but is never appended to the
//! transcript, so the judge only sees real dialogue.

use serde::{Deserialize, Serialize};

use super::capability::{ChatCapability, ChatSession};
use super::prompts::{self, is_sentinel};
use super::turn::{Role, Transcript, Turn};
use crate::demographics::Persona;
use crate::error::Result;

/// Maximum buyer/seller exchanges after the opening pitch.
pub const DEFAULT_MAX_ROUND_TRIPS: usize = 10;

/// Why a conversation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// One side emitted the sentinel.
    NormalEnd,
    /// The round-trip cap was hit first.
    MaxTurnsReached,
}

/// Dialogue states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueState {
    Opening,
    SellerTurn,
    BuyerTurn,
    Finished(EndReason),
}

/// One persona's finished conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationResult {
    pub persona: Persona,
    pub transcript: Transcript,
    pub end_reason: EndReason,
    /// Which side sent the sentinel, for a normal end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_by: Option<Role>,
}

/// Runs one seller/buyer conversation.
#[derive(Debug, Clone)]
pub struct DialogueEngine {
    max_round_trips: usize,
}

impl Default for DialogueEngine {
    fn default() -> Self {
        Self {
            max_round_trips: DEFAULT_MAX_ROUND_TRIPS,
        }
    }
}

impl DialogueEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_round_trips(mut self, max_round_trips: usize) -> Self {
        self.max_round_trips = max_round_trips;
        self
    }

    pub fn max_round_trips(&self) -> usize {
        self.max_round_trips
    }

    /// Drive the conversation for `persona` to completion or truncation.
    ///
    /// Any capability failure aborts this run with the capability's error.
    pub async fn run(
        &self,
        product_description: &str,
        persona: Persona,
        capability: &dyn ChatCapability,
    ) -> Result<ConversationResult> {
        let mut seller = capability.open_session(&prompts::seller_config(), &[]).await?;
        let mut buyer = capability
            .open_session(&prompts::buyer_config(&persona), &[])
            .await?;

        let mut transcript = Transcript::new();
        let mut last_reply = String::new();
        let mut round_trips = 0usize;
        let mut ended_by = None;
        let mut state = DialogueState::Opening;

        let end_reason = loop {
            state = match state {
                DialogueState::Opening => {
                    let opening = prompts::opening_message(product_description, &persona);
                    last_reply = seller.send(&opening).await?;
                    transcript.push(Turn::new(Role::ProductSide, last_reply.clone()));
                    DialogueState::BuyerTurn
                }
                DialogueState::BuyerTurn => {
                    if round_trips == self.max_round_trips {
                        DialogueState::Finished(EndReason::MaxTurnsReached)
                    } else {
                        round_trips += 1;
                        self.step(
                            buyer.as_mut(),
                            Role::PersonaSide,
                            &mut last_reply,
                            &mut transcript,
                            &mut ended_by,
                        )
                        .await?
                    }
                }
                DialogueState::SellerTurn => {
                    self.step(
                        seller.as_mut(),
                        Role::ProductSide,
                        &mut last_reply,
                        &mut transcript,
                        &mut ended_by,
                    )
                    .await?
                }
                DialogueState::Finished(reason) => break reason,
            };
        };

        log::debug!(
            "Conversation finished: reason={:?}, round_trips={}, turns={}",
            end_reason,
            round_trips,
            transcript.len()
        );

        Ok(ConversationResult {
            persona,
            transcript,
            end_reason,
            ended_by,
        })
    }

    /// Feed the previous reply to `speaker` and record the answer, or stop
    /// on the sentinel.
    async fn step(
        &self,
        session: &mut dyn ChatSession,
        speaker: Role,
        last_reply: &mut String,
        transcript: &mut Transcript,
        ended_by: &mut Option<Role>,
    ) -> Result<DialogueState> {
        let reply = session.send(last_reply.as_str()).await?;
        if is_sentinel(&reply) {
            *ended_by = Some(speaker);
            return Ok(DialogueState::Finished(EndReason::NormalEnd));
        }
        transcript.push(Turn::new(speaker, reply.clone()));
        *last_reply = reply;
        Ok(match speaker {
            Role::PersonaSide => DialogueState::SellerTurn,
            Role::ProductSide => DialogueState::BuyerTurn,
        })
    }
}
