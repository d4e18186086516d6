//! Scripted in-memory capabilities shared by the unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::dialogue::{ChatCapability, ChatSession, RoleConfig, Turn};
use crate::error::{Result, SimError};
use crate::speech::{AudioClip, SpeechCapability, Voice};

/// One message received by a scripted session.
#[derive(Debug, Clone)]
pub(crate) struct SentMessage {
    pub role: String,
    pub instruction: String,
    pub prior_turns: usize,
    pub message: String,
}

/// Replies from a fixed per-role script. Once a script runs out the last
/// reply repeats.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedChat {
    scripts: HashMap<String, Vec<String>>,
    failing_marker: Option<String>,
    delay: Option<Duration>,
    log: Arc<Mutex<Vec<SentMessage>>>,
}

impl ScriptedChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, role: &str, replies: &[&str]) -> Self {
        self.scripts.insert(
            role.to_string(),
            replies.iter().map(|r| r.to_string()).collect(),
        );
        self
    }

    /// Sessions whose system instruction contains `marker` fail on every send.
    pub fn fail_when_instruction_contains(mut self, marker: &str) -> Self {
        self.failing_marker = Some(marker.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatCapability for ScriptedChat {
    async fn open_session(
        &self,
        config: &RoleConfig,
        prior_turns: &[Turn],
    ) -> Result<Box<dyn ChatSession>> {
        let fails = self
            .failing_marker
            .as_deref()
            .map(|m| config.system_instruction.contains(m))
            .unwrap_or(false);
        Ok(Box::new(ScriptedSession {
            role: config.name.clone(),
            instruction: config.system_instruction.clone(),
            prior_turns: prior_turns.len(),
            replies: self.scripts.get(&config.name).cloned().unwrap_or_default(),
            cursor: 0,
            fails,
            delay: self.delay,
            log: Arc::clone(&self.log),
        }))
    }
}

struct ScriptedSession {
    role: String,
    instruction: String,
    prior_turns: usize,
    replies: Vec<String>,
    cursor: usize,
    fails: bool,
    delay: Option<Duration>,
    log: Arc<Mutex<Vec<SentMessage>>>,
}

#[async_trait]
impl ChatSession for ScriptedSession {
    async fn send(&mut self, message: &str) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.log.lock().unwrap().push(SentMessage {
            role: self.role.clone(),
            instruction: self.instruction.clone(),
            prior_turns: self.prior_turns,
            message: message.to_string(),
        });
        if self.fails {
            return Err(SimError::upstream(format!("scripted {} failure", self.role)));
        }
        let reply = self
            .replies
            .get(self.cursor)
            .or_else(|| self.replies.last())
            .cloned()
            .unwrap_or_else(|| "...".to_string());
        self.cursor += 1;
        Ok(reply)
    }
}

/// Speech double: every clip is silence at 16 kHz lasting 100 ms per word.
#[derive(Debug, Clone, Default)]
pub(crate) struct SilentSpeech {
    pub calls: Arc<Mutex<Vec<(String, String)>>>,
}

#[async_trait]
impl SpeechCapability for SilentSpeech {
    async fn synthesize(&self, voice: &Voice, text: &str) -> Result<AudioClip> {
        self.calls
            .lock()
            .unwrap()
            .push((voice.name.clone(), text.to_string()));
        Ok(AudioClip {
            samples: vec![0; 1600 * text.split_whitespace().count()],
            sample_rate: 16_000,
        })
    }
}
