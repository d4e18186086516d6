//! Google Gemini chat provider.
//!
//! Talks to the `generateContent` REST endpoint. Each session keeps its own
//! `contents` history and resends it on every call, so sessions are fully
//! independent and can run concurrently against one shared client.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::dialogue::{ChatCapability, ChatSession, RoleConfig, Turn};
use crate::error::{Result, SimError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Public Gemini API base.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used when none is configured.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// GeminiChat
// ---------------------------------------------------------------------------

/// [`ChatCapability`] backed by the Gemini API.
///
/// # Example
///
/// ```ignore
/// let chat = GeminiChat::new("gemini-2.0-flash", api_key)?;
/// let mut session = chat.open_session(&seller_config(), &[]).await?;
/// let reply = session.send("Hello").await?;
/// ```
#[derive(Clone)]
pub struct GeminiChat {
    model: String,
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiChat")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiChat {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SimError::config("Gemini API key is empty"));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SimError::config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            model: model.into(),
            api_key,
            base_url: GEMINI_API_BASE.to_string(),
            client,
        })
    }

    /// Point the client at a different API base (proxies, local fakes).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl ChatCapability for GeminiChat {
    async fn open_session(
        &self,
        config: &RoleConfig,
        prior_turns: &[Turn],
    ) -> Result<Box<dyn ChatSession>> {
        let mut contents = Vec::new();
        for turn in prior_turns {
            push_user_text(&mut contents, &format!("{}: {}", turn.role.label(), turn.text()));
        }
        log::debug!(
            "Opening Gemini session: role={}, model={}, prior_turns={}",
            config.name,
            self.model,
            prior_turns.len()
        );
        Ok(Box::new(GeminiSession {
            chat: self.clone(),
            role: config.name.clone(),
            system_instruction: config.system_instruction.clone(),
            generation_config: generation_config(config),
            contents,
        }))
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

struct GeminiSession {
    chat: GeminiChat,
    role: String,
    system_instruction: String,
    generation_config: Value,
    contents: Vec<Value>,
}

impl GeminiSession {
    fn request_body(&self) -> Value {
        json!({
            "contents": self.contents,
            "generationConfig": self.generation_config,
            "systemInstruction": { "parts": [{ "text": self.system_instruction }] },
        })
    }

    async fn post(&self) -> Result<String> {
        let response = self
            .chat
            .client
            .post(self.chat.endpoint())
            .header("content-type", "application/json")
            .query(&[("key", self.chat.api_key.as_str())])
            .json(&self.request_body())
            .send()
            .await
            .map_err(|e| SimError::upstream(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SimError::upstream(format!("failed to read Gemini response: {}", e)))?;

        if !status.is_success() {
            return Err(SimError::upstream(format!(
                "Gemini API error ({}): {}",
                status,
                truncate(&text, 500)
            )));
        }

        let body: Value = serde_json::from_str(&text).map_err(|e| {
            SimError::upstream(format!(
                "failed to parse Gemini response: {} - Body: {}",
                e,
                truncate(&text, 500)
            ))
        })?;
        parse_reply(&body)
    }
}

#[async_trait]
impl ChatSession for GeminiSession {
    async fn send(&mut self, message: &str) -> Result<String> {
        let before = self.contents.clone();
        push_user_text(&mut self.contents, message);
        match self.post().await {
            Ok(reply) => {
                self.contents
                    .push(json!({ "role": "model", "parts": [{ "text": reply }] }));
                Ok(reply)
            }
            Err(e) => {
                log::warn!("Gemini {} session call failed: {}", self.role, e);
                // Drop the unanswered message.
                self.contents = before;
                Err(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Request/response shaping
// ---------------------------------------------------------------------------

/// Sampling parameters in Gemini's `generationConfig` shape.
pub fn generation_config(config: &RoleConfig) -> Value {
    json!({
        "temperature": config.temperature,
        "topP": config.top_p,
        "topK": config.top_k,
        "maxOutputTokens": config.max_output_tokens,
    })
}

/// Append a user part, merging into a trailing user content so that user
/// and model contents keep alternating.
fn push_user_text(contents: &mut Vec<Value>, text: &str) {
    if let Some(last) = contents.last_mut() {
        if last.get("role").and_then(Value::as_str) == Some("user") {
            if let Some(parts) = last.get_mut("parts").and_then(Value::as_array_mut) {
                parts.push(json!({ "text": text }));
                return;
            }
        }
    }
    contents.push(json!({ "role": "user", "parts": [{ "text": text }] }));
}

/// Concatenate the text parts of the first candidate.
fn parse_reply(body: &Value) -> Result<String> {
    if let Some(error) = body.get("error") {
        let msg = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown Gemini API error");
        return Err(SimError::upstream(format!("Gemini API error: {}", msg)));
    }

    let candidate = body
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .ok_or_else(|| SimError::upstream("no candidates in Gemini response"))?;

    let parts = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            let reason = candidate
                .get("finishReason")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            SimError::upstream(format!(
                "no content in Gemini response (finishReason: {})",
                reason
            ))
        })?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();

    if let Some(usage) = body.get("usageMetadata") {
        log::debug!("Gemini usage: {}", usage);
    }
    Ok(text)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
