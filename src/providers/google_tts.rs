//! Google Cloud Text-to-Speech provider.
//!
//! Requests LINEAR16 audio, which the API returns as a base64 encoded WAV
//! file in `audioContent`.

use async_trait::async_trait;
use base64::Engine as _;
use serde_json::{json, Value};

use super::gemini::REQUEST_TIMEOUT;
use crate::error::{Result, SimError};
use crate::speech::{decode_wav, AudioClip, SpeechCapability, Voice, DEFAULT_SAMPLE_RATE};

/// Public Text-to-Speech API base.
pub const TTS_API_BASE: &str = "https://texttospeech.googleapis.com/v1";

/// [`SpeechCapability`] backed by Google Cloud Text-to-Speech.
#[derive(Clone)]
pub struct GoogleSpeech {
    api_key: String,
    base_url: String,
    sample_rate: u32,
    client: reqwest::Client,
}

impl std::fmt::Debug for GoogleSpeech {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSpeech")
            .field("base_url", &self.base_url)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

impl GoogleSpeech {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SimError::config("Text-to-Speech API key is empty"));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SimError::config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            api_key,
            base_url: TTS_API_BASE.to_string(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            client,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    fn request_body(&self, voice: &Voice, text: &str) -> Value {
        json!({
            "input": { "text": text },
            "voice": { "languageCode": voice.language_code, "name": voice.name },
            "audioConfig": {
                "audioEncoding": "LINEAR16",
                "sampleRateHertz": self.sample_rate,
            },
        })
    }
}

#[async_trait]
impl SpeechCapability for GoogleSpeech {
    async fn synthesize(&self, voice: &Voice, text: &str) -> Result<AudioClip> {
        log::debug!("Synthesizing {} chars with voice {}", text.len(), voice.name);

        let response = self
            .client
            .post(format!("{}/text:synthesize", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(voice, text))
            .send()
            .await
            .map_err(|e| SimError::upstream(format!("Text-to-Speech request failed: {}", e)))?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            SimError::upstream(format!("failed to parse Text-to-Speech response: {}", e))
        })?;

        if !status.is_success() {
            let msg = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(SimError::upstream(format!(
                "Text-to-Speech API error ({}): {}",
                status, msg
            )));
        }

        let encoded = body
            .get("audioContent")
            .and_then(Value::as_str)
            .ok_or_else(|| SimError::upstream("no audioContent in Text-to-Speech response"))?;
        let wav = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| SimError::upstream(format!("invalid audioContent: {}", e)))?;
        decode_wav(&wav)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use base64::Engine as _;

    use crate::speech::encode_wav;

    async fn fake_tts(status: StatusCode, reply: Value) -> String {
        let app = Router::new().route(
            "/v1/:action",
            post(move |Json(_body): Json<Value>| {
                let reply = reply.clone();
                async move { (status, Json(reply)) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/v1", addr)
    }

    #[test]
    fn test_request_body_shape() {
        let speech = GoogleSpeech::new("k").unwrap().with_sample_rate(16_000);
        let body = speech.request_body(&Voice::new("en-US-Neural2-F", "en-US"), "hello");
        assert_eq!(body["input"]["text"], "hello");
        assert_eq!(body["voice"]["name"], "en-US-Neural2-F");
        assert_eq!(body["audioConfig"]["audioEncoding"], "LINEAR16");
        assert_eq!(body["audioConfig"]["sampleRateHertz"], 16_000);
    }

    #[tokio::test]
    async fn test_synthesize_decodes_audio() {
        let wav = encode_wav(&[0, 10, -10, 20], 24_000).unwrap();
        let encoded = base64::engine::general_purpose::STANDARD.encode(wav);
        let base = fake_tts(StatusCode::OK, json!({ "audioContent": encoded })).await;

        let speech = GoogleSpeech::new("k").unwrap().with_base_url(base);
        let clip = speech
            .synthesize(&Voice::new("en-US-Neural2-J", "en-US"), "hi")
            .await
            .unwrap();
        assert_eq!(clip.samples, vec![0, 10, -10, 20]);
        assert_eq!(clip.sample_rate, 24_000);
    }

    #[tokio::test]
    async fn test_synthesize_error_status() {
        let base = fake_tts(
            StatusCode::FORBIDDEN,
            json!({ "error": { "message": "API key not valid" } }),
        )
        .await;
        let speech = GoogleSpeech::new("k").unwrap().with_base_url(base);
        let err = speech
            .synthesize(&Voice::new("en-US-Neural2-J", "en-US"), "hi")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("API key not valid"));
    }
}
