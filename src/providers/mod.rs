//! Concrete model and speech providers.
//!
//! - [`gemini`] - chat sessions over the Gemini `generateContent` API
//! - [`google_tts`] - LINEAR16 speech from Google Cloud Text-to-Speech

pub mod gemini;
pub mod google_tts;

pub use gemini::{GeminiChat, DEFAULT_GEMINI_MODEL};
pub use google_tts::GoogleSpeech;
