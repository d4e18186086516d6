//! Text-to-speech rendering of a finished conversation.
//!
//! The seller always speaks with one voice; the buyer's voice follows the
//! persona's `sex` dimension. Each turn is synthesized separately and the
//! clips are stitched into a single mono 16-bit WAV stream.

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::demographics::Persona;
use crate::dialogue::{ConversationResult, Role};
use crate::error::{Result, SimError};

/// A synthesis voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    /// Provider voice name, e.g. `en-US-Neural2-J`.
    pub name: String,
    pub language_code: String,
}

impl Voice {
    pub fn new(name: impl Into<String>, language_code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language_code: language_code.into(),
        }
    }
}

/// Mono 16-bit PCM audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / u64::from(self.sample_rate)
    }
}

/// Speech synthesis backend.
#[async_trait]
pub trait SpeechCapability: Send + Sync + std::fmt::Debug {
    async fn synthesize(&self, voice: &Voice, text: &str) -> Result<AudioClip>;
}

/// Which voice speaks for which side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceCast {
    pub seller: Voice,
    pub buyer_female: Voice,
    pub buyer_male: Voice,
    /// Used when the persona has no recognisable `sex` value.
    pub buyer_default: Voice,
}

impl Default for VoiceCast {
    fn default() -> Self {
        Self {
            seller: Voice::new("en-US-Neural2-J", "en-US"),
            buyer_female: Voice::new("en-US-Neural2-F", "en-US"),
            buyer_male: Voice::new("en-US-Neural2-D", "en-US"),
            buyer_default: Voice::new("en-US-Neural2-C", "en-US"),
        }
    }
}

impl VoiceCast {
    pub fn voice_for(&self, role: Role, persona: &Persona) -> &Voice {
        match role {
            Role::ProductSide => &self.seller,
            Role::PersonaSide => match persona.get("sex").map(|s| s.trim().to_ascii_lowercase()) {
                Some(s) if s == "female" => &self.buyer_female,
                Some(s) if s == "male" => &self.buyer_male,
                _ => &self.buyer_default,
            },
        }
    }
}

/// A conversation rendered to one audio stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedConversation {
    /// Complete WAV file bytes.
    pub audio: Vec<u8>,
    /// Millisecond offset at which each turn starts, followed by the offset
    /// at which the audio ends.
    pub speech_switch_ms: Vec<u64>,
}

/// Renders transcripts through a [`SpeechCapability`].
#[derive(Debug, Clone)]
pub struct SpeechRenderer {
    speech: Arc<dyn SpeechCapability>,
    cast: VoiceCast,
}

impl SpeechRenderer {
    pub fn new(speech: Arc<dyn SpeechCapability>) -> Self {
        Self {
            speech,
            cast: VoiceCast::default(),
        }
    }

    pub fn with_cast(mut self, cast: VoiceCast) -> Self {
        self.cast = cast;
        self
    }

    pub async fn render(&self, conversation: &ConversationResult) -> Result<RenderedConversation> {
        let turns = conversation.transcript.turns();
        if turns.is_empty() {
            return Err(SimError::empty_input("cannot render an empty transcript"));
        }

        let mut samples: Vec<i16> = Vec::new();
        let mut sample_rate = None;
        let mut speech_switch_ms = Vec::with_capacity(turns.len() + 1);
        let mut elapsed_ms = 0u64;

        for turn in turns {
            let voice = self.cast.voice_for(turn.role, &conversation.persona);
            let clip = self.speech.synthesize(voice, &turn.text()).await?;
            match sample_rate {
                None => sample_rate = Some(clip.sample_rate),
                Some(rate) if rate != clip.sample_rate => {
                    return Err(SimError::upstream(format!(
                        "speech clips disagree on sample rate ({} vs {})",
                        rate, clip.sample_rate
                    )))
                }
                Some(_) => {}
            }
            speech_switch_ms.push(elapsed_ms);
            elapsed_ms += clip.duration_ms();
            samples.extend_from_slice(&clip.samples);
        }
        speech_switch_ms.push(elapsed_ms);

        let audio = encode_wav(&samples, sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE))?;
        log::info!(
            "Rendered {} turns into {} ms of audio",
            turns.len(),
            elapsed_ms
        );
        Ok(RenderedConversation {
            audio,
            speech_switch_ms,
        })
    }
}

/// Sample rate requested from speech providers.
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Encode mono 16-bit samples as a WAV file.
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut buffer, spec).map_err(wav_error)?;
        for &sample in samples {
            writer.write_sample(sample).map_err(wav_error)?;
        }
        writer.finalize().map_err(wav_error)?;
    }
    Ok(buffer.into_inner())
}

/// Decode a mono 16-bit WAV file.
pub fn decode_wav(bytes: &[u8]) -> Result<AudioClip> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).map_err(wav_error)?;
    let spec = reader.spec();
    if spec.channels != 1 || spec.bits_per_sample != 16 {
        return Err(SimError::upstream(format!(
            "expected mono 16-bit audio, got {} channels at {} bits",
            spec.channels, spec.bits_per_sample
        )));
    }
    let samples = reader
        .into_samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(wav_error)?;
    Ok(AudioClip {
        samples,
        sample_rate: spec.sample_rate,
    })
}

fn wav_error(e: hound::Error) -> SimError {
    SimError::upstream(format!("wav encoding error: {}", e))
}
