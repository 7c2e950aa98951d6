//! Spoken replies.
//!
//! Only a bounded prefix of each reply is voiced. Synthesis is best-effort:
//! a failure is logged and the turn goes on without audio.

use crate::config::SpeechConfig;
use crate::error::{AuxiliaryError, KaiError, error_chain};
use crate::signals::truncate_chars;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

/// Text-to-speech service.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Encoded audio (MP3 for the default service) for `text` in `locale`.
    async fn synthesize(&self, text: &str, locale: &str) -> Result<Bytes, AuxiliaryError>;
}

/// Google Translate's public TTS endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTranslateSpeech {
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleTranslateSpeech {
    /// Synthesizer for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`KaiError::Config`] if the HTTP client cannot be built.
    pub fn from_config(config: &SpeechConfig) -> Result<Self, KaiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| KaiError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateSpeech {
    async fn synthesize(&self, text: &str, locale: &str) -> Result<Bytes, AuxiliaryError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("ie", "UTF-8"),
                ("q", text),
                ("tl", locale),
                ("client", "tw-ob"),
            ])
            .send()
            .await
            .map_err(|e| {
                AuxiliaryError::Speech(format!("request failed: {}", error_chain(&e)))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuxiliaryError::Speech(format!("HTTP {}", status.as_u16())));
        }
        let audio = response
            .bytes()
            .await
            .map_err(|e| {
                AuxiliaryError::Speech(format!("failed to read audio: {}", error_chain(&e)))
            })?;
        if audio.is_empty() {
            return Err(AuxiliaryError::Speech("empty audio response".into()));
        }
        Ok(audio)
    }
}

/// Turns reply text into audio, never failing.
#[derive(Clone)]
pub struct SpeechRenderer {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    locale: String,
    max_chars: usize,
}

impl std::fmt::Debug for SpeechRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechRenderer")
            .field("locale", &self.locale)
            .field("max_chars", &self.max_chars)
            .finish()
    }
}

impl SpeechRenderer {
    /// Renderer over `synthesizer` using the configured locale and prefix length.
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, config: &SpeechConfig) -> Self {
        Self {
            synthesizer,
            locale: config.locale.clone(),
            max_chars: config.max_chars,
        }
    }

    /// Audio for the first `max_chars` characters of `text`.
    ///
    /// `None` for blank text (the synthesizer is not called) or on any failure.
    pub async fn render(&self, text: &str) -> Option<Bytes> {
        let (prefix, truncated) = truncate_chars(text.trim(), self.max_chars);
        if prefix.trim().is_empty() {
            return None;
        }
        tracing::debug!(chars = prefix.chars().count(), truncated, "synthesizing speech");
        match self.synthesizer.synthesize(&prefix, &self.locale).await {
            Ok(audio) => Some(audio),
            Err(e) => {
                tracing::warn!(error = %e, "speech synthesis failed, reply stays text-only");
                None
            }
        }
    }
}
