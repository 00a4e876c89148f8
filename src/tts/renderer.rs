//! Speech synthesis against an OpenAI-compatible `/v1/audio/speech` endpoint.
//!
//! The renderer synthesizes one utterance at a time, hands the audio bytes to
//! an optional sink channel, and then holds the caller for the utterance's
//! playback duration.  The HTTP backend gives no playback-complete signal, so
//! the hold is a bounded estimate derived from the text length.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::{AppConfig, TtsConfig};
use crate::tts::prosody::VoiceParams;

/// Average narration pace used to estimate playback duration, in characters
/// per second of audio.
const CHARS_PER_SECOND: u64 = 15;

/// Ceiling on the estimated playback hold.
const MAX_ESTIMATED_HOLD: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum TtsError {
    #[error("speech API key missing or rejected")]
    Auth,
    #[error("speech API returned status {0}")]
    Api(u16),
    #[error("speech request timed out")]
    Timeout,
    #[error("speech request failed: {0}")]
    Network(String),
}

impl From<reqwest::Error> for TtsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TtsError::Timeout
        } else {
            TtsError::Network(err.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Audio sink
// ---------------------------------------------------------------------------

/// One synthesized utterance handed to the audio sink.
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Encoded audio bytes as returned by the backend.
    pub audio: Vec<u8>,
    /// The narrated text, for display alongside playback.
    pub text: String,
}

// ---------------------------------------------------------------------------
// SpeechRenderer trait
// ---------------------------------------------------------------------------

/// Speech synthesis seam.  `render` resolves when the utterance has been
/// delivered and its playback window has elapsed.
#[async_trait]
pub trait SpeechRenderer: Send + Sync {
    async fn render(&self, text: &str, params: &VoiceParams) -> Result<(), TtsError>;
}

// ---------------------------------------------------------------------------
// ApiSpeechRenderer
// ---------------------------------------------------------------------------

/// Renderer backed by an OpenAI-compatible speech endpoint.
pub struct ApiSpeechRenderer {
    client: reqwest::Client,
    config: TtsConfig,
    api_key: Option<String>,
    audio_tx: Option<mpsc::Sender<AudioClip>>,
}

impl ApiSpeechRenderer {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: config.tts.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            audio_tx: None,
        }
    }

    /// Attach a sink that receives each synthesized clip.
    pub fn with_audio_sink(mut self, tx: mpsc::Sender<AudioClip>) -> Self {
        self.audio_tx = Some(tx);
        self
    }

    async fn synthesize(&self, text: &str, params: &VoiceParams) -> Result<Vec<u8>, TtsError> {
        let key = self.api_key.as_deref().ok_or(TtsError::Auth)?;
        let url = format!("{}/v1/audio/speech", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(key)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .json(&json!({
                "model": self.config.model,
                "voice": params.voice,
                "input": text,
                "speed": params.speed,
            }))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(TtsError::Auth);
        }
        if !status.is_success() {
            return Err(TtsError::Api(status.as_u16()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl SpeechRenderer for ApiSpeechRenderer {
    async fn render(&self, text: &str, params: &VoiceParams) -> Result<(), TtsError> {
        let audio = self.synthesize(text, params).await?;
        log::debug!(
            "synthesized {} bytes of audio for {} chars (voice {})",
            audio.len(),
            text.len(),
            params.voice
        );

        if let Some(tx) = &self.audio_tx {
            // Best-effort delivery; a full or closed sink never stalls narration.
            if tx.try_send(AudioClip { audio, text: text.to_string() }).is_err() {
                log::warn!("audio sink unavailable; dropping clip");
            }
        }

        // Hold for the playback window so consecutive utterances never overlap.
        tokio::time::sleep(estimated_playback(text.len())).await;
        Ok(())
    }
}

/// Estimated playback duration for `text_len` characters of narration,
/// clamped to [`MAX_ESTIMATED_HOLD`].
pub(crate) fn estimated_playback(text_len: usize) -> Duration {
    let secs = (text_len as u64).div_ceil(CHARS_PER_SECOND);
    Duration::from_secs(secs).min(MAX_ESTIMATED_HOLD)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
