//! Text-to-speech rendering.
//!
//! Two halves:
//!
//! - [`ProsodyMapper`] turns a narration segment's emotion and speaker gender
//!   into backend voice parameters (voice identity + playback speed).
//! - [`SpeechRenderer`] synthesizes the utterance through an
//!   OpenAI-compatible speech endpoint and holds the caller for its playback
//!   window, keeping consecutive utterances sequential.

pub mod prosody;
pub mod renderer;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use prosody::{ProsodyMapper, VoiceParams};
pub use renderer::{ApiSpeechRenderer, AudioClip, SpeechRenderer, TtsError};
