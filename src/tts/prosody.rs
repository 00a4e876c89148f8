//! Emotion/gender → voice-selection and speech-rate mapping.
//!
//! The speech backend only understands a voice name and a playback speed;
//! [`ProsodyMapper`] translates a [`NarrationSegment`]'s inferred emotion and
//! speaker gender into those parameters.  Emphasis (uppercasing, forced
//! punctuation) already happened in the narration engine — the angry voice,
//! for example, keeps base speed because its text carries the intensity.

use crate::narration::{Emotion, NarrationSegment};
use crate::vision::Gender;

// ---------------------------------------------------------------------------
// Default voice identities
// ---------------------------------------------------------------------------

/// Deep male voice.
const VOICE_MALE: &str = "onyx";
/// Soft female voice.
const VOICE_FEMALE: &str = "shimmer";
/// Neutral default voice.
const VOICE_NEUTRAL: &str = "nova";

// ---------------------------------------------------------------------------
// VoiceParams
// ---------------------------------------------------------------------------

/// Rendering parameters for one utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceParams {
    /// Backend voice identifier.
    pub voice: String,
    /// Playback speed — the emotion multiplier applied to the user base rate.
    pub speed: f32,
}

// ---------------------------------------------------------------------------
// ProsodyMapper
// ---------------------------------------------------------------------------

/// Maps narration segments onto backend voice parameters.
#[derive(Debug, Clone)]
pub struct ProsodyMapper {
    /// User base speech rate; emotion multipliers stack on top of it.
    base_rate: f32,
    /// Explicit user voice preference — overrides gender selection.
    preferred_voice: Option<String>,
    /// Voices the backend reports as available; empty means trust the
    /// defaults blindly.
    available_voices: Vec<String>,
}

impl ProsodyMapper {
    /// Create a mapper with the user's base speech rate.
    pub fn new(base_rate: f32) -> Self {
        Self {
            base_rate,
            preferred_voice: None,
            available_voices: Vec::new(),
        }
    }

    /// Pin every utterance to `voice` regardless of speaker gender.
    /// An empty string clears the preference.
    pub fn with_preferred_voice(mut self, voice: &str) -> Self {
        self.preferred_voice = if voice.is_empty() {
            None
        } else {
            Some(voice.to_string())
        };
        self
    }

    /// Restrict voice selection to what the backend actually offers.
    pub fn with_available_voices(mut self, voices: Vec<String>) -> Self {
        self.available_voices = voices;
        self
    }

    /// Map a narration segment onto voice-selection and speed parameters.
    pub fn map(&self, segment: &NarrationSegment) -> VoiceParams {
        let wanted = self
            .preferred_voice
            .as_deref()
            .unwrap_or_else(|| voice_for_gender(segment.gender));

        VoiceParams {
            voice: self.resolve_voice(wanted),
            speed: self.base_rate * speed_multiplier(segment.emotion),
        }
    }

    /// Resolve `wanted` against the available-voice list: exact match first,
    /// then a case-insensitive name/locale substring match, then the first
    /// available voice.  An empty list trusts `wanted` as-is.
    fn resolve_voice(&self, wanted: &str) -> String {
        if self.available_voices.is_empty() {
            return wanted.to_string();
        }

        if let Some(exact) = self.available_voices.iter().find(|v| *v == wanted) {
            return exact.clone();
        }

        let wanted_lower = wanted.to_lowercase();
        if let Some(close) = self
            .available_voices
            .iter()
            .find(|v| v.to_lowercase().contains(&wanted_lower))
        {
            log::debug!("voice {wanted:?} unavailable; using closest match {close:?}");
            return close.clone();
        }

        let first = self.available_voices[0].clone();
        log::debug!("voice {wanted:?} unavailable; using first available {first:?}");
        first
    }
}

/// Discrete voice identity per speaker gender.
fn voice_for_gender(gender: Gender) -> &'static str {
    match gender {
        Gender::Male => VOICE_MALE,
        Gender::Female => VOICE_FEMALE,
        Gender::Neutral => VOICE_NEUTRAL,
    }
}

/// Speed multiplier per emotion.
fn speed_multiplier(emotion: Emotion) -> f32 {
    match emotion {
        Emotion::Excited | Emotion::Shouting => 1.15,
        Emotion::Surprised => 1.10,
        Emotion::Sad | Emotion::Whisper => 0.90,
        // Angry text is already uppercased with forced exclamation.
        Emotion::Angry | Emotion::Neutral => 1.0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(gender: Gender, emotion: Emotion) -> NarrationSegment {
        NarrationSegment {
            text: "line".into(),
            gender,
            emotion,
        }
    }

    // ---- gender → voice ---

    #[test]
    fn gender_selects_discrete_voice() {
        let mapper = ProsodyMapper::new(1.0);
        assert_eq!(mapper.map(&segment(Gender::Male, Emotion::Neutral)).voice, "onyx");
        assert_eq!(
            mapper.map(&segment(Gender::Female, Emotion::Neutral)).voice,
            "shimmer"
        );
        assert_eq!(
            mapper.map(&segment(Gender::Neutral, Emotion::Neutral)).voice,
            "nova"
        );
    }

    #[test]
    fn preferred_voice_overrides_gender() {
        let mapper = ProsodyMapper::new(1.0).with_preferred_voice("alloy");
        assert_eq!(mapper.map(&segment(Gender::Male, Emotion::Neutral)).voice, "alloy");
    }

    #[test]
    fn empty_preferred_voice_is_ignored() {
        let mapper = ProsodyMapper::new(1.0).with_preferred_voice("");
        assert_eq!(mapper.map(&segment(Gender::Male, Emotion::Neutral)).voice, "onyx");
    }

    // ---- voice resolution against the backend list ---

    #[test]
    fn exact_available_voice_wins() {
        let mapper = ProsodyMapper::new(1.0)
            .with_available_voices(vec!["alloy".into(), "onyx".into()]);
        assert_eq!(mapper.map(&segment(Gender::Male, Emotion::Neutral)).voice, "onyx");
    }

    #[test]
    fn closest_name_match_when_exact_missing() {
        let mapper = ProsodyMapper::new(1.0)
            .with_available_voices(vec!["alloy-en".into(), "onyx-en-US".into()]);
        assert_eq!(
            mapper.map(&segment(Gender::Male, Emotion::Neutral)).voice,
            "onyx-en-US"
        );
    }

    #[test]
    fn first_available_when_nothing_matches() {
        let mapper = ProsodyMapper::new(1.0)
            .with_available_voices(vec!["kokoro".into(), "af-bella".into()]);
        assert_eq!(
            mapper.map(&segment(Gender::Male, Emotion::Neutral)).voice,
            "kokoro"
        );
    }

    // ---- emotion → speed ---

    #[test]
    fn excited_and_shouting_are_faster() {
        let mapper = ProsodyMapper::new(1.0);
        assert_eq!(mapper.map(&segment(Gender::Neutral, Emotion::Excited)).speed, 1.15);
        assert_eq!(mapper.map(&segment(Gender::Neutral, Emotion::Shouting)).speed, 1.15);
    }

    #[test]
    fn sad_and_whisper_are_slower() {
        let mapper = ProsodyMapper::new(1.0);
        assert_eq!(mapper.map(&segment(Gender::Neutral, Emotion::Sad)).speed, 0.90);
        assert_eq!(mapper.map(&segment(Gender::Neutral, Emotion::Whisper)).speed, 0.90);
    }

    #[test]
    fn surprised_is_slightly_faster() {
        let mapper = ProsodyMapper::new(1.0);
        assert_eq!(mapper.map(&segment(Gender::Neutral, Emotion::Surprised)).speed, 1.10);
    }

    #[test]
    fn angry_and_neutral_keep_base_speed() {
        let mapper = ProsodyMapper::new(1.0);
        assert_eq!(mapper.map(&segment(Gender::Neutral, Emotion::Angry)).speed, 1.0);
        assert_eq!(mapper.map(&segment(Gender::Neutral, Emotion::Neutral)).speed, 1.0);
    }

    #[test]
    fn multiplier_stacks_on_user_base_rate() {
        let mapper = ProsodyMapper::new(1.2);
        let speed = mapper.map(&segment(Gender::Neutral, Emotion::Excited)).speed;
        assert!((speed - 1.38).abs() < 1e-6);
    }
}
