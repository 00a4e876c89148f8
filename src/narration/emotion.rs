//! Emotion inference and text emphasis.
//!
//! The vision model reports free-text emotion words and character
//! expressions; [`infer_emotion`] maps that context onto the small closed
//! [`Emotion`] set the speech renderer understands, and [`apply_emphasis`]
//! rewrites the dialogue text to carry the tone through a neutral voice.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Emotion
// ---------------------------------------------------------------------------

/// Closed set of narration emotions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Neutral,
    Excited,
    Sad,
    Angry,
    Surprised,
    Whisper,
    Shouting,
}

impl Default for Emotion {
    fn default() -> Self {
        Emotion::Neutral
    }
}

// ---------------------------------------------------------------------------
// Inference
// ---------------------------------------------------------------------------

/// Marker substrings per emotion, in priority order — the first emotion with
/// a matching marker wins.
const MARKERS: &[(Emotion, &[&str])] = &[
    (Emotion::Excited, &["excit", "happy", "joy"]),
    (Emotion::Sad, &["sad", "cry", "tear"]),
    (Emotion::Angry, &["angry", "mad", "furious"]),
    (Emotion::Surprised, &["shock", "surprise", "amaz"]),
    (Emotion::Whisper, &["whisper", "quiet"]),
    (Emotion::Shouting, &["shout", "yell", "scream"]),
];

/// Infer the dominant emotion from a free-text context string (panel
/// emotions concatenated with character expressions).
///
/// Matching is case-insensitive substring search; the priority order of
/// [`MARKERS`] decides ties.  No match means [`Emotion::Neutral`].
pub fn infer_emotion(context: &str) -> Emotion {
    let context = context.to_lowercase();

    for (emotion, markers) in MARKERS {
        if markers.iter().any(|m| context.contains(m)) {
            return *emotion;
        }
    }

    Emotion::Neutral
}

// ---------------------------------------------------------------------------
// Emphasis
// ---------------------------------------------------------------------------

/// Rewrite `text` so the tone survives text-to-speech.
pub fn apply_emphasis(text: &str, emotion: Emotion) -> String {
    match emotion {
        Emotion::Neutral => text.to_string(),
        Emotion::Excited => force_terminal(&text.replace('.', "!"), "!"),
        Emotion::Sad => text.replace('.', "...").replace(',', "..."),
        Emotion::Angry => text.to_uppercase().replace('.', "!"),
        Emotion::Surprised => force_terminal(&text.replace('.', "?!"), "?!"),
        Emotion::Whisper => format!("...{}...", text.replace('.', "...")),
        Emotion::Shouting => format!("{}!!", text.to_uppercase()),
    }
}

/// Replace a trailing `.`, `!` or `?` with `terminal`, appending it when the
/// text carries no terminal punctuation at all.
fn force_terminal(text: &str, terminal: &str) -> String {
    let trimmed = text.trim_end_matches(['.', '!', '?']);
    format!("{trimmed}{terminal}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
