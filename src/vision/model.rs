//! Typed vision-analysis data model.
//!
//! These are the fully-populated domain types that flow through the
//! narration pipeline.  Every field is concrete — the parser defaults
//! anything the model omitted, so no `Option` ever travels downstream.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Gender
// ---------------------------------------------------------------------------

/// Speaker gender reported by the vision model.
///
/// Unrecognised values decode as [`Gender::Neutral`] so a creative model
/// answer can never fail the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[serde(other)]
    Neutral,
}

impl Default for Gender {
    fn default() -> Self {
        Gender::Neutral
    }
}

// ---------------------------------------------------------------------------
// Character
// ---------------------------------------------------------------------------

/// One character visible in a panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Appearance and identity.
    pub description: String,
    /// Where the character is within the panel.
    pub position: String,
    /// Facial expression and body language — feeds emotion inference.
    pub expression: String,
    /// Reported gender; selects the narration voice.
    pub gender: Gender,
    /// Whether this character is the one speaking the panel's dialogue.
    pub is_speaking: bool,
}

// ---------------------------------------------------------------------------
// Panel
// ---------------------------------------------------------------------------

/// One manga frame.  All collection fields default to empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    /// Panel identifier; the parser assigns the array index when missing.
    pub id: usize,
    /// Setting / background description.
    pub setting: String,
    /// Characters visible in the panel.
    pub characters: Vec<Character>,
    /// Actions taking place.
    pub actions: Vec<String>,
    /// Emotions conveyed — feeds emotion inference.
    pub emotions: Vec<String>,
    /// Dialogue lines, in speech order.  The sole narratable signal.
    pub dialogue: Vec<String>,
}

impl Panel {
    /// The first character flagged as speaking, falling back to the first
    /// character in the list.
    pub fn speaking_character(&self) -> Option<&Character> {
        self.characters
            .iter()
            .find(|c| c.is_speaking)
            .or_else(|| self.characters.first())
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Structured result of one vision-analysis call.
///
/// Immutable after construction; owned by the orchestrator for the duration
/// of one capture cycle.
///
/// Invariant: `reading_order` contains panel indices into `panels`
/// (a possibly partial permutation of `0..panels.len()`); the parser
/// synthesises natural index order when the model omits it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Brief description of the overall scene and atmosphere.
    pub overall_scene: String,
    /// The sequence in which panels should be narrated.
    pub reading_order: Vec<usize>,
    /// Panels in storage order.
    pub panels: Vec<Panel>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
