//! Converts raw model output text into a validated [`Analysis`].
//!
//! [`parse_analysis`] is total — it never fails.  Malformed input degrades to
//! a fixed single-panel fallback so the pipeline always has something to
//! narrate-or-skip instead of propagating a parse error to the orchestrator.
//!
//! The wire structs decode the model's camelCase JSON with every field
//! optional; normalisation then produces fully-populated domain types, so no
//! partially-populated `Option` ever flows downstream.

use serde::Deserialize;

use super::model::{Analysis, Character, Gender, Panel};

// ---------------------------------------------------------------------------
// Wire format (camelCase, everything optional)
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    #[serde(default)]
    overall_scene: Option<String>,
    #[serde(default)]
    reading_order: Option<Vec<usize>>,
    #[serde(default)]
    panels: Option<Vec<RawPanel>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPanel {
    #[serde(default)]
    id: Option<usize>,
    #[serde(default)]
    setting: Option<String>,
    #[serde(default)]
    characters: Option<Vec<RawCharacter>>,
    #[serde(default)]
    actions: Option<Vec<String>>,
    #[serde(default)]
    emotions: Option<Vec<String>>,
    #[serde(default)]
    dialogue: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCharacter {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    position: Option<String>,
    #[serde(default)]
    expression: Option<String>,
    #[serde(default)]
    gender: Option<Gender>,
    #[serde(default)]
    is_speaking: Option<bool>,
}

// ---------------------------------------------------------------------------
// Fence stripping
// ---------------------------------------------------------------------------

/// Strip a leading/trailing markdown code fence, tolerating the model
/// wrapping its JSON in ```json … ``` blocks.
pub fn strip_code_fences(s: &str) -> &str {
    let s = s.trim();
    let s = s
        .strip_prefix("```json")
        .or_else(|| s.strip_prefix("```"))
        .unwrap_or(s);
    let s = s.strip_suffix("```").unwrap_or(s);
    s.trim()
}

// ---------------------------------------------------------------------------
// parse_analysis
// ---------------------------------------------------------------------------

/// Parse raw model output into a validated [`Analysis`].  Never fails.
///
/// On decode failure the fixed fallback from [`fallback_analysis`] is
/// returned instead.
pub fn parse_analysis(raw: &str) -> Analysis {
    let json = strip_code_fences(raw);

    match serde_json::from_str::<RawAnalysis>(json) {
        Ok(raw) => normalize(raw),
        Err(e) => {
            log::warn!("analysis response was not valid JSON ({e}); using fallback");
            fallback_analysis()
        }
    }
}

/// The degenerate single-panel analysis returned when parsing fails.
pub fn fallback_analysis() -> Analysis {
    Analysis {
        overall_scene: "Unable to parse manga analysis".into(),
        reading_order: vec![0],
        panels: vec![Panel {
            id: 0,
            setting: "Analysis parsing failed".into(),
            ..Panel::default()
        }],
    }
}

fn normalize(raw: RawAnalysis) -> Analysis {
    let panels: Vec<Panel> = raw
        .panels
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, p)| normalize_panel(p, index))
        .collect();

    let mut reading_order = raw.reading_order.unwrap_or_default();
    if reading_order.is_empty() && !panels.is_empty() {
        reading_order = (0..panels.len()).collect();
    }

    Analysis {
        overall_scene: raw.overall_scene.unwrap_or_else(|| "A manga scene".into()),
        reading_order,
        panels,
    }
}

fn normalize_panel(raw: RawPanel, index: usize) -> Panel {
    Panel {
        id: raw.id.unwrap_or(index),
        setting: raw.setting.unwrap_or_default(),
        characters: raw
            .characters
            .unwrap_or_default()
            .into_iter()
            .map(normalize_character)
            .collect(),
        actions: raw.actions.unwrap_or_default(),
        emotions: raw.emotions.unwrap_or_default(),
        dialogue: raw.dialogue.unwrap_or_default(),
    }
}

fn normalize_character(raw: RawCharacter) -> Character {
    Character {
        description: raw.description.unwrap_or_default(),
        position: raw.position.unwrap_or_default(),
        expression: raw.expression.unwrap_or_default(),
        gender: raw.gender.unwrap_or_default(),
        is_speaking: raw.is_speaking.unwrap_or(false),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
