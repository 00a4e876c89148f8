//! Narration generation — turns an [`Analysis`] into speakable segments.
//!
//! The engine walks panels in reading order, emits one emotionally-annotated
//! segment per panel that carries dialogue, and suppresses output that
//! repeats the previous cycle's narration.  Scene, action and emotion prose
//! is intentionally not narrated — dialogue is the sole narratable signal;
//! everything else only *colours* how the dialogue is spoken.

use crate::vision::{Analysis, Gender, Panel};

use super::emotion::{apply_emphasis, infer_emotion, Emotion};
use super::redundancy::is_redundant;

// ---------------------------------------------------------------------------
// NarrationSegment
// ---------------------------------------------------------------------------

/// One utterance, ready for prosody mapping and rendering.
///
/// Consumed exactly once by the speech-rendering path, then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrationSegment {
    /// The emphasised dialogue text.
    pub text: String,
    /// Gender of the speaking character — selects the voice.
    pub gender: Gender,
    /// Inferred emotion — selects the speech rate.
    pub emotion: Emotion,
}

// ---------------------------------------------------------------------------
// NarrationOutcome
// ---------------------------------------------------------------------------

/// Result of one generation pass.
#[derive(Debug, Clone, PartialEq)]
pub enum NarrationOutcome {
    /// Fresh narration to render.  `combined_text` becomes the redundancy
    /// baseline for the next cycle.
    Narrate {
        segments: Vec<NarrationSegment>,
        combined_text: String,
    },
    /// Nothing to say: no panels, no dialogue, or a repeat of the previous
    /// narration.  The caller must leave its redundancy baseline untouched.
    Skip,
}

// ---------------------------------------------------------------------------
// NarrationEngine
// ---------------------------------------------------------------------------

/// Stateless narration generator.  The single piece of cross-cycle state
/// (the previous combined text) is owned by the orchestrator and passed in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NarrationEngine;

impl NarrationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Generate narration segments for `analysis`, suppressing output whose
    /// word overlap with `previous_text` exceeds the redundancy threshold.
    pub fn generate(&self, analysis: &Analysis, previous_text: Option<&str>) -> NarrationOutcome {
        if analysis.panels.is_empty() {
            log::debug!("no panels detected; nothing to narrate");
            return NarrationOutcome::Skip;
        }

        let mut segments = Vec::new();

        for &index in &analysis.reading_order {
            // Out-of-range entries are skipped silently; a bad index from the
            // model must not take the pipeline down.
            let Some(panel) = analysis.panels.get(index) else {
                log::debug!("reading order references missing panel {index}; skipping");
                continue;
            };

            if let Some(segment) = narrate_panel(panel) {
                segments.push(segment);
            }
        }

        if segments.is_empty() {
            log::debug!("no dialogue in any panel; skipping narration");
            return NarrationOutcome::Skip;
        }

        let combined_text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        if let Some(previous) = previous_text {
            if is_redundant(&combined_text, previous) {
                log::info!("narration is redundant with previous cycle; skipping");
                return NarrationOutcome::Skip;
            }
        }

        log::debug!("generated {} narration segment(s)", segments.len());
        NarrationOutcome::Narrate {
            segments,
            combined_text,
        }
    }
}

/// Build the segment for one panel, or `None` when it has no speakable
/// dialogue.
fn narrate_panel(panel: &Panel) -> Option<NarrationSegment> {
    if panel.dialogue.is_empty() {
        return None;
    }

    let text = panel.dialogue.join(". ");
    // A dialogue array of blank strings is structurally non-empty but must
    // not produce an empty utterance.
    if text.trim_matches(|c: char| c.is_whitespace() || c == '.').is_empty() {
        return None;
    }

    let gender = panel
        .speaking_character()
        .map(|c| c.gender)
        .unwrap_or(Gender::Neutral);

    let context: String = panel
        .emotions
        .iter()
        .map(String::as_str)
        .chain(panel.characters.iter().map(|c| c.expression.as_str()))
        .collect::<Vec<_>>()
        .join(" ");

    let emotion = infer_emotion(&context);
    let text = apply_emphasis(&text, emotion);

    Some(NarrationSegment {
        text,
        gender,
        emotion,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::Character;

    fn panel(dialogue: &[&str], emotions: &[&str]) -> Panel {
        Panel {
            dialogue: dialogue.iter().map(|s| s.to_string()).collect(),
            emotions: emotions.iter().map(|s| s.to_string()).collect(),
            ..Panel::default()
        }
    }

    fn analysis(panels: Vec<Panel>) -> Analysis {
        let reading_order = (0..panels.len()).collect();
        Analysis {
            overall_scene: "scene".into(),
            reading_order,
            panels,
        }
    }

    // ---- Skip conditions ---

    #[test]
    fn empty_panels_skip() {
        let engine = NarrationEngine::new();
        let outcome = engine.generate(&analysis(vec![]), None);
        assert_eq!(outcome, NarrationOutcome::Skip);
    }

    #[test]
    fn dialogue_free_panels_skip() {
        let engine = NarrationEngine::new();
        let outcome = engine.generate(&analysis(vec![panel(&[], &["joy"])]), None);
        assert_eq!(outcome, NarrationOutcome::Skip);
    }

    #[test]
    fn blank_only_dialogue_skips() {
        let engine = NarrationEngine::new();
        let outcome = engine.generate(&analysis(vec![panel(&["", "   "], &[])]), None);
        assert_eq!(outcome, NarrationOutcome::Skip);
    }

    // ---- Segment emission ---

    #[test]
    fn one_segment_per_dialogue_panel() {
        let engine = NarrationEngine::new();
        let outcome = engine.generate(
            &analysis(vec![
                panel(&["First line"], &[]),
                panel(&[], &[]),
                panel(&["Third panel speaks"], &[]),
            ]),
            None,
        );

        let NarrationOutcome::Narrate { segments, .. } = outcome else {
            panic!("expected narration");
        };
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "First line");
        assert_eq!(segments[1].text, "Third panel speaks");
    }

    #[test]
    fn dialogue_lines_join_with_period_space() {
        let engine = NarrationEngine::new();
        let outcome = engine.generate(&analysis(vec![panel(&["Hello", "Goodbye"], &[])]), None);

        let NarrationOutcome::Narrate { segments, .. } = outcome else {
            panic!("expected narration");
        };
        assert_eq!(segments[0].text, "Hello. Goodbye");
    }

    #[test]
    fn segments_follow_reading_order() {
        let engine = NarrationEngine::new();
        let mut a = analysis(vec![panel(&["panel zero"], &[]), panel(&["panel one"], &[])]);
        a.reading_order = vec![1, 0];

        let NarrationOutcome::Narrate { segments, .. } = engine.generate(&a, None) else {
            panic!("expected narration");
        };
        assert_eq!(segments[0].text, "panel one");
        assert_eq!(segments[1].text, "panel zero");
    }

    #[test]
    fn out_of_range_reading_order_entries_are_skipped() {
        let engine = NarrationEngine::new();
        let mut a = analysis(vec![panel(&["still here"], &[])]);
        a.reading_order = vec![5, 0, 12];

        let NarrationOutcome::Narrate { segments, .. } = engine.generate(&a, None) else {
            panic!("expected narration");
        };
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "still here");
    }

    // ---- Speaker and emotion ---

    #[test]
    fn speaker_gender_comes_from_speaking_character() {
        let mut p = panel(&["It was me"], &[]);
        p.characters = vec![
            Character {
                gender: Gender::Female,
                ..Character::default()
            },
            Character {
                gender: Gender::Male,
                is_speaking: true,
                ..Character::default()
            },
        ];

        let engine = NarrationEngine::new();
        let NarrationOutcome::Narrate { segments, .. } =
            engine.generate(&analysis(vec![p]), None)
        else {
            panic!("expected narration");
        };
        assert_eq!(segments[0].gender, Gender::Male);
    }

    #[test]
    fn no_characters_means_neutral_gender() {
        let engine = NarrationEngine::new();
        let NarrationOutcome::Narrate { segments, .. } =
            engine.generate(&analysis(vec![panel(&["Who said that"], &[])]), None)
        else {
            panic!("expected narration");
        };
        assert_eq!(segments[0].gender, Gender::Neutral);
    }

    #[test]
    fn emotion_context_includes_character_expressions() {
        let mut p = panel(&["Keep your voice down"], &[]);
        p.characters = vec![Character {
            expression: "whispering behind her hand".into(),
            ..Character::default()
        }];

        let engine = NarrationEngine::new();
        let NarrationOutcome::Narrate { segments, .. } =
            engine.generate(&analysis(vec![p]), None)
        else {
            panic!("expected narration");
        };
        assert_eq!(segments[0].emotion, Emotion::Whisper);
        assert!(segments[0].text.starts_with("..."));
    }

    // ---- Redundancy ---

    #[test]
    fn identical_repeat_skips() {
        let engine = NarrationEngine::new();
        let a = analysis(vec![panel(&["the dragon wakes beneath the mountain"], &[])]);

        let NarrationOutcome::Narrate { combined_text, .. } = engine.generate(&a, None) else {
            panic!("expected narration");
        };

        let second = engine.generate(&a, Some(&combined_text));
        assert_eq!(second, NarrationOutcome::Skip);
    }

    #[test]
    fn fresh_content_passes_redundancy_check() {
        let engine = NarrationEngine::new();
        let a = analysis(vec![panel(&["completely different words entirely"], &[])]);

        let outcome = engine.generate(&a, Some("the dragon wakes beneath the mountain"));
        assert!(matches!(outcome, NarrationOutcome::Narrate { .. }));
    }

    // ---- End-to-end scenario ---

    #[test]
    fn two_panel_scenario_emits_one_excited_segment_then_skips_repeat() {
        let engine = NarrationEngine::new();
        let a = analysis(vec![
            panel(&["Spring is beautiful"], &["joy"]),
            panel(&[], &[]),
        ]);

        let NarrationOutcome::Narrate {
            segments,
            combined_text,
        } = engine.generate(&a, None)
        else {
            panic!("expected narration");
        };

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].emotion, Emotion::Excited);
        assert!(segments[0].text.ends_with('!'));

        // Second cycle over the same page is redundant.
        assert_eq!(engine.generate(&a, Some(&combined_text)), NarrationOutcome::Skip);
    }
}
