//! Narration-generation module for Manga Narrator.
//!
//! This module provides:
//! * [`NarrationEngine`] — reading-order linearisation, per-panel segment
//!   emission, redundancy suppression.
//! * [`NarrationSegment`] / [`NarrationOutcome`] — engine output types.
//! * [`Emotion`], [`infer_emotion`], [`apply_emphasis`] — emotion inference
//!   and text-to-prosody emphasis.
//! * [`is_redundant`] / [`word_overlap`] — word-set similarity against the
//!   previous cycle's narration.
//!
//! # Quick start
//!
//! ```rust
//! use manga_narrator::narration::{NarrationEngine, NarrationOutcome};
//! use manga_narrator::vision::parse_analysis;
//!
//! let analysis = parse_analysis(r#"{"panels": [{"dialogue": ["Hi there"]}]}"#);
//! let engine = NarrationEngine::new();
//!
//! match engine.generate(&analysis, None) {
//!     NarrationOutcome::Narrate { segments, .. } => {
//!         assert_eq!(segments.len(), 1);
//!     }
//!     NarrationOutcome::Skip => unreachable!(),
//! }
//! ```

pub mod emotion;
pub mod engine;
pub mod redundancy;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use emotion::{apply_emphasis, infer_emotion, Emotion};
pub use engine::{NarrationEngine, NarrationOutcome, NarrationSegment};
pub use redundancy::{is_redundant, word_overlap, REDUNDANCY_THRESHOLD};
