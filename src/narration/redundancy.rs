//! Redundancy detection against the previous narration.
//!
//! The page under the capture area often hasn't changed between cycles, so
//! the freshly generated narration would repeat what was just spoken.
//! [`is_redundant`] compares word sets instead of exact strings so small
//! phrasing differences in the vision output don't defeat the check.

use std::collections::HashSet;

/// Word-overlap similarity above which narration is considered a repeat.
/// The threshold itself is exclusive: exactly 0.70 is *not* redundant.
pub const REDUNDANCY_THRESHOLD: f64 = 0.70;

/// Jaccard-style overlap between two texts: `|intersection| / max(|a|, |b|)`
/// over lowercase whitespace-separated word sets.
///
/// Returns 0.0 when either side has no words.
pub fn word_overlap(a: &str, b: &str) -> f64 {
    let a_words: HashSet<String> = a.to_lowercase().split_whitespace().map(str::to_string).collect();
    let b_words: HashSet<String> = b.to_lowercase().split_whitespace().map(str::to_string).collect();

    let larger = a_words.len().max(b_words.len());
    if larger == 0 {
        return 0.0;
    }

    let intersection = a_words.intersection(&b_words).count();
    intersection as f64 / larger as f64
}

/// Whether `current` repeats `previous` closely enough to skip narrating it.
pub fn is_redundant(current: &str, previous: &str) -> bool {
    word_overlap(current, previous) > REDUNDANCY_THRESHOLD
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
