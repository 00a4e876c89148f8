//! Narration state machine and shared operation state.
//!
//! [`NarrationStatus`] drives the orchestrator's state machine.  Frontends
//! observe it two ways: by subscribing to the [`StatusUpdate`] broadcast, or
//! by querying a point-in-time [`StatusReport`].
//!
//! [`OperationState`] is the single source of truth for a narration session:
//! current phase, capture counters, the previous narration used for
//! redundancy suppression, and any error message.
//!
//! [`SharedState`] is a type alias for `Arc<Mutex<OperationState>>` — cheap to
//! clone and safe to share across tasks.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::AppConfig;

// ---------------------------------------------------------------------------
// NarrationStatus
// ---------------------------------------------------------------------------

/// States of the narration loop.
///
/// The state machine transitions are:
///
/// ```text
/// Idle ──start──▶ Capturing
///                 ──frame ready──▶ Analyzing
///                                  ──segments ready──▶ Narrating
///                                  ──skip / done─────▶ Capturing
/// Capturing / Analyzing / Narrating ──pause──▶ Paused ──resume──▶ (back)
/// any state ──failure──▶ Error ──next frame──▶ Analyzing
/// any state ──stop──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationStatus {
    /// No session running.
    Idle,

    /// Session running; waiting for the next page frame.
    Capturing,

    /// A frame is in flight to the vision backend.
    Analyzing,

    /// Narration segments are being rendered to speech.
    Narrating,

    /// Session alive but rendering is gated; captured frames are dropped.
    Paused,

    /// A capture, analysis, or rendering failure occurred.  The session
    /// stays alive and recovers on the next frame.
    Error,
}

impl NarrationStatus {
    /// Returns `true` while a frame is actively moving through the pipeline.
    pub fn is_working(&self) -> bool {
        matches!(
            self,
            NarrationStatus::Analyzing | NarrationStatus::Narrating
        )
    }

    /// A short human-readable label for status displays.
    pub fn label(&self) -> &'static str {
        match self {
            NarrationStatus::Idle => "Idle",
            NarrationStatus::Capturing => "Capturing",
            NarrationStatus::Analyzing => "Analyzing",
            NarrationStatus::Narrating => "Narrating",
            NarrationStatus::Paused => "Paused",
            NarrationStatus::Error => "Error",
        }
    }
}

impl Default for NarrationStatus {
    fn default() -> Self {
        NarrationStatus::Idle
    }
}

// ---------------------------------------------------------------------------
// Status reporting
// ---------------------------------------------------------------------------

/// One broadcast status transition.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub status: NarrationStatus,
    /// Extra detail — the narrated text, or an error description.
    pub message: Option<String>,
}

/// Point-in-time snapshot answered to a status query.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub status: NarrationStatus,
    pub capture_count: u64,
    /// Time since the session started; `None` when idle.
    pub uptime: Option<Duration>,
    pub error_message: Option<String>,
}

// ---------------------------------------------------------------------------
// OperationState
// ---------------------------------------------------------------------------

/// Shared session state, held behind [`SharedState`].
///
/// The orchestrator mutates it; status queries and the narration cycle read
/// it.
pub struct OperationState {
    /// Current phase of the narration loop.
    pub status: NarrationStatus,

    /// When the running session started.  `None` when idle.
    pub started_at: Option<Instant>,

    /// Frames captured since the session started.
    pub capture_count: u64,

    /// When the most recent frame was captured.
    pub last_capture_at: Option<Instant>,

    /// Combined text of the last narration, the baseline for redundancy
    /// suppression.  Skipped cycles leave it untouched.
    pub previous_narration: Option<String>,

    /// Current application configuration.
    pub config: AppConfig,

    /// Message to display when `status == NarrationStatus::Error`.
    pub error_message: Option<String>,
}

impl OperationState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            status: NarrationStatus::Idle,
            started_at: None,
            capture_count: 0,
            last_capture_at: None,
            previous_narration: None,
            config,
            error_message: None,
        }
    }

    /// Reset everything a stopped session leaves behind.
    pub fn reset_session(&mut self) {
        self.status = NarrationStatus::Idle;
        self.started_at = None;
        self.capture_count = 0;
        self.last_capture_at = None;
        self.previous_narration = None;
        self.error_message = None;
    }

    /// Build a [`StatusReport`] snapshot.
    pub fn report(&self) -> StatusReport {
        StatusReport {
            status: self.status,
            capture_count: self.capture_count,
            uptime: self.started_at.map(|t| t.elapsed()),
            error_message: self.error_message.clone(),
        }
    }
}

impl Default for OperationState {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// SharedState
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`OperationState`].
///
/// Cheap to clone (`Arc` clone).  Lock with `.lock().unwrap()` for a short
/// critical section; do **not** hold the lock across `.await` points.
pub type SharedState = Arc<Mutex<OperationState>>;

/// Construct a new [`SharedState`] wrapping a fresh [`OperationState`].
pub fn new_shared_state(config: AppConfig) -> SharedState {
    Arc::new(Mutex::new(OperationState::new(config)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- NarrationStatus::is_working ---

    #[test]
    fn idle_is_not_working() {
        assert!(!NarrationStatus::Idle.is_working());
    }

    #[test]
    fn capturing_is_not_working() {
        assert!(!NarrationStatus::Capturing.is_working());
    }

    #[test]
    fn analyzing_is_working() {
        assert!(NarrationStatus::Analyzing.is_working());
    }

    #[test]
    fn narrating_is_working() {
        assert!(NarrationStatus::Narrating.is_working());
    }

    #[test]
    fn paused_is_not_working() {
        assert!(!NarrationStatus::Paused.is_working());
    }

    // ---- NarrationStatus::label ---

    #[test]
    fn labels_are_display_ready() {
        assert_eq!(NarrationStatus::Idle.label(), "Idle");
        assert_eq!(NarrationStatus::Capturing.label(), "Capturing");
        assert_eq!(NarrationStatus::Analyzing.label(), "Analyzing");
        assert_eq!(NarrationStatus::Narrating.label(), "Narrating");
        assert_eq!(NarrationStatus::Paused.label(), "Paused");
        assert_eq!(NarrationStatus::Error.label(), "Error");
    }

    #[test]
    fn default_status_is_idle() {
        assert_eq!(NarrationStatus::default(), NarrationStatus::Idle);
    }

    // ---- OperationState ---

    #[test]
    fn fresh_state_is_idle_with_no_counters() {
        let state = OperationState::default();
        assert_eq!(state.status, NarrationStatus::Idle);
        assert!(state.started_at.is_none());
        assert_eq!(state.capture_count, 0);
        assert!(state.previous_narration.is_none());
        assert!(state.error_message.is_none());
    }

    #[test]
    fn reset_session_clears_everything() {
        let mut state = OperationState::default();
        state.status = NarrationStatus::Narrating;
        state.started_at = Some(Instant::now());
        state.capture_count = 7;
        state.last_capture_at = Some(Instant::now());
        state.previous_narration = Some("old narration".into());
        state.error_message = Some("boom".into());

        state.reset_session();

        assert_eq!(state.status, NarrationStatus::Idle);
        assert!(state.started_at.is_none());
        assert_eq!(state.capture_count, 0);
        assert!(state.last_capture_at.is_none());
        assert!(state.previous_narration.is_none());
        assert!(state.error_message.is_none());
    }

    #[test]
    fn report_reflects_session_state() {
        let mut state = OperationState::default();
        let idle_report = state.report();
        assert_eq!(idle_report.status, NarrationStatus::Idle);
        assert!(idle_report.uptime.is_none());

        state.status = NarrationStatus::Capturing;
        state.started_at = Some(Instant::now());
        state.capture_count = 3;

        let report = state.report();
        assert_eq!(report.status, NarrationStatus::Capturing);
        assert_eq!(report.capture_count, 3);
        assert!(report.uptime.is_some());
    }

    // ---- SharedState ---

    #[test]
    fn shared_state_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedState>();
    }

    #[test]
    fn shared_state_can_be_cloned_and_mutated() {
        let state = new_shared_state(AppConfig::default());
        let state2 = Arc::clone(&state);

        state.lock().unwrap().status = NarrationStatus::Capturing;
        assert_eq!(state2.lock().unwrap().status, NarrationStatus::Capturing);
    }
}
