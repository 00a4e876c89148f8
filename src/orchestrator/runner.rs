//! Narration orchestrator — drives the capture → analyze → narrate loop.
//!
//! [`Orchestrator`] owns the [`SharedState`] and responds to [`Command`]s
//! received over a `tokio::sync::mpsc` channel.
//!
//! # Loop flow
//!
//! ```text
//! Command::Start
//!   └─▶ reset session, spawn capture timer             [Capturing]
//!
//! capture timer (every interval; first frame immediately)
//!   └─▶ frame ready ──▶ spawn narration cycle          [Analyzing]
//!         vision.analyze (retry inside)
//!           └─▶ engine.generate
//!                 ├─ Skip     → wait for next frame    [Capturing]
//!                 └─ Narrate  → render each segment    [Narrating]
//!                                └─▶ done              [Capturing]
//!
//! Command::Pause   → gate rendering, drop frames       [Paused]
//! Command::Resume  → reopen the gate                   [back]
//! Command::Stop    → abort timer + cycle, reset        [Idle]
//! any failure      → report and await the next frame   [Error]
//! ```
//!
//! One frame is in flight at a time: frames that arrive while a cycle is
//! still running are dropped, never queued, so narration can never fall
//! behind the page being read.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::capture::FrameSource;
use crate::narration::{NarrationEngine, NarrationOutcome};
use crate::tts::{ProsodyMapper, SpeechRenderer};
use crate::vision::VisionClient;

use super::state::{NarrationStatus, SharedState, StatusReport, StatusUpdate};

/// Buffered status transitions per subscriber before lagging.
const STATUS_CHANNEL_CAPACITY: usize = 32;

// ---------------------------------------------------------------------------
// Commands and internal events
// ---------------------------------------------------------------------------

/// External control surface of the orchestrator.
#[derive(Debug)]
pub enum Command {
    /// Begin a narration session.  Ignored when one is already running.
    Start,
    /// Gate rendering and drop incoming frames until resumed.
    Pause,
    /// Reopen the rendering gate.
    Resume,
    /// End the session, cancel any in-flight work, and reset state.
    Stop,
    /// Snapshot the current session state.
    GetStatus(oneshot::Sender<StatusReport>),
    /// A frame captured by an external source, bypassing the built-in timer.
    CaptureCompleted { frame: Vec<u8>, timestamp: Instant },
    /// An external capture attempt failed.
    CaptureFailed { reason: String },
}

/// Feedback from the capture timer and narration cycle tasks.
#[derive(Debug)]
enum Event {
    FrameReady { frame: Vec<u8>, timestamp: Instant },
    CaptureFailed { reason: String },
    CycleFinished { error: Option<String> },
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives the complete narration loop.
///
/// Create with [`Orchestrator::new`], grab the command sender and a status
/// subscription, then call [`run`](Self::run) inside a tokio task.
pub struct Orchestrator {
    state: SharedState,
    frames: Arc<dyn FrameSource>,
    vision: Arc<dyn VisionClient>,
    engine: NarrationEngine,
    prosody: ProsodyMapper,
    renderer: Arc<dyn SpeechRenderer>,

    status_tx: broadcast::Sender<StatusUpdate>,
    pause_tx: watch::Sender<bool>,

    event_tx: mpsc::Sender<Event>,
    /// Taken by [`run`](Self::run); `None` afterwards.
    event_rx: Option<mpsc::Receiver<Event>>,

    capture_task: Option<JoinHandle<()>>,
    cycle_task: Option<JoinHandle<()>>,
}

impl Orchestrator {
    pub fn new(
        state: SharedState,
        frames: Arc<dyn FrameSource>,
        vision: Arc<dyn VisionClient>,
        renderer: Arc<dyn SpeechRenderer>,
        prosody: ProsodyMapper,
    ) -> Self {
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        let (pause_tx, _) = watch::channel(false);
        let (event_tx, event_rx) = mpsc::channel(16);

        Self {
            state,
            frames,
            vision,
            engine: NarrationEngine,
            prosody,
            renderer,
            status_tx,
            pause_tx,
            event_tx,
            event_rx: Some(event_rx),
            capture_task: None,
            cycle_task: None,
        }
    }

    /// Subscribe to status transitions.  Delivery is best-effort — slow
    /// subscribers lag, they never stall the loop.
    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusUpdate> {
        self.status_tx.subscribe()
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run the orchestrator until `cmd_rx` is closed.
    ///
    /// This is an `async fn` and should be spawned as a tokio task from
    /// `main()`.
    pub async fn run(mut self, mut cmd_rx: mpsc::Receiver<Command>) {
        let Some(mut event_rx) = self.event_rx.take() else {
            log::error!("orchestrator: run() called more than once");
            return;
        };

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                Some(event) = event_rx.recv() => self.handle_event(event),
            }
        }

        log::info!("orchestrator: command channel closed, shutting down");
        self.teardown();
    }

    // -----------------------------------------------------------------------
    // Command handlers
    // -----------------------------------------------------------------------

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Start => self.handle_start(),
            Command::Pause => self.handle_pause(),
            Command::Resume => self.handle_resume(),
            Command::Stop => self.handle_stop(),
            Command::GetStatus(reply) => {
                let report = self.state.lock().unwrap().report();
                // The caller may have given up waiting; that is fine.
                let _ = reply.send(report);
            }
            Command::CaptureCompleted { frame, timestamp } => {
                self.handle_frame(frame, timestamp)
            }
            Command::CaptureFailed { reason } => {
                log::warn!("orchestrator: capture failed: {reason}");
                self.set_error(format!("Screen capture failed: {reason}"));
            }
        }
    }

    fn handle_start(&mut self) {
        if self.session_running() {
            // A fresh start is the sanctioned way out of the error state;
            // counters and timers survive.
            let in_error = self.state.lock().unwrap().status == NarrationStatus::Error;
            if in_error {
                log::info!("orchestrator: restarting after error");
                {
                    let mut st = self.state.lock().unwrap();
                    st.status = NarrationStatus::Capturing;
                    st.error_message = None;
                }
                self.broadcast(NarrationStatus::Capturing, None);
            } else {
                log::warn!("orchestrator: start ignored, session already running");
            }
            return;
        }

        log::info!("orchestrator: starting narration session");
        {
            let mut st = self.state.lock().unwrap();
            st.reset_session();
            st.status = NarrationStatus::Capturing;
            st.started_at = Some(Instant::now());
        }
        self.pause_tx.send_replace(false);
        self.broadcast(NarrationStatus::Capturing, None);
        self.spawn_capture_timer();
    }

    fn handle_pause(&mut self) {
        if !self.session_running() {
            log::warn!("orchestrator: pause ignored, no session running");
            return;
        }
        // Error exits only through stop or a fresh start, never pause.
        if self.state.lock().unwrap().status == NarrationStatus::Error {
            return;
        }
        if *self.pause_tx.borrow() {
            return;
        }

        log::info!("orchestrator: paused");
        self.pause_tx.send_replace(true);
        self.set_status(NarrationStatus::Paused);
        self.broadcast(NarrationStatus::Paused, None);
    }

    fn handle_resume(&mut self) {
        if !self.session_running() || !*self.pause_tx.borrow() {
            return;
        }

        log::info!("orchestrator: resumed");
        self.pause_tx.send_replace(false);
        let status = if self.cycle_task.is_some() {
            NarrationStatus::Narrating
        } else {
            NarrationStatus::Capturing
        };
        self.set_status(status);
        self.broadcast(status, None);
    }

    fn handle_stop(&mut self) {
        if !self.session_running() {
            return;
        }

        log::info!("orchestrator: stopping narration session");
        self.teardown();
        self.pause_tx.send_replace(false);
        self.state.lock().unwrap().reset_session();
        self.broadcast(NarrationStatus::Idle, None);
    }

    // -----------------------------------------------------------------------
    // Event handlers
    // -----------------------------------------------------------------------

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::FrameReady { frame, timestamp } => self.handle_frame(frame, timestamp),
            Event::CaptureFailed { reason } => {
                log::warn!("orchestrator: capture failed: {reason}");
                self.set_error(format!("Screen capture failed: {reason}"));
            }
            Event::CycleFinished { error } => self.handle_cycle_finished(error),
        }
    }

    fn handle_frame(&mut self, frame: Vec<u8>, timestamp: Instant) {
        if !self.session_running() {
            return;
        }
        if self.state.lock().unwrap().status == NarrationStatus::Error {
            log::debug!("orchestrator: in error state, dropping frame");
            return;
        }
        if *self.pause_tx.borrow() {
            log::debug!("orchestrator: paused, dropping frame");
            return;
        }
        if self.cycle_task.is_some() {
            log::debug!("orchestrator: cycle still in flight, dropping frame");
            return;
        }

        {
            let mut st = self.state.lock().unwrap();
            st.capture_count += 1;
            st.last_capture_at = Some(timestamp);
            st.status = NarrationStatus::Analyzing;
        }
        self.broadcast(NarrationStatus::Analyzing, None);

        let vision = Arc::clone(&self.vision);
        let renderer = Arc::clone(&self.renderer);
        let state = Arc::clone(&self.state);
        let engine = self.engine;
        let prosody = self.prosody.clone();
        let status_tx = self.status_tx.clone();
        let mut pause_rx = self.pause_tx.subscribe();
        let event_tx = self.event_tx.clone();

        self.cycle_task = Some(tokio::spawn(async move {
            let result = run_cycle(
                &frame,
                vision.as_ref(),
                engine,
                &prosody,
                renderer.as_ref(),
                &state,
                &status_tx,
                &mut pause_rx,
            )
            .await;
            let _ = event_tx
                .send(Event::CycleFinished { error: result.err() })
                .await;
        }));
    }

    fn handle_cycle_finished(&mut self, error: Option<String>) {
        self.cycle_task = None;
        if !self.session_running() {
            return;
        }

        match error {
            Some(message) => self.set_error(message),
            None => {
                // A capture failure may have tripped the error state while
                // this cycle was still rendering; the error must stick.
                if self.state.lock().unwrap().status == NarrationStatus::Error {
                    return;
                }
                let status = if *self.pause_tx.borrow() {
                    NarrationStatus::Paused
                } else {
                    NarrationStatus::Capturing
                };
                self.set_status(status);
                self.broadcast(status, None);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Periodic frame capture.  The first frame fires immediately; later
    /// frames follow the configured interval.
    fn spawn_capture_timer(&mut self) {
        let interval_secs = {
            let st = self.state.lock().unwrap();
            st.config.capture.interval_secs
        };
        let frames = Arc::clone(&self.frames);
        let event_tx = self.event_tx.clone();

        self.capture_task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            loop {
                ticker.tick().await;
                let event = match frames.capture_frame().await {
                    Ok(frame) => Event::FrameReady {
                        frame,
                        timestamp: Instant::now(),
                    },
                    Err(e) => Event::CaptureFailed {
                        reason: e.to_string(),
                    },
                };
                if event_tx.send(event).await.is_err() {
                    break;
                }
            }
        }));
    }

    fn session_running(&self) -> bool {
        self.state.lock().unwrap().started_at.is_some()
    }

    fn teardown(&mut self) {
        if let Some(task) = self.capture_task.take() {
            task.abort();
        }
        if let Some(task) = self.cycle_task.take() {
            task.abort();
        }
    }

    fn set_status(&self, status: NarrationStatus) {
        self.state.lock().unwrap().status = status;
    }

    fn set_error(&self, message: String) {
        log::error!("orchestrator error: {message}");
        {
            let mut st = self.state.lock().unwrap();
            st.status = NarrationStatus::Error;
            st.error_message = Some(message.clone());
        }
        self.broadcast(NarrationStatus::Error, Some(message));
    }

    fn broadcast(&self, status: NarrationStatus, message: Option<String>) {
        // Best-effort: no subscribers is not an error.
        let _ = self.status_tx.send(StatusUpdate { status, message });
    }
}

// ---------------------------------------------------------------------------
// Narration cycle
// ---------------------------------------------------------------------------

/// One frame's trip through the pipeline: analyze, generate narration,
/// render each segment.  Rendering is gated on the pause flag between
/// segments; a pause mid-utterance lets the current utterance finish.
#[allow(clippy::too_many_arguments)]
async fn run_cycle(
    frame: &[u8],
    vision: &dyn VisionClient,
    engine: NarrationEngine,
    prosody: &ProsodyMapper,
    renderer: &dyn SpeechRenderer,
    state: &SharedState,
    status_tx: &broadcast::Sender<StatusUpdate>,
    pause_rx: &mut watch::Receiver<bool>,
) -> Result<(), String> {
    let analysis = vision
        .analyze(frame)
        .await
        .map_err(|e| e.user_message())?;

    let previous = state.lock().unwrap().previous_narration.clone();
    let outcome = engine.generate(&analysis, previous.as_deref());

    let (segments, combined_text) = match outcome {
        NarrationOutcome::Skip => {
            log::debug!("cycle: nothing new to narrate");
            return Ok(());
        }
        NarrationOutcome::Narrate {
            segments,
            combined_text,
        } => (segments, combined_text),
    };

    {
        let mut st = state.lock().unwrap();
        st.status = NarrationStatus::Narrating;
    }
    let _ = status_tx.send(StatusUpdate {
        status: NarrationStatus::Narrating,
        message: Some(combined_text.clone()),
    });

    log::info!(
        "cycle: narrating {} segment(s): {combined_text:?}",
        segments.len()
    );

    for segment in &segments {
        wait_while_paused(pause_rx).await;
        let params = prosody.map(segment);
        renderer
            .render(&segment.text, &params)
            .await
            .map_err(|e| format!("Speech rendering failed: {e}"))?;
    }

    // Only a fully narrated cycle moves the redundancy baseline.
    state.lock().unwrap().previous_narration = Some(combined_text);
    Ok(())
}

/// Block until the pause flag is clear.  A closed watch channel means the
/// orchestrator is gone; rendering proceeds so the task can wind down.
async fn wait_while_paused(pause_rx: &mut watch::Receiver<bool>) {
    while *pause_rx.borrow() {
        if pause_rx.changed().await.is_err() {
            break;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
