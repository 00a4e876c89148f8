//! Narration orchestrator.
//!
//! Wires the full capture → vision analysis → narration → speech loop and
//! exposes the shared state and status stream that frontends observe.
//!
//! # Architecture
//!
//! ```text
//! Command (mpsc)
//!        │
//!        ▼
//! Orchestrator::run()  ← async tokio task
//!        │
//!        ├─ Start  → spawn capture timer (first frame immediately,
//!        │           then every capture interval)
//!        │
//!        └─ frame ready (one in flight; extras dropped)
//!              │
//!              ├─ VisionClient::analyze        → Analyzing
//!              ├─ NarrationEngine::generate    (Skip = nothing new)
//!              └─ ProsodyMapper + SpeechRenderer per segment → Narrating
//!
//! SharedState (Arc<Mutex<OperationState>>) ←─ status queries
//! StatusUpdate (broadcast)                 ←─ live transitions, best-effort
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use manga_narrator::config::AppConfig;
//! use manga_narrator::capture::PageFileSource;
//! use manga_narrator::orchestrator::{new_shared_state, Command, Orchestrator};
//! use manga_narrator::tts::{ApiSpeechRenderer, ProsodyMapper};
//! use manga_narrator::vision::ApiVisionClient;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let shared_state = new_shared_state(config.clone());
//!
//!     let orchestrator = Orchestrator::new(
//!         shared_state.clone(),
//!         Arc::new(PageFileSource::new("pages")),
//!         Arc::new(ApiVisionClient::from_config(&config)),
//!         Arc::new(ApiSpeechRenderer::from_config(&config)),
//!         ProsodyMapper::new(config.tts.speech_rate),
//!     );
//!
//!     let (cmd_tx, cmd_rx) = mpsc::channel(16);
//!     let mut status_rx = orchestrator.subscribe_status();
//!     tokio::spawn(async move { orchestrator.run(cmd_rx).await });
//!
//!     cmd_tx.send(Command::Start).await.unwrap();
//!     while let Ok(update) = status_rx.recv().await {
//!         println!("{}", update.status.label());
//!     }
//! }
//! ```

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{Command, Orchestrator};
pub use state::{
    new_shared_state, NarrationStatus, OperationState, SharedState, StatusReport, StatusUpdate,
};
