//! Vision-analysis module for Manga Narrator.
//!
//! This module provides:
//! * [`VisionClient`] — async trait implemented by analysis backends.
//! * [`ApiVisionClient`] — OpenAI-compatible chat-completions client with
//!   bounded retry/backoff and error classification.
//! * [`parse_analysis`] — total parser from raw model text to [`Analysis`].
//! * [`Analysis`] / [`Panel`] / [`Character`] / [`Gender`] — the typed,
//!   fully-populated analysis model.
//! * [`AnalysisError`] — classified failure taxonomy.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use manga_narrator::config::AppConfig;
//! use manga_narrator::vision::{ApiVisionClient, VisionClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::load().unwrap();
//!     let client = ApiVisionClient::from_config(&config);
//!
//!     let image = std::fs::read("page.jpg").unwrap();
//!     match client.analyze(&image).await {
//!         Ok(analysis) => println!("{} panels", analysis.panels.len()),
//!         Err(e) => eprintln!("{}", e.user_message()),
//!     }
//! }
//! ```

pub mod client;
pub mod model;
pub mod parser;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{backoff_delay, AnalysisError, ApiVisionClient, VisionClient, MAX_ATTEMPTS};
pub use model::{Analysis, Character, Gender, Panel};
pub use parser::{fallback_analysis, parse_analysis, strip_code_fences};
