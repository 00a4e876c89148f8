//! Manga Narrator — ambient narration for on-screen manga pages.
//!
//! Periodically captures the page being read, sends it to a vision backend
//! for structured scene analysis, turns the analysis into emotion-annotated
//! narration segments, and renders them to speech.
//!
//! # Module map
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`config`] | Settings file, defaults, config directory paths |
//! | [`capture`] | Page frame acquisition ([`capture::FrameSource`]) |
//! | [`vision`] | Vision backend client, retry policy, analysis parsing |
//! | [`narration`] | Emotion inference, emphasis, redundancy suppression |
//! | [`tts`] | Prosody mapping and speech rendering |
//! | [`orchestrator`] | State machine driving the capture → narrate loop |

pub mod capture;
pub mod config;
pub mod narration;
pub mod orchestrator;
pub mod tts;
pub mod vision;
