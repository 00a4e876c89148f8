//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// VisionConfig
// ---------------------------------------------------------------------------

/// Settings for the vision-analysis API call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// Base URL of an OpenAI-compatible API endpoint.
    pub base_url: String,
    /// Vision-capable model identifier sent to the API (e.g. `"gpt-4o"`).
    pub model: String,
    /// Maximum seconds to wait for an analysis response before timing out.
    pub timeout_secs: u64,
    /// Soft upper bound in milliseconds for a full analysis call.  Exceeding
    /// it is logged as a warning, never treated as a failure.
    pub timing_target_ms: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            model: "gpt-4o".into(),
            timeout_secs: 30,
            timing_target_ms: 5_000,
        }
    }
}

// ---------------------------------------------------------------------------
// TtsConfig
// ---------------------------------------------------------------------------

/// Settings for the speech-synthesis backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Base URL of an OpenAI-compatible audio endpoint.
    pub base_url: String,
    /// Speech model identifier (e.g. `"tts-1-hd"`).
    pub model: String,
    /// Preferred voice name — empty means pick by speaker gender.
    pub voice: String,
    /// User base speech rate; prosody speed multipliers apply on top of this.
    pub speech_rate: f32,
    /// Maximum seconds to wait for a synthesis response.
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            model: "tts-1-hd".into(),
            voice: String::new(),
            speech_rate: 1.0,
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// CaptureConfig
// ---------------------------------------------------------------------------

/// Settings for the periodic page capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Seconds between periodic captures after the initial immediate one.
    pub interval_secs: u64,
    /// Directory the file-based frame source watches — `None` means the
    /// platform default under the app data dir.
    pub pages_dir: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            pages_dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use manga_narrator::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the vision and speech endpoints — `None` until the user
    /// configures one.  Its absence fails analysis immediately, no retry.
    pub api_key: Option<String>,
    /// Start narrating as soon as the application launches.
    pub auto_start: bool,
    /// Vision-analysis settings.
    pub vision: VisionConfig,
    /// Speech-synthesis settings.
    pub tts: TtsConfig,
    /// Periodic capture settings.
    pub capture: CaptureConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            auto_start: false,
            vision: VisionConfig::default(),
            tts: TtsConfig::default(),
            capture: CaptureConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns `true` when no `settings.toml` file exists yet — first-run
    /// detection.
    pub fn is_first_run() -> bool {
        !AppPaths::new().settings_file.exists()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
