//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\manga-narrator\
//!   macOS:   ~/Library/Application Support/manga-narrator/
//!   Linux:   ~/.config/manga-narrator/
//!
//! Data dir (captured pages for the file-based frame source):
//!   Windows: %LOCALAPPDATA%\manga-narrator\
//!   macOS:   ~/Library/Application Support/manga-narrator/
//!   Linux:   ~/.local/share/manga-narrator/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Default directory the file-based frame source watches for page images.
    pub pages_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "manga-narrator";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path (should be extremely rare in practice).
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let pages_dir = data_dir.join("pages");

        Self {
            config_dir,
            settings_file,
            pages_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
