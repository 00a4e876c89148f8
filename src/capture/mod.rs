//! Page frame acquisition.
//!
//! The narrator consumes manga pages as raw image bytes.  [`FrameSource`] is
//! the seam the orchestrator captures through; [`PageFileSource`] is the
//! desktop implementation that watches a directory and serves the most
//! recently modified image, so dropping a fresh screenshot or page scan into
//! the folder is all it takes to feed the pipeline.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use thiserror::Error;

/// Extensions recognized as page images.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("pages directory {0} does not exist")]
    MissingDir(PathBuf),
    #[error("no page images found in {0}")]
    NoPages(PathBuf),
    #[error("failed to read page image: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// FrameSource trait
// ---------------------------------------------------------------------------

/// Source of page frames for the narration pipeline.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Capture the current page as encoded image bytes.
    async fn capture_frame(&self) -> Result<Vec<u8>, CaptureError>;
}

// ---------------------------------------------------------------------------
// PageFileSource
// ---------------------------------------------------------------------------

/// Serves the newest image file from a watched directory.
pub struct PageFileSource {
    pages_dir: PathBuf,
}

impl PageFileSource {
    pub fn new(pages_dir: impl Into<PathBuf>) -> Self {
        Self {
            pages_dir: pages_dir.into(),
        }
    }

    /// Most recently modified image in the watched directory.
    fn newest_page(&self) -> Result<PathBuf, CaptureError> {
        if !self.pages_dir.is_dir() {
            return Err(CaptureError::MissingDir(self.pages_dir.clone()));
        }

        let mut newest: Option<(SystemTime, PathBuf)> = None;
        for entry in std::fs::read_dir(&self.pages_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !is_image(&path) {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
                newest = Some((modified, path));
            }
        }

        newest
            .map(|(_, path)| path)
            .ok_or_else(|| CaptureError::NoPages(self.pages_dir.clone()))
    }
}

#[async_trait]
impl FrameSource for PageFileSource {
    async fn capture_frame(&self) -> Result<Vec<u8>, CaptureError> {
        let path = self.newest_page()?;
        log::debug!("capturing page {}", path.display());
        Ok(tokio::fs::read(&path).await?)
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            IMAGE_EXTENSIONS.iter().any(|known| *known == ext)
        })
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
