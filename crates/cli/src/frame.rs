//! Frame capture from an image file.
//!
//! A terminal has no video element to grab pixels from, so the "current
//! frame" is whatever image sits at a configured path. The file is read
//! again on every capture, letting an external player or `ffmpeg` keep it
//! up to date while the user edits crops.

use std::path::{Path, PathBuf};

use cliptrim_core::crop_editor::FrameSource;
use cliptrim_core::error::CoreError;
use image::RgbaImage;

#[derive(Debug, Clone, Default)]
pub struct ImageFrameSource {
    path: Option<PathBuf>,
}

impl ImageFrameSource {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }
}

impl FrameSource for ImageFrameSource {
    fn capture(&self) -> Result<RgbaImage, CoreError> {
        let path = self.path.as_deref().ok_or_else(|| {
            CoreError::Frame(
                "No video frame available; set CLIPTRIM_FRAME_PATH or run `frame PATH`".to_string(),
            )
        })?;

        let image = image::open(path)
            .map_err(|e| CoreError::Frame(format!("Cannot read frame {}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), width = image.width(), height = image.height(), "Captured frame");
        Ok(image.to_rgba8())
    }
}

/// Write an image as PNG, creating parent directories as needed.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<(), CoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| CoreError::Internal(format!("Cannot create {}: {e}", parent.display())))?;
    }
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| CoreError::Internal(format!("Cannot write {}: {e}", path.display())))
}
