use crate::error::VisionError;
use image::{GrayImage, RgbImage};
use std::path::{Path, PathBuf};

pub const GRAY_IMAGE: &str = "gray_image.jpg";
pub const LIGHT_BLUR: &str = "light_blur.jpg";
pub const THRESHOLD_IMAGE: &str = "threshold_image.jpg";
pub const TEXT_BOXES: &str = "step4_text_boxes.jpg";

/// Writes inspection images for one pipeline run.
///
/// Writing is a debugging aid: failures are logged and never fail a stage.
pub struct ArtifactWriter {
    dir: Option<PathBuf>,
}

impl ArtifactWriter {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: Some(dir.to_path_buf()),
        }
    }

    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn save_gray(&self, name: &str, image: &GrayImage) {
        self.save_with(name, |path| image.save(path));
    }

    pub fn save_rgb(&self, name: &str, image: &RgbImage) {
        self.save_with(name, |path| image.save(path));
    }

    fn save_with<F>(&self, name: &str, save: F)
    where
        F: FnOnce(&Path) -> image::ImageResult<()>,
    {
        let Some(dir) = &self.dir else {
            return;
        };

        let path = dir.join(name);
        let result = std::fs::create_dir_all(dir)
            .map_err(|e| VisionError::Artifact {
                path: path.clone(),
                reason: e.to_string(),
            })
            .and_then(|_| {
                save(&path).map_err(|e| VisionError::Artifact {
                    path: path.clone(),
                    reason: e.to_string(),
                })
            });

        match result {
            Ok(()) => tracing::debug!("Saved {:?}", path),
            Err(e) => tracing::warn!("{}", e),
        }
    }
}
