use super::grayscale;
use crate::error::VisionError;
use image::{GrayImage, RgbImage};
use std::path::Path;

/// A decoded source image and its luminance
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub color: RgbImage,
    pub gray: GrayImage,
}

/// Read and decode an image, deriving its grayscale version.
/// Any alpha channel is dropped.
pub fn apply(path: &Path) -> Result<LoadedImage, VisionError> {
    let image = image::open(path).map_err(|e| VisionError::image_load(path, e))?;

    if image.width() == 0 || image.height() == 0 {
        return Err(VisionError::image_load(path, "image has no pixels"));
    }

    let gray = grayscale::apply(&image);

    Ok(LoadedImage {
        color: image.into_rgb8(),
        gray,
    })
}
