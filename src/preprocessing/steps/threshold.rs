use image::GrayImage;
use imageproc::contrast::{otsu_level, threshold, ThresholdType};

/// Binarize with an automatic global threshold.
///
/// The threshold maximises between-class variance over the intensity
/// histogram (Otsu), so it follows the lighting of each glass surface.
/// Polarity is inverted: dark text at or below the threshold becomes 255,
/// the lighter background becomes 0.
pub fn apply(blurred: &GrayImage) -> GrayImage {
    let level = otsu_level(blurred);
    tracing::debug!("Otsu threshold: {}", level);
    threshold(blurred, level, ThresholdType::BinaryInverted)
}
