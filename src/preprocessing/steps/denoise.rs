use image::GrayImage;
use imageproc::filter::separable_filter_equal;

/// Gaussian sigma derived from kernel size, matching the usual
/// `0.3 * ((k - 1) * 0.5 - 1) + 0.8` rule (0.8 for a 3x3 kernel)
pub fn sigma_for_kernel(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalised 1-D Gaussian weights for an odd kernel size
fn gaussian_kernel(kernel_size: u32) -> Vec<f32> {
    let sigma = sigma_for_kernel(kernel_size);
    let radius = (kernel_size / 2) as i32;

    let weights: Vec<f32> = (-radius..=radius)
        .map(|i| (-(i * i) as f32 / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = weights.iter().sum();

    weights.into_iter().map(|w| w / sum).collect()
}

/// Apply a light Gaussian blur to suppress sensor and surface noise.
///
/// Keep the kernel small: thin character strokes disappear under heavy
/// smoothing. Borders replicate the edge pixel.
pub fn apply(gray: &GrayImage, kernel_size: u32) -> GrayImage {
    let kernel = gaussian_kernel(kernel_size.max(1) | 1);
    separable_filter_equal(gray, &kernel)
}
