use image::{DynamicImage, GrayImage, RgbImage};

/// Convert image to single-channel luminance
/// This is the foundation for every later stage
pub fn apply(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}

/// Expand a grayscale image to three identical channels, used as a drawing canvas
pub fn to_canvas(gray: &GrayImage) -> RgbImage {
    DynamicImage::ImageLuma8(gray.clone()).into_rgb8()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba, RgbaImage};

    #[test]
    fn test_grayscale_converts_color() {
        let mut img = RgbImage::new(10, 10);
        img.put_pixel(0, 0, Rgb([255, 0, 0])); // Red
        img.put_pixel(1, 0, Rgb([0, 255, 0])); // Green
        img.put_pixel(2, 0, Rgb([0, 0, 255])); // Blue

        let gray = apply(&DynamicImage::ImageRgb8(img));

        assert!(gray.get_pixel(0, 0).0[0] > 0);
        assert!(gray.get_pixel(1, 0).0[0] > 0);
        assert!(gray.get_pixel(2, 0).0[0] > 0);
        // Green carries the most luminance
        assert!(gray.get_pixel(1, 0).0[0] > gray.get_pixel(0, 0).0[0]);
    }

    #[test]
    fn test_grayscale_preserves_dimensions() {
        let img = RgbImage::new(100, 50);
        let gray = apply(&DynamicImage::ImageRgb8(img));
        assert_eq!(gray.dimensions(), (100, 50));
    }

    #[test]
    fn test_grayscale_drops_alpha() {
        let img = RgbaImage::from_pixel(4, 3, Rgba([200, 200, 200, 10]));
        let gray = apply(&DynamicImage::ImageRgba8(img));
        assert_eq!(gray.dimensions(), (4, 3));
        assert_eq!(gray.get_pixel(0, 0).0[0], 200);
    }

    #[test]
    fn test_canvas_replicates_channels() {
        let gray = GrayImage::from_pixel(2, 2, image::Luma([77]));
        let canvas = to_canvas(&gray);
        assert_eq!(*canvas.get_pixel(1, 1), Rgb([77, 77, 77]));
    }
}
