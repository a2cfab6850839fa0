//! Box and label drawing shared by the text annotator and the detector harness

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};

/// Label glyph height in pixels
const LABEL_SCALE: f32 = 16.0;

/// Fonts tried when no font path is configured
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// TrueType font used for box labels
pub struct LabelFont {
    font: FontVec,
    path: PathBuf,
}

impl LabelFont {
    /// Load a font from an explicit path
    pub fn from_file(path: &Path) -> Option<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| tracing::warn!("Cannot read font {:?}: {}", path, e))
            .ok()?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| tracing::warn!("Cannot parse font {:?}: {}", path, e))
            .ok()?;

        Some(Self {
            font,
            path: path.to_path_buf(),
        })
    }

    /// Use the configured font, or the first well-known system font that loads.
    /// Returns `None` (boxes only, no labels) when nothing is usable.
    pub fn locate(configured: Option<&Path>) -> Option<Self> {
        let font = match configured {
            Some(path) => Self::from_file(path),
            None => SYSTEM_FONTS
                .iter()
                .map(Path::new)
                .filter(|p| p.exists())
                .find_map(Self::from_file),
        };

        match &font {
            Some(font) => tracing::debug!("Using label font {:?}", font.path),
            None => tracing::warn!("No usable label font found; annotations will have boxes only"),
        }

        font
    }
}

/// Draw a `width`×`height` box at (`x`, `y`) with the given stroke thickness.
/// Strokes are centred on the box edge and clipped to the canvas.
pub fn draw_box(canvas: &mut RgbImage, x: i32, y: i32, width: u32, height: u32, color: Rgb<u8>, thickness: u32) {
    let thickness = thickness.max(1) as i32;
    let inner = thickness / 2;

    for offset in -inner..(thickness - inner) {
        let w = width as i32 - 2 * offset;
        let h = height as i32 - 2 * offset;
        if w <= 0 || h <= 0 {
            continue;
        }
        let rect = Rect::at(x + offset, y + offset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

/// Draw `text` with its baseline at (`x`, `baseline_y`).
/// Without a font this is a no-op.
pub fn draw_label(canvas: &mut RgbImage, font: Option<&LabelFont>, x: i32, baseline_y: i32, color: Rgb<u8>, text: &str) {
    let Some(font) = font else {
        return;
    };

    // draw_text_mut takes the top of the line box
    let ascent = font.font.as_scaled(PxScale::from(LABEL_SCALE)).ascent();
    let top = baseline_y - ascent.round() as i32;
    draw_text_mut(canvas, color, x, top, PxScale::from(LABEL_SCALE), &font.font, text);
}
