use super::grayscale;
use crate::drawing::{draw_box, draw_label, LabelFont};
use crate::engine::{OcrData, OcrEngine};
use crate::error::VisionError;
use image::{GrayImage, Rgb, RgbImage};
use serde::Serialize;

/// Vertical gap between a label's baseline and its box
const LABEL_OFFSET: i32 = 10;

/// Display bucket for a detection's confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    /// First match wins: above 70 is high, above 50 is medium, the rest low
    pub fn from_confidence(confidence: u8) -> Self {
        if confidence > 70 {
            Self::High
        } else if confidence > 50 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn color(&self) -> Rgb<u8> {
        match self {
            Self::High => Rgb([0, 255, 0]),
            Self::Medium => Rgb([255, 255, 0]),
            Self::Low => Rgb([255, 0, 0]),
        }
    }

    pub fn thickness(&self) -> u32 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }
}

/// Pixel box relative to the binarized image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextDetection {
    pub text: String,
    pub confidence: u8,
    #[serde(rename = "box")]
    pub bbox: TextBox,
}

impl TextDetection {
    pub fn tier(&self) -> ConfidenceTier {
        ConfidenceTier::from_confidence(self.confidence)
    }

    /// Caption drawn above the box
    pub fn label(&self) -> String {
        format!("{} ({}%)", self.text, self.confidence)
    }
}

/// Annotated canvas plus retained detections in engine emission order
#[derive(Debug, Clone)]
pub struct Annotation {
    pub canvas: RgbImage,
    pub detections: Vec<TextDetection>,
}

impl Annotation {
    pub fn pairs(&self) -> Vec<(&str, u8)> {
        self.detections
            .iter()
            .map(|d| (d.text.as_str(), d.confidence))
            .collect()
    }
}

/// Run OCR on the binary image and annotate the results over the original grayscale
pub fn locate_and_annotate(
    engine: &dyn OcrEngine,
    binary: &GrayImage,
    original_gray: &GrayImage,
    font: Option<&LabelFont>,
) -> Result<Annotation, VisionError> {
    let data = engine.extract(binary)?;
    if data.is_empty() {
        tracing::debug!("{} found no text", engine.name());
    } else {
        tracing::debug!("{} returned {} raw detection(s)", engine.name(), data.len());
    }
    Ok(annotate(&data, original_gray, font))
}

/// Keep every detection with non-blank text and draw it in its tier's style.
///
/// Confidence never filters: a 0% detection with text is kept.
pub fn annotate(data: &OcrData, original_gray: &GrayImage, font: Option<&LabelFont>) -> Annotation {
    let mut canvas = grayscale::to_canvas(original_gray);
    let mut detections = Vec::new();

    for raw in data.iter() {
        let text = raw.text.trim();
        if text.is_empty() {
            continue;
        }

        let detection = TextDetection {
            text: text.to_string(),
            confidence: raw.conf.clamp(0, 100) as u8,
            bbox: TextBox {
                x: raw.left,
                y: raw.top,
                width: raw.width.max(0) as u32,
                height: raw.height.max(0) as u32,
            },
        };
        let tier = detection.tier();
        let bbox = detection.bbox;

        draw_box(&mut canvas, bbox.x, bbox.y, bbox.width, bbox.height, tier.color(), tier.thickness());
        draw_label(
            &mut canvas,
            font,
            bbox.x,
            bbox.y - LABEL_OFFSET,
            tier.color(),
            &detection.label(),
        );

        detections.push(detection);
    }

    Annotation { canvas, detections }
}
