//! OCRS engine implementation
//!
//! Pure Rust OCR engine using the ocrs library. No system dependencies required.
//! Downloads neural network models automatically on first use.

use super::download::{cache_root, ensure_cached};
use crate::engine::{OcrData, OcrEngine};
use crate::error::VisionError;
use image::{DynamicImage, GrayImage};
use ocrs::{DecodeMethod, ImageSource, OcrEngine as OcrsOcrEngine, OcrEngineParams, TextItem};
use rten::Model;

/// Default model URLs from the ocrs project
const DETECTION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten";
const RECOGNITION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten";

/// OCR Engine wrapping the ocrs library
pub struct OcrsEngine {
    engine: OcrsOcrEngine,
}

impl OcrsEngine {
    /// Create a new OCR engine, downloading models if needed
    pub fn new() -> Result<Self, VisionError> {
        let model_dir = cache_root().join("ocrs");
        let detection_model_path =
            ensure_cached(DETECTION_MODEL_URL, &model_dir, "text-detection.rten")?;
        let recognition_model_path =
            ensure_cached(RECOGNITION_MODEL_URL, &model_dir, "text-recognition.rten")?;

        let detection_model = Model::load_file(&detection_model_path).map_err(|e| {
            VisionError::ModelLoad(format!("Failed to load detection model: {}", e))
        })?;
        let recognition_model = Model::load_file(&recognition_model_path).map_err(|e| {
            VisionError::ModelLoad(format!("Failed to load recognition model: {}", e))
        })?;

        let engine = OcrsOcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            decode_method: DecodeMethod::Greedy,
            ..Default::default()
        })
        .map_err(|e| VisionError::ModelLoad(format!("Failed to create OCR engine: {}", e)))?;

        tracing::info!("ocrs engine initialized successfully");

        Ok(Self { engine })
    }
}

impl OcrEngine for OcrsEngine {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn description(&self) -> &'static str {
        "Pure Rust OCR engine - fast, no system dependencies required"
    }

    /// One detection per recognised text line
    fn extract(&self, image: &GrayImage) -> Result<OcrData, VisionError> {
        // ImageSource::from_bytes expects HWC RGB
        let rgb_img = DynamicImage::ImageLuma8(image.clone()).into_rgb8();
        let dimensions = rgb_img.dimensions();

        let img_source = ImageSource::from_bytes(rgb_img.as_raw(), dimensions)
            .map_err(|e| VisionError::Ocr(format!("Failed to create image source: {}", e)))?;

        let ocr_input = self
            .engine
            .prepare_input(img_source)
            .map_err(|e| VisionError::Ocr(format!("Failed to prepare input: {}", e)))?;

        let word_rects = self
            .engine
            .detect_words(&ocr_input)
            .map_err(|e| VisionError::Ocr(format!("Failed to detect words: {}", e)))?;

        let line_rects = self.engine.find_text_lines(&ocr_input, &word_rects);

        let line_texts = self
            .engine
            .recognize_text(&ocr_input, &line_rects)
            .map_err(|e| VisionError::Ocr(format!("Failed to recognize text: {}", e)))?;

        let mut data = OcrData::default();
        for line in line_texts.iter().flatten() {
            let text = line
                .words()
                .map(|word| word.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            let rect = line.bounding_rect();

            data.push(
                text.clone(),
                line_confidence(&text) as i32,
                rect.left(),
                rect.top(),
                rect.width(),
                rect.height(),
            );
        }

        tracing::debug!("ocrs recognised {} line(s)", data.len());

        Ok(data)
    }
}

// ============================================================================
// Confidence scoring heuristics
// ============================================================================

/// Score one recognised line on a 0-100 scale.
///
/// ocrs doesn't report per-character confidence, so the recognised text is
/// checked for patterns that indicate garbled output. Sign text on glass is
/// short, so whitespace density is not scored.
fn line_confidence(text: &str) -> u8 {
    let text = text.trim();
    if text.is_empty() {
        return 0;
    }

    let char_score = analyze_char_frequency(text);
    let word_score = analyze_word_lengths(text);
    let repetition_score = detect_repetition(text);

    let mut confidence = 0.55 * char_score + 0.25 * word_score + 0.20 * repetition_score;

    // One or two glyphs are too little evidence either way
    if text.chars().count() < 3 {
        confidence *= 0.6;
    }

    (confidence.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// Analyze character frequency for signs of garbled OCR.
///
/// Penalizes text with too many special/control characters or too few
/// letters and digits.
fn analyze_char_frequency(text: &str) -> f32 {
    let total = text.chars().filter(|c| !c.is_whitespace()).count();
    if total == 0 {
        return 0.0;
    }

    let alphanumeric = text.chars().filter(|c| c.is_alphanumeric()).count();
    let special = text
        .chars()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace() && !c.is_ascii_punctuation())
        .count();

    let special_ratio = special as f32 / total as f32;
    let special_penalty = 1.0 - (special_ratio * 10.0).min(1.0);

    let alnum_ratio = alphanumeric as f32 / total as f32;
    let alnum_score = (alnum_ratio * 1.25).min(1.0);

    special_penalty * 0.6 + alnum_score * 0.4
}

/// Analyze word length distribution.
///
/// Garbled OCR often produces runs of single-character "words" or very long sequences.
fn analyze_word_lengths(text: &str) -> f32 {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return 0.5;
    }

    let total_len: usize = words.iter().map(|w| w.chars().count()).sum();
    let avg_len = total_len as f32 / words.len() as f32;

    // Signage favours short words, so 2-8 characters score fully
    let avg_score = match avg_len as usize {
        0..=1 => 0.4,
        2..=8 => 1.0,
        9..=12 => 0.8,
        _ => 0.4,
    };

    let single_count = words.iter().filter(|w| w.chars().count() == 1).count();
    let single_ratio = single_count as f32 / words.len() as f32;
    let single_penalty = 1.0 - (single_ratio * 1.5).min(0.5);

    avg_score * single_penalty
}

/// Detect repeated character sequences.
///
/// Patterns like "aaaa" or "####" often indicate OCR confusion.
fn detect_repetition(text: &str) -> f32 {
    let mut max_repeat = 1;
    let mut current = 1;
    let mut prev: Option<char> = None;

    for c in text.chars() {
        if Some(c) == prev && !c.is_whitespace() {
            current += 1;
            max_repeat = max_repeat.max(current);
        } else {
            current = 1;
        }
        prev = Some(c);
    }

    match max_repeat {
        1..=3 => 1.0,
        4..=5 => 0.8,
        6..=10 => 0.5,
        _ => 0.2,
    }
}
