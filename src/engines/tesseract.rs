//! Tesseract engine implementation
//!
//! Tesseract-based OCR engine. Uses tesseract-static crate for static linking
//! (no system dependencies). Downloads tessdata (training data) automatically
//! on first use. Tesseract's TSV report already has the per-word parallel
//! array shape the pipeline consumes.

use super::download::{cache_root, ensure_cached};
use crate::config::PipelineConfig;
use crate::engine::{OcrData, OcrEngine};
use crate::error::VisionError;
use image::GrayImage;
use std::path::PathBuf;
use tesseract_static::tesseract::Tesseract;

/// Tesseract OCR Engine
pub struct TesseractEngine {
    tessdata_path: String,
    language: String,
}

impl TesseractEngine {
    /// Create a new Tesseract-based OCR engine
    pub fn new(config: &PipelineConfig) -> Result<Self, VisionError> {
        let language = config.language.clone();

        let tessdata_path = match &config.tessdata_path {
            Some(path) => path.clone(),
            None => ensure_tessdata_available(&language)?,
        };

        // A throwaway instance validates the traineddata up front
        let check = Tesseract::new(Some(&tessdata_path), Some(&language)).map_err(|e| {
            VisionError::ModelLoad(format!("Failed to initialize Tesseract: {}", e))
        })?;
        drop(check);

        tracing::info!(
            "Tesseract engine initialized (tessdata: {}, language: {})",
            tessdata_path,
            language
        );

        Ok(Self {
            tessdata_path,
            language,
        })
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR engine - per-word boxes and confidences"
    }

    fn extract(&self, image: &GrayImage) -> Result<OcrData, VisionError> {
        let (width, height) = image.dimensions();

        // BMP is always supported by leptonica
        let mut bmp_data = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bmp_data), image::ImageFormat::Bmp)
            .map_err(|e| VisionError::Ocr(format!("Failed to convert to BMP: {}", e)))?;

        tracing::debug!(
            "Running Tesseract on {}x{} image ({} bytes)",
            width,
            height,
            bmp_data.len()
        );

        let tess = Tesseract::new(Some(&self.tessdata_path), Some(&self.language))
            .map_err(|e| VisionError::Ocr(format!("Failed to create Tesseract: {}", e)))?;

        let tess = tess
            .set_image_from_mem(&bmp_data)
            .map_err(|e| VisionError::Ocr(format!("Failed to set image: {}", e)))?;

        let mut tess = tess
            .recognize()
            .map_err(|e| VisionError::Ocr(format!("Failed to recognize text: {}", e)))?;

        let tsv = tess
            .get_tsv_text(0)
            .map_err(|e| VisionError::Ocr(format!("Failed to get TSV report: {}", e)))?;

        OcrData::from_tsv(&tsv)
    }
}

/// Ensure tessdata is available, downloading if needed.
/// Returns the directory, since Tesseract expects the directory rather than the file.
fn ensure_tessdata_available(language: &str) -> Result<String, VisionError> {
    let cache_dir: PathBuf = cache_root().join("tessdata");
    let traineddata_file = format!("{}.traineddata", language);

    ensure_cached(&tessdata_url(language), &cache_dir, &traineddata_file)?;

    cache_dir
        .to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| VisionError::ModelLoad("Invalid tessdata path".to_string()))
}

/// Get tessdata download URL for a language
fn tessdata_url(language: &str) -> String {
    // tessdata_fast: smaller, faster downloads
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}
