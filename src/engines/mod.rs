//! OCR engine implementations
//!
//! This module contains implementations of the OcrEngine trait for different
//! OCR backends. Engines are conditionally compiled based on feature flags.

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

#[cfg(feature = "engine-tesseract")]
pub mod tesseract;

pub mod bounded;

#[cfg(any(feature = "engine-ocrs", feature = "engine-tesseract"))]
mod download;

use crate::config::PipelineConfig;
use crate::engine::OcrEngine;
use crate::error::VisionError;
use std::sync::Arc;

/// Registry of available OCR engines
pub struct EngineRegistry {
    engines: Vec<Arc<dyn OcrEngine>>,
    default_engine: String,
}

impl EngineRegistry {
    /// Create a new engine registry with all available engines initialized
    #[allow(unused_variables)]
    pub fn new(config: &PipelineConfig) -> Result<Self, VisionError> {
        let mut engines: Vec<Arc<dyn OcrEngine>> = Vec::new();

        #[cfg(feature = "engine-ocrs")]
        {
            tracing::info!("Initializing ocrs engine...");
            engines.push(Arc::new(ocrs::OcrsEngine::new()?));
        }

        #[cfg(feature = "engine-tesseract")]
        {
            tracing::info!("Initializing tesseract engine...");
            engines.push(Arc::new(tesseract::TesseractEngine::new(config)?));
        }

        Self::from_engines(engines)
    }

    /// Build a registry from already-initialized engines; the first one is the default
    pub fn from_engines(engines: Vec<Arc<dyn OcrEngine>>) -> Result<Self, VisionError> {
        let default_engine = engines
            .first()
            .map(|e| e.name().to_string())
            .ok_or_else(|| {
                VisionError::ModelLoad(
                    "No OCR engines available. Build with --features engine-ocrs or --features engine-tesseract"
                        .to_string(),
                )
            })?;

        Ok(Self {
            engines,
            default_engine,
        })
    }

    /// Get an engine by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn OcrEngine>> {
        self.engines.iter().find(|e| e.name() == name).cloned()
    }

    /// Get the default engine
    pub fn default(&self) -> Option<Arc<dyn OcrEngine>> {
        self.get(&self.default_engine)
    }

    /// Pick the requested engine, or the default when none is requested
    pub fn select(&self, name: Option<&str>) -> Result<Arc<dyn OcrEngine>, VisionError> {
        match name {
            Some(name) => self.get(name).ok_or_else(|| {
                VisionError::ModelLoad(format!(
                    "Unknown OCR engine '{}'. Available: {}",
                    name,
                    self.list().join(", ")
                ))
            }),
            None => self
                .default()
                .ok_or_else(|| VisionError::ModelLoad("No default OCR engine".to_string())),
        }
    }

    /// List all available engine names
    pub fn list(&self) -> Vec<&str> {
        self.engines.iter().map(|e| e.name()).collect()
    }
}
