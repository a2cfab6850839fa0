//! Glass object detection
//!
//! A pretrained detector sits behind the `ObjectDetector` trait. The YOLOv8
//! ONNX backend is compiled with the `detector-yolo` feature; box decoding
//! and suppression live in `postprocess` and are backend independent.

pub mod harness;
#[cfg_attr(not(feature = "detector-yolo"), allow(dead_code))]
pub mod postprocess;

#[cfg(feature = "detector-yolo")]
pub mod yolo;

use crate::config::DetectorConfig;
use crate::error::VisionError;
use image::DynamicImage;
use serde::Serialize;
use std::borrow::Cow;
use std::path::Path;

pub use harness::DetectorHarness;

/// Axis-aligned box in source-image pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    #[cfg_attr(not(feature = "detector-yolo"), allow(dead_code))]
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
        }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    #[cfg_attr(not(feature = "detector-yolo"), allow(dead_code))]
    pub fn iou(&self, other: &Self) -> f32 {
        let overlap = Self {
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
            x2: self.x2.min(other.x2),
            y2: self.y2.min(other.y2),
        };
        let intersection = overlap.area();
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// One detected object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Trait that all object detectors must implement
pub trait ObjectDetector: Send + Sync {
    fn name(&self) -> &'static str;

    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, VisionError>;
}

/// Class id to display name table
#[derive(Debug, Clone, PartialEq)]
pub struct ClassNames(Vec<String>);

impl Default for ClassNames {
    fn default() -> Self {
        Self(vec!["glass".to_string()])
    }
}

impl ClassNames {
    /// Parse one name per line. `N: name` lines (as in a dataset yaml) are
    /// accepted; blank lines and `#` comments are skipped.
    pub fn parse(content: &str) -> Self {
        let names = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| match line.split_once(':') {
                Some((index, name)) if index.trim().parse::<usize>().is_ok() => name.trim(),
                _ => line,
            })
            .map(|name| name.trim_matches(|c| c == '\'' || c == '"').to_string())
            .collect();
        Self(names)
    }

    pub fn from_file(path: &Path) -> Result<Self, VisionError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VisionError::ModelLoad(format!("Failed to read class names {:?}: {}", path, e))
        })?;
        Ok(Self::parse(&content))
    }

    pub fn name(&self, class_id: usize) -> Cow<'_, str> {
        match self.0.get(class_id) {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(format!("class_{}", class_id)),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Load the detector backend compiled into this build
pub fn load_detector(config: &DetectorConfig) -> Result<Box<dyn ObjectDetector>, VisionError> {
    if !config.model_path.exists() {
        return Err(VisionError::ModelLoad(format!(
            "Detector weights not found at {:?}",
            config.model_path
        )));
    }

    #[cfg(feature = "detector-yolo")]
    {
        Ok(Box::new(yolo::YoloDetector::new(config)?))
    }

    #[cfg(not(feature = "detector-yolo"))]
    {
        Err(VisionError::ModelLoad(
            "No detector backend available. Build with --features detector-yolo".to_string(),
        ))
    }
}
