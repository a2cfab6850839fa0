//! YOLOv8 detector running an exported ONNX model on ONNX Runtime

use super::postprocess::{decode, letterbox, nms};
use super::{Detection, ObjectDetector};
use crate::config::DetectorConfig;
use crate::error::VisionError;
use image::{DynamicImage, RgbImage};
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::TensorRef;
use parking_lot::Mutex;

/// Upper bound on boxes returned per image
const MAX_DETECTIONS: usize = 300;

pub struct YoloDetector {
    /// ONNX Runtime sessions need exclusive access to run
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    input_size: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl YoloDetector {
    pub fn new(config: &DetectorConfig) -> Result<Self, VisionError> {
        tracing::info!("Loading detector weights from {:?}", config.model_path);

        let session = Session::builder()
            .map_err(model_load_error)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(model_load_error)?
            .with_intra_threads(4)
            .map_err(model_load_error)?
            .commit_from_file(&config.model_path)
            .map_err(model_load_error)?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| VisionError::ModelLoad("Model has no inputs".to_string()))?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| VisionError::ModelLoad("Model has no outputs".to_string()))?;

        tracing::info!(
            "Detector loaded. Input: {}, Output: {}, size: {}",
            input_name,
            output_name,
            config.input_size
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            input_size: config.input_size,
            confidence_threshold: config.confidence_threshold,
            iou_threshold: config.iou_threshold,
        })
    }

    /// Run the model and copy its first output out of the session
    fn infer(&self, input: &Array4<f32>) -> Result<(Vec<usize>, Vec<f32>), VisionError> {
        let tensor = TensorRef::from_array_view(input)
            .map_err(|e| VisionError::Detection(format!("Failed to build input tensor: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(|e| VisionError::Detection(format!("Inference failed: {}", e)))?;

        let (shape, data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::Detection(format!("Unexpected output tensor: {}", e)))?;

        let dims = shape.iter().map(|&d| d.max(0) as usize).collect();
        Ok((dims, data.to_vec()))
    }
}

impl ObjectDetector for YoloDetector {
    fn name(&self) -> &'static str {
        "yolov8-onnx"
    }

    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, VisionError> {
        let rgb = image.to_rgb8();
        let (boxed, geometry) = letterbox(&rgb, self.input_size);

        let (shape, data) = self.infer(&to_nchw(&boxed))?;
        let candidates = decode(&data, &shape, self.confidence_threshold)?;
        let kept = nms(candidates, self.iou_threshold, MAX_DETECTIONS);

        tracing::debug!("{} candidate(s) after NMS", kept.len());

        Ok(kept
            .into_iter()
            .map(|d| Detection {
                bbox: geometry.unmap(d.bbox),
                ..d
            })
            .collect())
    }
}

fn model_load_error(e: impl std::fmt::Display) -> VisionError {
    VisionError::ModelLoad(format!("Failed to load ONNX model: {}", e))
}

/// HWC u8 to normalised NCHW f32
fn to_nchw(image: &RgbImage) -> Array4<f32> {
    let (width, height) = image.dimensions();
    let mut input = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

    for (x, y, pixel) in image.enumerate_pixels() {
        for c in 0..3 {
            input[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    input
}
