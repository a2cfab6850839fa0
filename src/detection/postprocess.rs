//! YOLOv8 pre/post-processing: letterboxing, output decoding and NMS

use super::{BoundingBox, Detection};
use crate::error::VisionError;
use image::{imageops, Rgb, RgbImage};

/// Padding value used by YOLO letterboxing
const PAD_VALUE: u8 = 114;

/// Geometry of a letterboxed input, used to map boxes back to the source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub source_width: u32,
    pub source_height: u32,
}

impl Letterbox {
    /// Map a box from model-input pixels back to source pixels, clipped to the image
    pub fn unmap(&self, bbox: BoundingBox) -> BoundingBox {
        let w = self.source_width as f32;
        let h = self.source_height as f32;
        BoundingBox {
            x1: ((bbox.x1 - self.pad_x) / self.scale).clamp(0.0, w),
            y1: ((bbox.y1 - self.pad_y) / self.scale).clamp(0.0, h),
            x2: ((bbox.x2 - self.pad_x) / self.scale).clamp(0.0, w),
            y2: ((bbox.y2 - self.pad_y) / self.scale).clamp(0.0, h),
        }
    }
}

/// Resize keeping aspect ratio and pad to a `size`×`size` square.
/// A zero size is treated as 1.
pub fn letterbox(image: &RgbImage, size: u32) -> (RgbImage, Letterbox) {
    let size = size.max(1);
    let (width, height) = image.dimensions();
    let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
    let new_width = ((width as f32 * scale).round() as u32).clamp(1, size);
    let new_height = ((height as f32 * scale).round() as u32).clamp(1, size);

    let resized = imageops::resize(image, new_width, new_height, imageops::FilterType::Triangle);

    let pad_x = (size - new_width) / 2;
    let pad_y = (size - new_height) / 2;
    let mut canvas = RgbImage::from_pixel(size, size, Rgb([PAD_VALUE; 3]));
    imageops::overlay(&mut canvas, &resized, pad_x as i64, pad_y as i64);

    (
        canvas,
        Letterbox {
            scale,
            pad_x: pad_x as f32,
            pad_y: pad_y as f32,
            source_width: width,
            source_height: height,
        },
    )
}

/// Decode a `[1, 4 + classes, anchors]` output into candidate detections.
///
/// Each anchor column holds `cx, cy, w, h` followed by one score per class;
/// the best class is kept when its score reaches `confidence_threshold`.
pub fn decode(data: &[f32], shape: &[usize], confidence_threshold: f32) -> Result<Vec<Detection>, VisionError> {
    let (rows, anchors) = match shape {
        [1, rows, anchors] if *rows > 4 => (*rows, *anchors),
        _ => {
            return Err(VisionError::Detection(format!(
                "Unexpected detector output shape {:?}",
                shape
            )))
        }
    };
    if data.len() != rows * anchors {
        return Err(VisionError::Detection(format!(
            "Output has {} values, shape {:?} needs {}",
            data.len(),
            shape,
            rows * anchors
        )));
    }

    let value = |row: usize, anchor: usize| data[row * anchors + anchor];

    let detections = (0..anchors)
        .filter_map(|i| {
            let (class_id, confidence) = (4..rows)
                .map(|row| (row - 4, value(row, i)))
                .fold((0, f32::MIN), |best, candidate| {
                    if candidate.1 > best.1 {
                        candidate
                    } else {
                        best
                    }
                });

            (confidence >= confidence_threshold).then(|| Detection {
                class_id,
                confidence,
                bbox: BoundingBox::from_center(value(0, i), value(1, i), value(2, i), value(3, i)),
            })
        })
        .collect();

    Ok(detections)
}

/// Class-wise non-maximum suppression, highest confidence first
pub fn nms(mut candidates: Vec<Detection>, iou_threshold: f32, max_detections: usize) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold);
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}
