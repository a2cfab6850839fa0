//! Runs a detector over single images and saves annotated copies for review

use super::{load_detector, ClassNames, Detection, ObjectDetector};
use crate::config::DetectorConfig;
use crate::drawing::{self, LabelFont};
use crate::error::VisionError;
use image::Rgb;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Box colors, cycled by class id
const PALETTE: &[Rgb<u8>] = &[
    Rgb([0, 255, 0]),
    Rgb([255, 56, 56]),
    Rgb([0, 148, 255]),
    Rgb([255, 178, 29]),
    Rgb([207, 0, 255]),
];

const BOX_THICKNESS: u32 = 2;

/// One labelled detection in a harness report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelledDetection {
    pub class_name: String,
    #[serde(flatten)]
    pub detection: Detection,
}

/// Outcome of running the harness on one image
#[derive(Debug, Clone, Serialize)]
pub struct HarnessReport {
    pub image: PathBuf,
    pub annotated_path: PathBuf,
    pub detections: Vec<LabelledDetection>,
}

impl HarnessReport {
    /// Human-readable summary, one entry per output line.
    /// An empty result still reports its count.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.detections.len() + 1);
        lines.push(format!("Found {} detection(s):", self.detections.len()));
        lines.extend(self.detections.iter().map(|d| {
            format!(
                "  - {} (confidence: {:.2})",
                d.class_name, d.detection.confidence
            )
        }));
        lines
    }
}

pub struct DetectorHarness {
    detector: Box<dyn ObjectDetector>,
    names: ClassNames,
    results_dir: PathBuf,
    font: Option<LabelFont>,
}

impl DetectorHarness {
    /// Wrap a detector, creating `results_dir` if needed
    pub fn new(
        detector: Box<dyn ObjectDetector>,
        names: ClassNames,
        results_dir: impl Into<PathBuf>,
        font: Option<LabelFont>,
    ) -> Result<Self, VisionError> {
        let results_dir = results_dir.into();
        std::fs::create_dir_all(&results_dir).map_err(|e| VisionError::Artifact {
            path: results_dir.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            detector,
            names,
            results_dir,
            font,
        })
    }

    pub fn from_config(config: &DetectorConfig) -> Result<Self, VisionError> {
        let detector = load_detector(config)?;
        let names = match &config.names_path {
            Some(path) => ClassNames::from_file(path)?,
            None => ClassNames::default(),
        };
        tracing::info!(
            "Detector {} ready with {} class(es)",
            detector.name(),
            names.len()
        );

        let font = LabelFont::locate(config.font_path.as_deref());
        Self::new(detector, names, &config.results_dir, font)
    }

    /// Detect on one image, save `{stem}_detected.jpg` and print the summary
    pub fn test_single_image(&self, path: &Path) -> Result<HarnessReport, VisionError> {
        let image = image::open(path).map_err(|e| VisionError::image_load(path, e))?;
        let detections = self.detector.detect(&image)?;

        let mut canvas = image.to_rgb8();
        let labelled: Vec<LabelledDetection> = detections
            .into_iter()
            .map(|detection| LabelledDetection {
                class_name: self.names.name(detection.class_id).into_owned(),
                detection,
            })
            .collect();

        for item in &labelled {
            let color = PALETTE[item.detection.class_id % PALETTE.len()];
            let bbox = item.detection.bbox;
            let (x, y) = (bbox.x1.round() as i32, bbox.y1.round() as i32);
            drawing::draw_box(
                &mut canvas,
                x,
                y,
                bbox.width().round() as u32,
                bbox.height().round() as u32,
                color,
                BOX_THICKNESS,
            );
            let label = format!("{} {:.2}", item.class_name, item.detection.confidence);
            drawing::draw_label(&mut canvas, self.font.as_ref(), x, y - 4, color, &label);
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let annotated_path = self.results_dir.join(format!("{}_detected.jpg", stem));
        canvas.save(&annotated_path).map_err(|e| VisionError::Artifact {
            path: annotated_path.clone(),
            reason: e.to_string(),
        })?;

        let report = HarnessReport {
            image: path.to_path_buf(),
            annotated_path,
            detections: labelled,
        };
        println!("Saved annotated image to: {}", report.annotated_path.display());
        for line in report.summary_lines() {
            println!("{}", line);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BoundingBox;
    use image::{DynamicImage, RgbImage};

    struct FixedDetector(Vec<Detection>);

    impl ObjectDetector for FixedDetector {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn detect(&self, _image: &DynamicImage) -> Result<Vec<Detection>, VisionError> {
            Ok(self.0.clone())
        }
    }

    fn glass_at(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32) -> Detection {
        Detection {
            class_id: 0,
            confidence,
            bbox: BoundingBox { x1, y1, x2, y2 },
        }
    }

    fn write_image(dir: &Path) -> PathBuf {
        let path = dir.join("window.png");
        RgbImage::new(64, 48).save(&path).unwrap();
        path
    }

    #[test]
    fn test_new_creates_results_dir() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("nested").join("results");

        DetectorHarness::new(Box::new(FixedDetector(vec![])), ClassNames::default(), &results, None).unwrap();

        assert!(results.is_dir());
    }

    #[test]
    fn test_single_image_writes_annotated_copy() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_image(dir.path());
        let results = dir.path().join("results");
        let harness = DetectorHarness::new(
            Box::new(FixedDetector(vec![glass_at(10.0, 10.0, 30.0, 30.0, 0.874)])),
            ClassNames::default(),
            &results,
            None,
        )
        .unwrap();

        let report = harness.test_single_image(&image).unwrap();

        assert_eq!(report.annotated_path, results.join("window_detected.jpg"));
        assert!(report.annotated_path.exists());
        assert_eq!(
            report.summary_lines(),
            vec![
                "Found 1 detection(s):".to_string(),
                "  - glass (confidence: 0.87)".to_string(),
            ]
        );
    }

    #[test]
    fn test_no_detections_reports_zero_count() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_image(dir.path());
        let harness = DetectorHarness::new(
            Box::new(FixedDetector(vec![])),
            ClassNames::default(),
            dir.path().join("results"),
            None,
        )
        .unwrap();

        let report = harness.test_single_image(&image).unwrap();

        assert_eq!(report.summary_lines(), vec!["Found 0 detection(s):".to_string()]);
        assert!(report.annotated_path.exists());
    }

    #[test]
    fn test_unknown_class_id_gets_placeholder_name() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_image(dir.path());
        let detection = Detection {
            class_id: 4,
            ..glass_at(0.0, 0.0, 8.0, 8.0, 0.5)
        };
        let harness = DetectorHarness::new(
            Box::new(FixedDetector(vec![detection])),
            ClassNames::default(),
            dir.path().join("results"),
            None,
        )
        .unwrap();

        let report = harness.test_single_image(&image).unwrap();

        assert_eq!(report.detections[0].class_name, "class_4");
    }

    #[test]
    fn test_unreadable_image_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let harness = DetectorHarness::new(
            Box::new(FixedDetector(vec![])),
            ClassNames::default(),
            dir.path().join("results"),
            None,
        )
        .unwrap();

        let result = harness.test_single_image(&dir.path().join("missing.jpg"));

        assert!(matches!(result, Err(VisionError::ImageLoad { .. })));
    }
}
