use crate::config::PipelineConfig;
use crate::drawing::LabelFont;
use crate::engine::OcrEngine;
use crate::engines::bounded::BoundedEngine;
use crate::error::{Stage, StageFailure, VisionError};
use image::RgbImage;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use super::artifacts::{self, ArtifactWriter};
use super::steps;
use super::steps::annotate::TextDetection;

/// Timing information for a single pipeline stage
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of one image's run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub image: PathBuf,
    /// Annotated canvas (not serialized)
    #[serde(skip)]
    pub annotated: RgbImage,
    pub detections: Vec<TextDetection>,
    pub total_time_ms: u64,
    pub steps: Vec<StepTiming>,
}

/// Glass-text pipeline: load → denoise → binarize → locate/annotate
pub struct TextPipeline {
    engine: Arc<dyn OcrEngine>,
    config: PipelineConfig,
    font: Option<LabelFont>,
}

impl TextPipeline {
    pub fn new(engine: Arc<dyn OcrEngine>, config: PipelineConfig) -> Self {
        let engine: Arc<dyn OcrEngine> = match config.ocr_timeout {
            Some(timeout) => Arc::new(BoundedEngine::new(engine, timeout)),
            None => engine,
        };
        let font = LabelFont::locate(config.font_path.as_deref());

        Self {
            engine,
            config,
            font,
        }
    }

    /// Process one image, writing artifacts straight into the output directory
    pub fn run(&self, path: &Path) -> Result<PipelineReport, StageFailure> {
        let writer = self.writer_for(&self.config.output_dir);
        self.run_with(path, &writer)
    }

    /// Process images independently; one failure never stops the rest.
    /// With several inputs each image gets its own `output/<stem>/` directory.
    pub fn run_batch(&self, paths: &[PathBuf]) -> Vec<Result<PipelineReport, StageFailure>> {
        let dirs = if paths.len() > 1 {
            batch_dir_names(paths)
                .into_iter()
                .map(|name| self.config.output_dir.join(name))
                .collect()
        } else {
            vec![self.config.output_dir.clone(); paths.len()]
        };

        paths
            .iter()
            .zip(&dirs)
            .map(|(path, dir)| {
                let result = self.run_with(path, &self.writer_for(dir));

                if let Err(failure) = &result {
                    tracing::error!("{}", failure);
                }
                result
            })
            .collect()
    }

    fn writer_for(&self, dir: &Path) -> ArtifactWriter {
        if self.config.save_artifacts {
            ArtifactWriter::new(dir)
        } else {
            ArtifactWriter::disabled()
        }
    }

    fn run_with(&self, path: &Path, writer: &ArtifactWriter) -> Result<PipelineReport, StageFailure> {
        let start = Instant::now();
        let mut timings = Vec::new();

        tracing::info!("Processing {:?} with {}", path, self.engine.name());

        let loaded = self.run_step(Stage::Load, path, &mut timings, || steps::load::apply(path))?;
        let (width, height) = loaded.color.dimensions();
        tracing::debug!("Loaded {}x{} image", width, height);
        writer.save_gray(artifacts::GRAY_IMAGE, &loaded.gray);

        let blurred = self.run_step(Stage::Denoise, path, &mut timings, || {
            Ok(steps::denoise::apply(&loaded.gray, self.config.blur_kernel_size))
        })?;
        writer.save_gray(artifacts::LIGHT_BLUR, &blurred);

        let binary = self.run_step(Stage::Binarize, path, &mut timings, || {
            Ok(steps::threshold::apply(&blurred))
        })?;
        writer.save_gray(artifacts::THRESHOLD_IMAGE, &binary);

        let annotation = self.run_step(Stage::Annotate, path, &mut timings, || {
            steps::annotate::locate_and_annotate(
                self.engine.as_ref(),
                &binary,
                &loaded.gray,
                self.font.as_ref(),
            )
        })?;
        writer.save_rgb(artifacts::TEXT_BOXES, &annotation.canvas);

        tracing::debug!("{:?} detections: {:?}", path, annotation.pairs());

        let total_time_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "{:?}: {} text region(s) in {}ms",
            path,
            annotation.detections.len(),
            total_time_ms
        );

        Ok(PipelineReport {
            image: path.to_path_buf(),
            annotated: annotation.canvas,
            detections: annotation.detections,
            total_time_ms,
            steps: timings,
        })
    }

    fn run_step<T, F>(
        &self,
        stage: Stage,
        image: &Path,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<T, StageFailure>
    where
        F: FnOnce() -> Result<T, VisionError>,
    {
        let step_start = Instant::now();
        let result = step_fn().map_err(|source| StageFailure {
            image: image.to_path_buf(),
            stage,
            source,
        })?;
        timings.push(StepTiming {
            name: stage.to_string(),
            time_ms: step_start.elapsed().as_millis() as u64,
        });
        Ok(result)
    }
}

/// One directory name per input: the file stem, or `<stem>_<n>` (1-based
/// input position) when several inputs share a stem
fn batch_dir_names(paths: &[PathBuf]) -> Vec<String> {
    let stems: Vec<String> = paths
        .iter()
        .map(|path| {
            path.file_stem()
                .unwrap_or(path.as_os_str())
                .to_string_lossy()
                .into_owned()
        })
        .collect();

    stems
        .iter()
        .enumerate()
        .map(|(i, stem)| {
            if stems.iter().filter(|other| *other == stem).count() > 1 {
                format!("{}_{}", stem, i + 1)
            } else {
                stem.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::OcrData;
    use image::{GrayImage, Luma, Rgb};
    use std::time::Duration;

    /// Returns a fixed set of detections regardless of input
    struct ScriptedEngine(OcrData);

    impl OcrEngine for ScriptedEngine {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn description(&self) -> &'static str {
            "replays fixed detections"
        }

        fn extract(&self, image: &GrayImage) -> Result<OcrData, VisionError> {
            assert!(
                image.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255),
                "engine must receive the binary image"
            );
            Ok(self.0.clone())
        }
    }

    struct BrokenEngine;

    impl OcrEngine for BrokenEngine {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn description(&self) -> &'static str {
            "always faults"
        }

        fn extract(&self, _image: &GrayImage) -> Result<OcrData, VisionError> {
            Err(VisionError::Ocr("internal engine fault".to_string()))
        }
    }

    fn config(dir: &Path) -> PipelineConfig {
        PipelineConfig {
            output_dir: dir.to_path_buf(),
            ocr_timeout: Some(Duration::from_secs(10)),
            font_path: Some(PathBuf::from("/nonexistent/font.ttf")),
            ..PipelineConfig::default()
        }
    }

    /// Light glass with a dark "EXIT" block at (10,10,40,15)
    fn write_exit_sign(dir: &Path) -> PathBuf {
        let mut img = GrayImage::from_pixel(120, 60, Luma([225]));
        for y in 12..23 {
            for x in 12..48 {
                if (x / 3) % 2 == 0 {
                    img.put_pixel(x, y, Luma([30]));
                }
            }
        }
        let path = dir.join("exit_sign.png");
        img.save(&path).unwrap();
        path
    }

    fn exit_detection() -> OcrData {
        let mut data = OcrData::default();
        data.push("", -1, 0, 0, 120, 60);
        data.push("EXIT", 92, 10, 10, 40, 15);
        data
    }

    #[test]
    fn test_end_to_end_exit_sign() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_exit_sign(dir.path());
        let out = dir.path().join("output");

        let pipeline = TextPipeline::new(Arc::new(ScriptedEngine(exit_detection())), config(&out));
        let report = pipeline.run(&image).unwrap();

        let pairs: Vec<(&str, u8)> = report
            .detections
            .iter()
            .map(|d| (d.text.as_str(), d.confidence))
            .collect();
        assert_eq!(pairs, vec![("EXIT", 92)]);

        let green = Rgb([0, 255, 0]);
        assert_eq!(*report.annotated.get_pixel(10, 10), green);
        assert_eq!(*report.annotated.get_pixel(30, 10), green);
        assert_eq!(*report.annotated.get_pixel(49, 24), green);
        assert_eq!(report.annotated.dimensions(), (120, 60));

        for name in [
            artifacts::GRAY_IMAGE,
            artifacts::LIGHT_BLUR,
            artifacts::THRESHOLD_IMAGE,
            artifacts::TEXT_BOXES,
        ] {
            assert!(out.join(name).exists(), "missing {}", name);
        }

        let stages: Vec<&str> = report.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(stages, vec!["load", "denoise", "binarize", "annotate"]);
    }

    #[test]
    fn test_missing_image_fails_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = TextPipeline::new(Arc::new(ScriptedEngine(OcrData::default())), config(dir.path()));

        let failure = pipeline.run(&dir.path().join("nope.png")).unwrap_err();

        assert_eq!(failure.stage, Stage::Load);
        assert!(matches!(failure.source, VisionError::ImageLoad { .. }));
        assert!(!dir.path().join(artifacts::GRAY_IMAGE).exists());
    }

    #[test]
    fn test_ocr_fault_keeps_earlier_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_exit_sign(dir.path());
        let out = dir.path().join("output");

        let pipeline = TextPipeline::new(Arc::new(BrokenEngine), config(&out));
        let failure = pipeline.run(&image).unwrap_err();

        assert_eq!(failure.stage, Stage::Annotate);
        assert!(matches!(failure.source, VisionError::Ocr(_)));
        assert_eq!(failure.image, image);
        assert!(out.join(artifacts::THRESHOLD_IMAGE).exists());
        assert!(!out.join(artifacts::TEXT_BOXES).exists());
    }

    #[test]
    fn test_batch_survives_bad_image() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_exit_sign(dir.path());
        let bad = dir.path().join("corrupt.png");
        std::fs::write(&bad, b"not an image").unwrap();
        let out = dir.path().join("output");

        let pipeline = TextPipeline::new(Arc::new(ScriptedEngine(exit_detection())), config(&out));
        let results = pipeline.run_batch(&[bad, good]);

        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        let report = results[1].as_ref().unwrap();
        assert_eq!(report.detections.len(), 1);
        assert!(out.join("exit_sign").join(artifacts::TEXT_BOXES).exists());
    }

    #[test]
    fn test_batch_dir_names_disambiguate_shared_stems() {
        let names = batch_dir_names(&[
            PathBuf::from("a/door.png"),
            PathBuf::from("window.png"),
            PathBuf::from("b/door.jpg"),
        ]);
        assert_eq!(names, vec!["door_1", "window", "door_3"]);
    }

    #[test]
    fn test_batch_same_stem_keeps_both_artifact_sets() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a");
        let second = dir.path().join("b");
        std::fs::create_dir_all(&first).unwrap();
        std::fs::create_dir_all(&second).unwrap();
        let images = [write_exit_sign(&first), write_exit_sign(&second)];
        let out = dir.path().join("output");

        let pipeline = TextPipeline::new(Arc::new(ScriptedEngine(exit_detection())), config(&out));
        let results = pipeline.run_batch(&images);

        assert!(results.iter().all(|r| r.is_ok()));
        assert!(out.join("exit_sign_1").join(artifacts::TEXT_BOXES).exists());
        assert!(out.join("exit_sign_2").join(artifacts::TEXT_BOXES).exists());
        assert!(!out.join("exit_sign").exists());
    }

    #[test]
    fn test_artifacts_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_exit_sign(dir.path());
        let out = dir.path().join("output");

        let pipeline = TextPipeline::new(
            Arc::new(ScriptedEngine(exit_detection())),
            PipelineConfig {
                save_artifacts: false,
                ..config(&out)
            },
        );
        pipeline.run(&image).unwrap();

        assert!(!out.exists());
    }

    #[test]
    fn test_report_serializes_without_canvas() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_exit_sign(dir.path());

        let pipeline = TextPipeline::new(
            Arc::new(ScriptedEngine(exit_detection())),
            config(&dir.path().join("output")),
        );
        let report = pipeline.run(&image).unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert!(json.get("annotated").is_none());
        assert_eq!(json["detections"][0]["text"], "EXIT");
        assert_eq!(json["detections"][0]["box"]["width"], 40);
    }
}
