use crate::{DetectArgs, OcrArgs, ServeArgs};
use std::path::PathBuf;
use std::time::Duration;

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_size: usize,
}

impl From<ServeArgs> for ServerConfig {
    fn from(args: ServeArgs) -> Self {
        Self {
            host: args.host,
            port: args.port,
            max_body_size: args.max_body_size,
        }
    }
}

/// Glass-text OCR pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory that receives the per-stage inspection images
    pub output_dir: PathBuf,
    pub save_artifacts: bool,
    /// Odd Gaussian kernel size for the denoiser
    pub blur_kernel_size: u32,
    /// Upper bound on a single OCR engine call; `None` waits forever
    pub ocr_timeout: Option<Duration>,
    /// Engine to use; the registry default when unset
    pub engine: Option<String>,
    pub language: String,
    pub tessdata_path: Option<String>,
    pub font_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            save_artifacts: true,
            blur_kernel_size: 3,
            ocr_timeout: Some(Duration::from_secs(30)),
            engine: None,
            language: "eng".to_string(),
            tessdata_path: None,
            font_path: None,
        }
    }
}

impl From<OcrArgs> for PipelineConfig {
    fn from(args: OcrArgs) -> Self {
        Self {
            output_dir: args.output_dir,
            save_artifacts: !args.no_artifacts,
            blur_kernel_size: args.blur_kernel_size,
            ocr_timeout: (args.ocr_timeout_secs > 0)
                .then(|| Duration::from_secs(args.ocr_timeout_secs)),
            engine: args.engine,
            language: args.language,
            tessdata_path: args.tessdata_path,
            font_path: args.font,
        }
    }
}

/// Detector test harness configuration
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub model_path: PathBuf,
    /// Newline-delimited class names; a single `glass` class when unset
    pub names_path: Option<PathBuf>,
    pub results_dir: PathBuf,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub input_size: u32,
    pub font_path: Option<PathBuf>,
}

impl From<DetectArgs> for DetectorConfig {
    fn from(args: DetectArgs) -> Self {
        Self {
            model_path: args.model,
            names_path: args.names,
            results_dir: args.results_dir,
            confidence_threshold: args.confidence,
            iou_threshold: args.iou,
            input_size: args.input_size,
            font_path: args.font,
        }
    }
}

/// Parse a Gaussian kernel size, accepting odd values only
pub fn parse_kernel_size(s: &str) -> Result<u32, String> {
    let size: u32 = s
        .parse()
        .map_err(|e| format!("invalid kernel size '{}': {}", s, e))?;
    if size == 0 || size % 2 == 0 {
        return Err(format!("kernel size must be odd and positive, got {}", size));
    }
    Ok(size)
}

/// Parse a score or IoU threshold in `[0, 1]`
pub fn parse_unit_interval(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|e| format!("invalid threshold '{}': {}", s, e))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("threshold must be between 0 and 1, got {}", s));
    }
    Ok(value)
}

/// Parse the square detector input size, which must be positive
pub fn parse_input_size(s: &str) -> Result<u32, String> {
    let size: u32 = s
        .parse()
        .map_err(|e| format!("invalid input size '{}': {}", s, e))?;
    if size == 0 {
        return Err("input size must be positive".to_string());
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kernel_size_accepts_odd() {
        assert_eq!(parse_kernel_size("3"), Ok(3));
        assert_eq!(parse_kernel_size("5"), Ok(5));
    }

    #[test]
    fn test_parse_kernel_size_rejects_even_and_zero() {
        assert!(parse_kernel_size("4").is_err());
        assert!(parse_kernel_size("0").is_err());
        assert!(parse_kernel_size("abc").is_err());
    }

    #[test]
    fn test_parse_unit_interval_bounds() {
        assert_eq!(parse_unit_interval("0"), Ok(0.0));
        assert_eq!(parse_unit_interval("0.25"), Ok(0.25));
        assert_eq!(parse_unit_interval("1"), Ok(1.0));
        assert!(parse_unit_interval("-0.1").is_err());
        assert!(parse_unit_interval("1.5").is_err());
        assert!(parse_unit_interval("NaN").is_err());
        assert!(parse_unit_interval("high").is_err());
    }

    #[test]
    fn test_parse_input_size_rejects_zero() {
        assert_eq!(parse_input_size("640"), Ok(640));
        assert!(parse_input_size("0").is_err());
        assert!(parse_input_size("-32").is_err());
    }

    #[test]
    fn test_default_pipeline_favors_small_kernel() {
        let config = PipelineConfig::default();
        assert_eq!(config.blur_kernel_size, 3);
        assert_eq!(config.output_dir, PathBuf::from("output"));
    }
}
