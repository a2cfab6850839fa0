use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod detection;
mod drawing;
mod engine;
mod engines;
mod error;
mod preprocessing;
mod server;

use detection::DetectorHarness;
use engines::EngineRegistry;
use preprocessing::TextPipeline;

#[derive(Parser, Debug)]
#[command(name = "glass-watcher")]
#[command(about = "Read text on glass surfaces and evaluate glass detectors")]
#[command(version)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API
    Serve(ServeArgs),
    /// Run the glass-text pipeline over one or more images
    Ocr(OcrArgs),
    /// Run a pretrained glass detector over one or more images
    Detect(DetectArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Host address to bind to
    #[arg(long, env = "GLASS_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "GLASS_PORT", default_value = "5000")]
    pub port: u16,

    /// Maximum request body size in bytes (default: 16MB)
    #[arg(long, env = "GLASS_MAX_BODY_SIZE", default_value = "16777216")]
    pub max_body_size: usize,
}

#[derive(Args, Debug)]
pub struct OcrArgs {
    /// Images to process
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Directory for the per-stage inspection images
    #[arg(long, env = "GLASS_OUTPUT_DIR", default_value = "output")]
    pub output_dir: PathBuf,

    /// Skip writing inspection images
    #[arg(long)]
    pub no_artifacts: bool,

    /// Gaussian kernel size for the denoiser (odd)
    #[arg(long, default_value = "3", value_parser = config::parse_kernel_size)]
    pub blur_kernel_size: u32,

    /// Give up on a single OCR call after this many seconds (0 disables)
    #[arg(long, env = "GLASS_OCR_TIMEOUT", default_value = "30")]
    pub ocr_timeout_secs: u64,

    /// OCR engine to use (defaults to the first one compiled in)
    #[arg(long, env = "GLASS_ENGINE")]
    pub engine: Option<String>,

    /// Recognition language for engines that support it (e.g., "eng", "deu")
    #[arg(long, env = "GLASS_LANGUAGE", default_value = "eng")]
    pub language: String,

    /// Path to tessdata directory (uses TESSDATA_PREFIX env var if not set)
    #[arg(long, env = "TESSDATA_PREFIX")]
    pub tessdata_path: Option<String>,

    /// TrueType font for box labels
    #[arg(long, env = "GLASS_FONT")]
    pub font: Option<PathBuf>,

    /// Print detections as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Images to run the detector on
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Exported detector weights (ONNX)
    #[arg(long, env = "GLASS_MODEL", default_value = "best.onnx")]
    pub model: PathBuf,

    /// Newline-delimited class names
    #[arg(long, env = "GLASS_NAMES")]
    pub names: Option<PathBuf>,

    /// Directory for annotated copies
    #[arg(long, env = "GLASS_RESULTS_DIR", default_value = "results")]
    pub results_dir: PathBuf,

    /// Minimum class score to keep a box
    #[arg(long, default_value = "0.25", value_parser = config::parse_unit_interval)]
    pub confidence: f32,

    /// IoU above which overlapping boxes of one class are suppressed
    #[arg(long, default_value = "0.7", value_parser = config::parse_unit_interval)]
    pub iou: f32,

    /// Square model input size in pixels
    #[arg(long, default_value = "640", value_parser = config::parse_input_size)]
    pub input_size: u32,

    /// TrueType font for box labels
    #[arg(long, env = "GLASS_FONT")]
    pub font: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("glass-watcher v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Serve(args) => {
            let config = config::ServerConfig::from(args);
            tracing::info!("Binding to {}:{}", config.host, config.port);
            server::run(config).await
        }
        Command::Ocr(args) => tokio::task::spawn_blocking(move || run_ocr(args)).await?,
        Command::Detect(args) => tokio::task::spawn_blocking(move || run_detect(args)).await?,
    }
}

fn run_ocr(args: OcrArgs) -> anyhow::Result<()> {
    let images = args.images.clone();
    let json = args.json;
    let config = config::PipelineConfig::from(args);

    let registry = EngineRegistry::new(&config)?;
    tracing::info!("Available OCR engines: {:?}", registry.list());
    let engine = registry.select(config.engine.as_deref())?;
    tracing::info!("Using {} ({})", engine.name(), engine.description());

    let pipeline = TextPipeline::new(engine, config);
    let results = pipeline.run_batch(&images);

    let reports: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    let failed = results.len() - reports.len();

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!("{}:", report.image.display());
            for detection in &report.detections {
                println!("  {:?} ({}%)", detection.text, detection.confidence);
            }
        }
    }

    tracing::info!("{} image(s) processed, {} failed", reports.len(), failed);
    if failed > 0 {
        anyhow::bail!("{} of {} image(s) failed", failed, results.len());
    }
    Ok(())
}

fn run_detect(args: DetectArgs) -> anyhow::Result<()> {
    let images = args.images.clone();
    let harness = DetectorHarness::from_config(&config::DetectorConfig::from(args))?;

    let mut failed = 0;
    for image in &images {
        println!("Testing {}", image.display());
        if let Err(e) = harness.test_single_image(image) {
            tracing::error!("{}: {}", image.display(), e);
            failed += 1;
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} image(s) failed", failed, images.len());
    }
    Ok(())
}
