//! Model and training-data cache shared by the OCR engines

use crate::error::VisionError;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Root cache directory for downloaded models
pub fn cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("glass-watcher")
}

/// Ensure `filename` exists under `dir`, downloading it from `url` if needed
pub fn ensure_cached(url: &str, dir: &Path, filename: &str) -> Result<PathBuf, VisionError> {
    fs::create_dir_all(dir).map_err(|e| {
        VisionError::ModelLoad(format!("Failed to create cache directory {:?}: {}", dir, e))
    })?;

    let path = dir.join(filename);

    if path.exists() {
        tracing::info!("Using cached {} from {:?}", filename, path);
        return Ok(path);
    }

    tracing::info!("Downloading {} (this may take a moment)...", filename);
    download_file(url, &path)?;
    tracing::info!("Downloaded {} to {:?}", filename, path);

    Ok(path)
}

/// Download a file from URL to path using ureq.
/// The body lands in a `.part` file first so an interrupted download is never mistaken for a cached one.
fn download_file(url: &str, path: &Path) -> Result<(), VisionError> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| VisionError::ModelLoad(format!("Failed to download {}: {}", url, e)))?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        VisionError::ModelLoad(format!("Failed to read response body from {}: {}", url, e))
    })?;

    let partial = path.with_extension("part");
    let mut file = File::create(&partial)
        .map_err(|e| VisionError::ModelLoad(format!("Failed to create {:?}: {}", partial, e)))?;

    file.write_all(&buffer)
        .map_err(|e| VisionError::ModelLoad(format!("Failed to write {:?}: {}", partial, e)))?;

    fs::rename(&partial, path)
        .map_err(|e| VisionError::ModelLoad(format!("Failed to move {:?} into place: {}", partial, e)))?;

    Ok(())
}
