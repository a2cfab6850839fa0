use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Failed to load image {}: {reason}", path.display())]
    ImageLoad { path: PathBuf, reason: String },

    #[error("OCR engine failed: {0}")]
    Ocr(String),

    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Object detection failed: {0}")]
    Detection(String),

    #[error("Failed to write {}: {reason}", path.display())]
    Artifact { path: PathBuf, reason: String },
}

impl VisionError {
    pub fn image_load(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Self::ImageLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Pipeline stage names, used to tag failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Denoise,
    Binarize,
    Annotate,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Denoise => "denoise",
            Self::Binarize => "binarize",
            Self::Annotate => "annotate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage-local failure for one image. Fatal to that image's run only.
#[derive(Error, Debug)]
#[error("{stage} stage failed for {}: {source}", image.display())]
pub struct StageFailure {
    pub image: PathBuf,
    pub stage: Stage,
    #[source]
    pub source: VisionError,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for VisionError {
    fn into_response(self) -> Response {
        let status = match &self {
            VisionError::ImageLoad { .. } => StatusCode::BAD_REQUEST,
            VisionError::Ocr(_)
            | VisionError::ModelLoad(_)
            | VisionError::Detection(_)
            | VisionError::Artifact { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}
