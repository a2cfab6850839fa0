//! Glass-text OCR pipeline
//!
//! Load → denoise → binarize → locate/annotate, with optional inspection
//! images written after every stage.

pub mod artifacts;
pub mod pipeline;
pub mod steps;

pub use pipeline::TextPipeline;
