//! The four glass-text stages, in pipeline order

pub mod load;
pub mod denoise;
pub mod threshold;
pub mod annotate;

pub mod grayscale;
