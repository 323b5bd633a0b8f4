//! Raster normalization module
//!
//! This module turns decoded rasters of any integer or float element type into a
//! canonical linear RGBA float image.

mod normalizer;
pub mod types;


pub use normalizer::RasterNormalizer;
pub use types::{DivisorPolicy, DynamicRange, NormalizedImage, CHANNELS};
