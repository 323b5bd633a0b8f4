//! Pipeline conversions module
//!
//! This module contains file-level orchestration: decode a raster, normalize
//! it and hand it to the HDR encoder.

mod raster_to_hdr;
pub mod types;


pub use raster_to_hdr::RasterToHdrPipeline;
pub use types::{ConversionConfig, ConversionConfigBuilder};
