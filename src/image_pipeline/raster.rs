//! Raster reading module
//!
//! This module decodes scientific raster files (VICAR, optionally behind a PDS3
//! label) into band-sequential sample buffers.

mod reader;
mod vicar_reader;
pub mod label;
pub mod types;

pub use reader::RasterReader;
pub use vicar_reader::VicarReader;
pub use types::{ElementKind, RasterSamples, RawRaster};
