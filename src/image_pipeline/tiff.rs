//! TIFF writing module
//!
//! Lossless export of normalized images as 32-bit float RGB TIFF, for
//! inspecting the linear data behind an HDR encode.

mod writer;
mod standard_tiff_writer;
pub mod types;

pub use writer::LinearTiffWriter;
pub use standard_tiff_writer::StandardTiffWriter;
pub use types::TiffCompression;
