//! Image processing pipeline module
//!
//! This module provides a structured approach to turning planetary science
//! rasters into HDR images, with separate modules for raster reading,
//! normalization, HDR encoding, TIFF export and conversion orchestration.

pub mod raster;
pub mod normalize;
pub mod hdr;
pub mod tiff;
pub mod conversions;
pub mod common;

pub use common::{
    ConversionError,
    EncodeStage,
    EncodingError,
    Result,
};

pub use raster::{
    RawRaster,
    RasterReader,
    VicarReader,
};

pub use normalize::{
    NormalizedImage,
    RasterNormalizer,
};

pub use hdr::{
    EncodedHdr,
    HdrEncode,
    HdrEncoder,
};

pub use tiff::{
    TiffCompression,
    LinearTiffWriter,
    StandardTiffWriter,
};

pub use conversions::{
    ConversionConfig,
    ConversionConfigBuilder,
    RasterToHdrPipeline,
};
