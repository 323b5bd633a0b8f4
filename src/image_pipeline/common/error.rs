use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to decode VICAR image: {0}")]
    DecodeError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Malformed raster: {width}x{height} with {depth} band(s) cannot hold {len} samples")]
    MalformedRaster {
        width: usize,
        height: usize,
        depth: usize,
        len: usize,
    },

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Failed to encode TIFF image: {0}")]
    TiffEncodeError(String),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConversionError>;

/// Stage of the HDR encode that produced an [`EncodingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeStage {
    RangeDiscovery,
    GainMap,
    Compression,
    Metadata,
    Embedding,
}

impl fmt::Display for EncodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EncodeStage::RangeDiscovery => "range discovery",
            EncodeStage::GainMap => "gain map computation",
            EncodeStage::Compression => "compression",
            EncodeStage::Metadata => "metadata retrieval",
            EncodeStage::Embedding => "container embedding",
        };
        f.write_str(name)
    }
}

/// A collaborator failure during HDR encoding, tagged with the stage it came from.
#[derive(Error, Debug)]
#[error("HDR encoding failed during {stage}: {source}")]
pub struct EncodingError {
    pub stage: EncodeStage,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl EncodingError {
    pub fn new(stage: EncodeStage, source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }

    pub fn stage(&self) -> EncodeStage {
        self.stage
    }
}
