//! HDR encoding module
//!
//! This module turns a normalized image into a gain-map JPEG: an SDR base
//! image plus an embedded gain map that lets HDR displays recover the full
//! range.

mod compressor;
mod container;
mod encoder;
mod gainmap;
mod range;
pub mod types;


pub use compressor::{Compressor, JpegCompressor};
pub use container::{ContainerEmbedder, UltraHdrEmbedder};
pub use encoder::{max_content_boost, HdrEncode, HdrEncoder};
pub use gainmap::{GainMapEncoder, ToneMappedGainMapEncoder};
pub use range::{RangeScanner, TextureRangeScanner};
pub use types::{
    Bitmap, ChannelExtrema, CompressOptions, EncodedHdr, GainMapEncoding, GainMapMetadata, GainMapParams,
    ImageFormat, RgbaRaster,
};
