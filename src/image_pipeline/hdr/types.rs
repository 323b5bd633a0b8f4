//! HDR encoding types

/// Per-channel extrema of an image's R, G and B values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelExtrema {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl ChannelExtrema {
    /// Largest channel maximum. NaN if any channel maximum is NaN.
    pub fn peak(&self) -> f32 {
        if self.max.iter().any(|v| v.is_nan()) {
            return f32::NAN;
        }
        self.max.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }
}

/// 8-bit RGBA pixels produced by gain map computation.
///
/// Rows are stored bottom-up, the order a GPU readback produces, so the
/// compressor is asked to flip them.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbaRaster {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

/// Compressor input: an RGBA pixel buffer paired with its dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Bitmap {
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl From<RgbaRaster> for Bitmap {
    fn from(raster: RgbaRaster) -> Self {
        Self::new(raster.width, raster.height, raster.data)
    }
}

/// Parameters the gain map was computed with, in linear units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainMapParams {
    pub min_content_boost: f32,
    pub max_content_boost: f32,
    pub gamma: f32,
    pub offset_sdr: f32,
    pub offset_hdr: f32,
}

/// Output of gain map computation.
#[derive(Debug, Clone, PartialEq)]
pub struct GainMapEncoding {
    /// Tone-mapped base image
    pub sdr: RgbaRaster,
    /// Per-pixel log boost needed to recover the HDR image from `sdr`
    pub gain_map: RgbaRaster,
    pub params: GainMapParams,
}

/// Gain map reconstruction parameters as written to `hdrgm` XMP.
///
/// Boost and capacity values are log2 encoded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainMapMetadata {
    pub gain_map_min: [f32; 3],
    pub gain_map_max: [f32; 3],
    pub gamma: [f32; 3],
    pub offset_sdr: [f32; 3],
    pub offset_hdr: [f32; 3],
    pub hdr_capacity_min: f32,
    pub hdr_capacity_max: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
}

impl ImageFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressOptions {
    pub format: ImageFormat,
    /// Quality in `[0, 1]`
    pub quality: f32,
    /// Reverse row order before compressing
    pub flip_y: bool,
}

impl CompressOptions {
    /// Options used for both the SDR and the gain map plane.
    pub const HDR_PLANE: CompressOptions = CompressOptions {
        format: ImageFormat::Jpeg,
        quality: 0.9,
        flip_y: true,
    };
}

/// Final JPEG with an embedded gain map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedHdr(Vec<u8>);

impl EncodedHdr {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for EncodedHdr {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
