//! Decoded raster types

/// Native element type of a decoded raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    U8,
    U16,
    I16,
    I32,
    F32,
    F64,
}

impl ElementKind {
    pub fn is_float(self) -> bool {
        matches!(self, ElementKind::F32 | ElementKind::F64)
    }

    /// Size of one sample in bytes.
    pub fn byte_width(self) -> usize {
        match self {
            ElementKind::U8 => 1,
            ElementKind::U16 | ElementKind::I16 => 2,
            ElementKind::I32 | ElementKind::F32 => 4,
            ElementKind::F64 => 8,
        }
    }
}

/// Flat sample buffer in the raster's native element type.
#[derive(Debug, Clone, PartialEq)]
pub enum RasterSamples {
    U8(Vec<u8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl RasterSamples {
    pub fn kind(&self) -> ElementKind {
        match self {
            RasterSamples::U8(_) => ElementKind::U8,
            RasterSamples::U16(_) => ElementKind::U16,
            RasterSamples::I16(_) => ElementKind::I16,
            RasterSamples::I32(_) => ElementKind::I32,
            RasterSamples::F32(_) => ElementKind::F32,
            RasterSamples::F64(_) => ElementKind::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RasterSamples::U8(v) => v.len(),
            RasterSamples::U16(v) => v.len(),
            RasterSamples::I16(v) => v.len(),
            RasterSamples::I32(v) => v.len(),
            RasterSamples::F32(v) => v.len(),
            RasterSamples::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decoded raster with bands stored band-sequentially (BSQ)
#[derive(Debug, Clone, PartialEq)]
pub struct RawRaster {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
    /// Number of bands (1 = mono, 2 = two-band, 3 = RGB)
    pub depth: usize,
    /// All of band 0, then band 1, then band 2
    pub samples: RasterSamples,
}

impl RawRaster {
    pub fn element_kind(&self) -> ElementKind {
        self.samples.kind()
    }

    /// Number of pixels in one band.
    pub fn stride(&self) -> usize {
        self.width * self.height
    }
}
