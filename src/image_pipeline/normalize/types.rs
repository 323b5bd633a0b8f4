//! Normalized image types

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::raster::ElementKind;

/// Number of interleaved channels in a [`NormalizedImage`].
pub const CHANNELS: usize = 4;

/// Linear RGBA float image produced from a decoded raster.
///
/// Pixels are interleaved `[R, G, B, A, R, G, B, A, ...]`. Color channels are
/// non-negative and may exceed 1.0 once an exposure boost is applied; alpha is
/// always exactly 1.0. The image cannot be modified after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    width: usize,
    height: usize,
    pixels: Vec<f32>,
}

impl NormalizedImage {
    pub(crate) fn new(width: usize, height: usize, pixels: Vec<f32>) -> Self {
        debug_assert_eq!(pixels.len(), width * height * CHANNELS);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Wraps an existing interleaved RGBA buffer.
    pub fn from_rgba(width: usize, height: usize, pixels: Vec<f32>) -> Result<Self> {
        if pixels.len() != width * height * CHANNELS {
            return Err(ConversionError::MalformedRaster {
                width,
                height,
                depth: CHANNELS,
                len: pixels.len(),
            });
        }
        Ok(Self::new(width, height, pixels))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    /// RGBA value of the pixel at `index` in row-major order.
    pub fn pixel(&self, index: usize) -> Option<[f32; 4]> {
        let start = index.checked_mul(CHANNELS)?;
        let px = self.pixels.get(start..start + CHANNELS)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn into_pixels(self) -> Vec<f32> {
        self.pixels
    }

    /// Copy of this image with R, G and B multiplied by `factor`. Alpha is kept.
    pub fn boosted(&self, factor: f32) -> Self {
        let pixels = self
            .pixels
            .chunks_exact(CHANNELS)
            .flat_map(|px| [px[0] * factor, px[1] * factor, px[2] * factor, px[3]])
            .collect();
        Self::new(self.width, self.height, pixels)
    }
}

/// How the normalizing divisor is derived from a raster's element type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DivisorPolicy {
    /// Divide by a constant, the element's full-scale value.
    Fixed(f64),
    /// Divide by the smallest power of two that bounds the observed maximum.
    PowerOfTwoCeiling,
    /// Divide by the observed maximum.
    PassThrough,
}

impl DivisorPolicy {
    pub fn for_kind(kind: ElementKind) -> Self {
        match kind {
            ElementKind::F32 | ElementKind::F64 => DivisorPolicy::PassThrough,
            ElementKind::U8 => DivisorPolicy::Fixed(u8::MAX as f64),
            ElementKind::U16 | ElementKind::I16 | ElementKind::I32 => DivisorPolicy::PowerOfTwoCeiling,
        }
    }

    /// Divisor for a raster whose largest positive sample is `raw_max`.
    pub fn divisor(self, raw_max: f64) -> f64 {
        match self {
            DivisorPolicy::Fixed(value) => value,
            DivisorPolicy::PassThrough => raw_max,
            DivisorPolicy::PowerOfTwoCeiling => {
                // Sub-unity maxima would give negative bit counts.
                let useful_bits = raw_max.log2().ceil().max(0.0);
                2f64.powf(useful_bits)
            }
        }
    }
}

/// Result of the dynamic-range scan over a raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicRange {
    /// Largest strictly positive sample in the color bands, if any.
    pub raw_max: Option<f64>,
    pub policy: DivisorPolicy,
    pub divisor: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgba_checks_length() {
        assert!(NormalizedImage::from_rgba(2, 1, vec![0.0; 8]).is_ok());
        let result = NormalizedImage::from_rgba(2, 1, vec![0.0; 7]);
        assert!(matches!(result, Err(ConversionError::MalformedRaster { len: 7, .. })));
    }

    #[test]
    fn boost_scales_color_but_not_alpha() {
        let image = NormalizedImage::from_rgba(1, 1, vec![0.25, 0.5, 1.0, 1.0]).unwrap();
        let boosted = image.boosted(4.0);
        assert_eq!(boosted.pixels(), &[1.0, 2.0, 4.0, 1.0]);
        assert_eq!(image.pixels(), &[0.25, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn power_of_two_ceiling() {
        let policy = DivisorPolicy::PowerOfTwoCeiling;
        assert_eq!(policy.divisor(1000.0), 1024.0);
        assert_eq!(policy.divisor(1024.0), 1024.0);
        assert_eq!(policy.divisor(4095.0), 4096.0);
        assert_eq!(policy.divisor(1.0), 1.0);
        assert_eq!(policy.divisor(0.5), 1.0);
    }

    #[test]
    fn policy_by_element_kind() {
        assert_eq!(DivisorPolicy::for_kind(ElementKind::U8), DivisorPolicy::Fixed(255.0));
        assert_eq!(DivisorPolicy::for_kind(ElementKind::I16), DivisorPolicy::PowerOfTwoCeiling);
        assert_eq!(DivisorPolicy::for_kind(ElementKind::F64), DivisorPolicy::PassThrough);
        assert_eq!(DivisorPolicy::PassThrough.divisor(3.5), 3.5);
    }
}
