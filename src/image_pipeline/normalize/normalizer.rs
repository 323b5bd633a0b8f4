use tracing::{debug, warn};

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::normalize::types::{CHANNELS, DivisorPolicy, DynamicRange, NormalizedImage};
use crate::image_pipeline::raster::{RasterSamples, RawRaster};

/// Bands mapped to color channels: R, G, B.
const COLOR_BANDS: usize = 3;

/// Converts band-sequential rasters of any element type into [`NormalizedImage`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterNormalizer;

impl RasterNormalizer {
    /// Normalizes `raster` into linear RGBA.
    ///
    /// Samples are divided by a divisor chosen from the element type (see
    /// [`DivisorPolicy`]). One band is replicated to gray, two bands fill R and G
    /// with B left at zero, three bands map to R, G, B. A raster without any
    /// positive sample normalizes with a divisor derived from 1.
    pub fn normalize(&self, raster: &RawRaster) -> Result<NormalizedImage> {
        validate_shape(raster)?;

        let range = self.dynamic_range(raster)?;
        let stride = raster.stride();
        let depth = raster.depth;
        let divisor = range.divisor;

        let pixels = match &raster.samples {
            RasterSamples::U8(v) => fill_pixels(v, stride, depth, divisor),
            RasterSamples::U16(v) => fill_pixels(v, stride, depth, divisor),
            RasterSamples::I16(v) => fill_pixels(v, stride, depth, divisor),
            RasterSamples::I32(v) => fill_pixels(v, stride, depth, divisor),
            RasterSamples::F32(v) => fill_pixels(v, stride, depth, divisor),
            RasterSamples::F64(v) => fill_pixels(v, stride, depth, divisor),
        };

        Ok(NormalizedImage::new(raster.width, raster.height, pixels))
    }

    /// Scans the color bands for the largest positive sample and derives the divisor.
    pub fn dynamic_range(&self, raster: &RawRaster) -> Result<DynamicRange> {
        validate_shape(raster)?;

        let color_samples = raster.stride() * raster.depth.min(COLOR_BANDS);
        let raw_max = match &raster.samples {
            RasterSamples::U8(v) => positive_max(&v[..color_samples]),
            RasterSamples::U16(v) => positive_max(&v[..color_samples]),
            RasterSamples::I16(v) => positive_max(&v[..color_samples]),
            RasterSamples::I32(v) => positive_max(&v[..color_samples]),
            RasterSamples::F32(v) => positive_max(&v[..color_samples]),
            RasterSamples::F64(v) => positive_max(&v[..color_samples]),
        };

        if raw_max.is_none() {
            warn!(
                "Raster {}x{} has no positive samples, normalizing as all black",
                raster.width, raster.height
            );
        }

        let policy = DivisorPolicy::for_kind(raster.element_kind());
        let divisor = policy.divisor(raw_max.unwrap_or(1.0));

        debug!(
            "Dynamic range: kind={:?}, raw_max={:?}, policy={:?}, divisor={}",
            raster.element_kind(),
            raw_max,
            policy,
            divisor
        );

        Ok(DynamicRange {
            raw_max,
            policy,
            divisor,
        })
    }
}

fn validate_shape(raster: &RawRaster) -> Result<()> {
    let malformed = || ConversionError::MalformedRaster {
        width: raster.width,
        height: raster.height,
        depth: raster.depth,
        len: raster.samples.len(),
    };

    if raster.width == 0 || raster.height == 0 || !(1..=COLOR_BANDS).contains(&raster.depth) {
        return Err(malformed());
    }
    let expected = raster
        .width
        .checked_mul(raster.height)
        .and_then(|stride| stride.checked_mul(raster.depth))
        .ok_or_else(malformed)?;
    if raster.samples.len() != expected {
        return Err(malformed());
    }
    Ok(())
}

/// Largest strictly positive sample. Zero padding, negative fill values and NaN
/// are skipped so they cannot pull the ceiling down.
fn positive_max<T: Copy + Into<f64>>(samples: &[T]) -> Option<f64> {
    samples
        .iter()
        .map(|&s| Into::<f64>::into(s))
        .filter(|v| *v > 0.0)
        .fold(None, |max: Option<f64>, v| Some(max.map_or(v, |m| m.max(v))))
}

fn fill_pixels<T: Copy + Into<f64>>(samples: &[T], stride: usize, depth: usize, divisor: f64) -> Vec<f32> {
    // f32::max maps NaN to 0 along with negatives
    let scale = |s: T| ((Into::<f64>::into(s) / divisor) as f32).max(0.0);
    let (band0, rest) = samples.split_at(stride);
    let (band1, band2) = rest.split_at(stride.min(rest.len()));

    let mut pixels = Vec::with_capacity(stride * CHANNELS);
    match depth {
        1 => {
            for &s in band0 {
                let v = scale(s);
                pixels.extend_from_slice(&[v, v, v, 1.0]);
            }
        }
        2 => {
            for (&r, &g) in band0.iter().zip(band1) {
                pixels.extend_from_slice(&[scale(r), scale(g), 0.0, 1.0]);
            }
        }
        _ => {
            for ((&r, &g), &b) in band0.iter().zip(band1).zip(band2) {
                pixels.extend_from_slice(&[scale(r), scale(g), scale(b), 1.0]);
            }
        }
    }
    pixels
}
