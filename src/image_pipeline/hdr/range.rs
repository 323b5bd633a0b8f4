use anyhow::Result;

use crate::image_pipeline::hdr::types::ChannelExtrema;
use crate::image_pipeline::normalize::{NormalizedImage, CHANNELS};

pub trait RangeScanner {
    fn scan(&self, image: &NormalizedImage) -> Result<ChannelExtrema>;
}

/// Scans every pixel for per-channel minimum and maximum.
pub struct TextureRangeScanner;

impl RangeScanner for TextureRangeScanner {
    fn scan(&self, image: &NormalizedImage) -> Result<ChannelExtrema> {
        if image.pixels().is_empty() {
            return Ok(ChannelExtrema {
                min: [0.0; 3],
                max: [0.0; 3],
            });
        }

        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        for px in image.pixels().chunks_exact(CHANNELS) {
            for c in 0..3 {
                min[c] = min[c].min(px[c]);
                max[c] = max[c].max(px[c]);
            }
        }

        Ok(ChannelExtrema { min, max })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_each_channel() {
        let image = NormalizedImage::from_rgba(
            2,
            1,
            vec![0.1, 2.0, 0.0, 1.0, 0.5, 0.25, 3.0, 1.0],
        )
        .unwrap();

        let extrema = TextureRangeScanner.scan(&image).unwrap();

        assert_eq!(extrema.min, [0.1, 0.25, 0.0]);
        assert_eq!(extrema.max, [0.5, 2.0, 3.0]);
        assert_eq!(extrema.peak(), 3.0);
    }

    #[test]
    fn empty_image_has_zero_range() {
        let image = NormalizedImage::from_rgba(0, 0, Vec::new()).unwrap();
        let extrema = TextureRangeScanner.scan(&image).unwrap();
        assert_eq!(extrema.max, [0.0; 3]);
    }

    #[test]
    fn peak_propagates_nan() {
        let extrema = ChannelExtrema {
            min: [0.0; 3],
            max: [1.0, f32::NAN, 4.0],
        };
        assert!(extrema.peak().is_nan());
    }
}
