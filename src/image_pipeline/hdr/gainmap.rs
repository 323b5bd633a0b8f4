//! Gain map computation
//!
//! The base rendition is an extended-Reinhard tone map of the HDR input,
//! sRGB encoded to 8 bits. The gain map stores, per channel, the log2 ratio
//! between HDR and SDR values normalized into `[log2 min_boost, log2 max_boost]`.

use anyhow::{bail, ensure, Result};

use crate::image_pipeline::hdr::types::{GainMapEncoding, GainMapMetadata, GainMapParams, RgbaRaster};
use crate::image_pipeline::normalize::{NormalizedImage, CHANNELS};

pub trait GainMapEncoder {
    /// Splits `image` into an SDR base image and a gain map covering boosts up
    /// to `max_content_boost`.
    fn encode(&self, image: &NormalizedImage, max_content_boost: f32) -> Result<GainMapEncoding>;

    /// Reconstruction metadata for a gain map computed with `params`.
    fn metadata(&self, params: &GainMapParams) -> Result<GainMapMetadata>;
}

/// Tone-mapped RGB gain map encoder.
#[derive(Debug, Clone)]
pub struct ToneMappedGainMapEncoder {
    pub min_content_boost: f32,
    pub gamma: f32,
    pub offset_sdr: f32,
    pub offset_hdr: f32,
}

impl Default for ToneMappedGainMapEncoder {
    fn default() -> Self {
        Self {
            min_content_boost: 1.0,
            gamma: 1.0,
            offset_sdr: 1.0 / 64.0,
            offset_hdr: 1.0 / 64.0,
        }
    }
}

impl GainMapEncoder for ToneMappedGainMapEncoder {
    fn encode(&self, image: &NormalizedImage, max_content_boost: f32) -> Result<GainMapEncoding> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            bail!("cannot compute a gain map for an empty {}x{} image", width, height);
        }
        if !max_content_boost.is_finite() || max_content_boost <= 0.0 {
            bail!("invalid max content boost {}", max_content_boost);
        }
        ensure!(
            self.min_content_boost > 0.0 && self.gamma > 0.0,
            "invalid encoder settings: min boost {}, gamma {}",
            self.min_content_boost,
            self.gamma
        );

        let params = GainMapParams {
            min_content_boost: self.min_content_boost,
            max_content_boost: max_content_boost.max(self.min_content_boost),
            gamma: self.gamma,
            offset_sdr: self.offset_sdr,
            offset_hdr: self.offset_hdr,
        };

        let log_min = params.min_content_boost.log2();
        let log_range = params.max_content_boost.log2() - log_min;
        // The tone curve keeps max_content_boost at SDR white.
        let white = params.max_content_boost.max(1.0);

        let mut sdr = vec![0u8; width * height * 4];
        let mut gain_map = vec![0u8; width * height * 4];
        let pixels = image.pixels();

        for y in 0..height {
            // Bottom-up output rows, as read back from a framebuffer
            let out_row = height - 1 - y;
            for x in 0..width {
                let src = (y * width + x) * CHANNELS;
                let dst = (out_row * width + x) * 4;

                for c in 0..3 {
                    let hdr = pixels[src + c].max(0.0);
                    let sdr_linear = reinhard_extended(hdr, white);
                    sdr[dst + c] = to_byte(srgb_oetf(sdr_linear));

                    let gain = (hdr + params.offset_hdr) / (sdr_linear + params.offset_sdr);
                    let normalized = if log_range > 0.0 {
                        ((gain.log2() - log_min) / log_range).clamp(0.0, 1.0)
                    } else {
                        0.0
                    };
                    gain_map[dst + c] = to_byte(normalized.powf(params.gamma));
                }
                sdr[dst + 3] = u8::MAX;
                gain_map[dst + 3] = u8::MAX;
            }
        }

        Ok(GainMapEncoding {
            sdr: RgbaRaster {
                width,
                height,
                data: sdr,
            },
            gain_map: RgbaRaster {
                width,
                height,
                data: gain_map,
            },
            params,
        })
    }

    fn metadata(&self, params: &GainMapParams) -> Result<GainMapMetadata> {
        ensure!(
            params.min_content_boost > 0.0 && params.max_content_boost >= params.min_content_boost,
            "invalid content boost range {}..{}",
            params.min_content_boost,
            params.max_content_boost
        );

        let min = params.min_content_boost.log2();
        let max = params.max_content_boost.log2();
        Ok(GainMapMetadata {
            gain_map_min: [min; 3],
            gain_map_max: [max; 3],
            gamma: [params.gamma; 3],
            offset_sdr: [params.offset_sdr; 3],
            offset_hdr: [params.offset_hdr; 3],
            hdr_capacity_min: min.max(0.0),
            hdr_capacity_max: max,
        })
    }
}

/// Extended Reinhard: `l * (1 + l / white²) / (1 + l)`, maps `white` to 1.
fn reinhard_extended(l: f32, white: f32) -> f32 {
    l * (1.0 + l / (white * white)) / (1.0 + l)
}

fn srgb_oetf(linear: f32) -> f32 {
    if linear <= 0.0031308 {
        linear * 12.92
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    }
}

fn to_byte(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(width: usize, height: usize, rgb: &[[f32; 3]]) -> NormalizedImage {
        let pixels = rgb.iter().flat_map(|p| [p[0], p[1], p[2], 1.0]).collect();
        NormalizedImage::from_rgba(width, height, pixels).unwrap()
    }

    #[test]
    fn unit_boost_is_identity_tone_map_with_flat_gain() {
        let input = image(2, 1, &[[0.0, 0.5, 1.0], [0.25, 0.25, 0.25]]);
        let encoding = ToneMappedGainMapEncoder::default().encode(&input, 1.0).unwrap();

        assert_eq!(encoding.params.max_content_boost, 1.0);
        assert!(encoding.gain_map.data.chunks_exact(4).all(|px| px == [0, 0, 0, 255]));
        // white stays white, black stays black
        assert_eq!(&encoding.sdr.data[0..4], &[0, 188, 255, 255]);
    }

    #[test]
    fn peak_maps_to_sdr_white_and_full_gain() {
        let input = image(2, 1, &[[4.0, 4.0, 4.0], [0.0, 0.0, 0.0]]);
        let encoding = ToneMappedGainMapEncoder::default().encode(&input, 4.0).unwrap();

        assert_eq!(&encoding.sdr.data[0..3], &[255, 255, 255]);
        assert_eq!(&encoding.sdr.data[4..7], &[0, 0, 0]);
        // (4 + 1/64) / (1 + 1/64) is just under the max boost
        assert!(encoding.gain_map.data[0] >= 250);
        assert_eq!(encoding.gain_map.data[4], 0);
    }

    #[test]
    fn rows_are_written_bottom_up() {
        let input = image(1, 2, &[[1.0, 1.0, 1.0], [0.0, 0.0, 0.0]]);
        let encoding = ToneMappedGainMapEncoder::default().encode(&input, 1.0).unwrap();

        assert_eq!(&encoding.sdr.data[0..4], &[0, 0, 0, 255]);
        assert_eq!(&encoding.sdr.data[4..8], &[255, 255, 255, 255]);
    }

    #[test]
    fn rejects_invalid_boost_and_empty_image() {
        let encoder = ToneMappedGainMapEncoder::default();
        let input = image(1, 1, &[[1.0, 1.0, 1.0]]);
        assert!(encoder.encode(&input, f32::NAN).is_err());
        assert!(encoder.encode(&input, 0.0).is_err());

        let empty = NormalizedImage::from_rgba(0, 0, Vec::new()).unwrap();
        assert!(encoder.encode(&empty, 2.0).is_err());
    }

    #[test]
    fn metadata_is_log2_encoded() {
        let encoder = ToneMappedGainMapEncoder::default();
        let input = image(1, 1, &[[8.0, 2.0, 1.0]]);
        let encoding = encoder.encode(&input, 8.0).unwrap();
        let metadata = encoder.metadata(&encoding.params).unwrap();

        assert_eq!(metadata.gain_map_min, [0.0; 3]);
        assert_eq!(metadata.gain_map_max, [3.0; 3]);
        assert_eq!(metadata.gamma, [1.0; 3]);
        assert_eq!(metadata.offset_sdr, [1.0 / 64.0; 3]);
        assert_eq!(metadata.hdr_capacity_min, 0.0);
        assert_eq!(metadata.hdr_capacity_max, 3.0);
    }
}
