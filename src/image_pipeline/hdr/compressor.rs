use anyhow::{anyhow, ensure, Result};
use jpeg_encoder::{ColorType, Encoder};

use crate::image_pipeline::hdr::types::{Bitmap, CompressOptions, ImageFormat};

/// Compresses one RGBA bitmap. Called from two threads at once during an
/// HDR encode.
pub trait Compressor: Sync {
    fn compress(&self, bitmap: &Bitmap, options: &CompressOptions) -> Result<Vec<u8>>;
}

/// Baseline JPEG compressor. Alpha is dropped.
pub struct JpegCompressor;

impl Compressor for JpegCompressor {
    fn compress(&self, bitmap: &Bitmap, options: &CompressOptions) -> Result<Vec<u8>> {
        match options.format {
            ImageFormat::Jpeg => compress_jpeg(bitmap, options),
        }
    }
}

fn compress_jpeg(bitmap: &Bitmap, options: &CompressOptions) -> Result<Vec<u8>> {
    let width = jpeg_dimension(bitmap.width(), "width")?;
    let height = jpeg_dimension(bitmap.height(), "height")?;
    ensure!(
        bitmap.pixels().len() == bitmap.width() * bitmap.height() * 4,
        "bitmap holds {} bytes, expected {}x{} RGBA",
        bitmap.pixels().len(),
        bitmap.width(),
        bitmap.height()
    );

    let rgb = rgb_rows(bitmap, options.flip_y);
    let mut buffer = Vec::new();
    let encoder = Encoder::new(&mut buffer, jpeg_quality(options.quality));
    encoder
        .encode(&rgb, width, height, ColorType::Rgb)
        .map_err(|e: jpeg_encoder::EncodingError| anyhow!("JPEG encoding failed: {}", e))?;

    Ok(buffer)
}

fn jpeg_dimension(value: usize, name: &str) -> Result<u16> {
    u16::try_from(value)
        .ok()
        .filter(|&v| v > 0)
        .ok_or_else(|| anyhow!("{} {} outside JPEG range 1..={}", name, value, u16::MAX))
}

/// Maps `[0, 1]` quality onto the encoder's 1..=100 scale.
fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

fn rgb_rows(bitmap: &Bitmap, flip_y: bool) -> Vec<u8> {
    let row_len = bitmap.width() * 4;
    let mut rgb = Vec::with_capacity(bitmap.width() * bitmap.height() * 3);
    let mut append = |row: &[u8]| {
        for px in row.chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
        }
    };

    let rows = bitmap.pixels().chunks_exact(row_len);
    if flip_y {
        rows.rev().for_each(&mut append);
    } else {
        rows.for_each(&mut append);
    }
    rgb
}
