use std::io::Write;
use tracing::debug;
use crate::image_pipeline::common::error::{Result, ConversionError};
use crate::image_pipeline::normalize::{NormalizedImage, CHANNELS};
use crate::image_pipeline::tiff::types::TiffCompression;
use crate::image_pipeline::tiff::writer::LinearTiffWriter;

/// Writes the color channels of a normalized image as RGB32Float. Alpha is
/// constant and dropped.
pub struct StandardTiffWriter;

impl LinearTiffWriter for StandardTiffWriter {
    fn write_linear_tiff(&self, image: &NormalizedImage, output: &mut dyn Write, compression: TiffCompression) -> Result<()> {
        debug!("Encoding linear TIFF image: {}x{}", image.width(), image.height());

        let width = u32::try_from(image.width())
            .map_err(|_| ConversionError::InvalidDimensions(image.width(), image.height()))?;
        let height = u32::try_from(image.height())
            .map_err(|_| ConversionError::InvalidDimensions(image.width(), image.height()))?;

        let rgb: Vec<f32> = image
            .pixels()
            .chunks_exact(CHANNELS)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();

        let mut buffer = Vec::new();

        let compression = match compression {
            TiffCompression::None => tiff::encoder::Compression::Uncompressed,
            TiffCompression::Lzw => tiff::encoder::Compression::Lzw,
            TiffCompression::DeflateFast => tiff::encoder::Compression::Deflate(tiff::encoder::compression::DeflateLevel::Fast),
            TiffCompression::DeflateBalanced => tiff::encoder::Compression::Deflate(tiff::encoder::compression::DeflateLevel::Balanced),
            TiffCompression::DeflateBest => tiff::encoder::Compression::Deflate(tiff::encoder::compression::DeflateLevel::Best),
        };

        let mut encoder = tiff::encoder::TiffEncoder::new(std::io::Cursor::new(&mut buffer))
            .map_err(|e| ConversionError::TiffEncodeError(e.to_string()))?
            .with_compression(compression);

        encoder.write_image::<tiff::encoder::colortype::RGB32Float>(
            width,
            height,
            &rgb,
        ).map_err(|e| ConversionError::TiffEncodeError(e.to_string()))?;

        output.write_all(&buffer)?;

        debug!("TIFF encoding complete: {} bytes", buffer.len());
        Ok(())
    }
}
