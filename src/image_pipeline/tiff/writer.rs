use std::io::Write;
use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::normalize::NormalizedImage;
use crate::image_pipeline::tiff::types::TiffCompression;

pub trait LinearTiffWriter {
    fn write_linear_tiff(&self, image: &NormalizedImage, output: &mut dyn Write, compression: TiffCompression) -> Result<()>;
}
