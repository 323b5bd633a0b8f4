use tracing::{debug, info, instrument};
use std::io::Write;
use std::path::Path;

use crate::image_pipeline::{
    common::error::{ConversionError, Result},
    conversions::types::ConversionConfig,
    hdr::{EncodedHdr, HdrEncode, HdrEncoder},
    normalize::{NormalizedImage, RasterNormalizer},
    raster::{RasterReader, VicarReader},
    tiff::{LinearTiffWriter, StandardTiffWriter},
};

pub struct RasterToHdrPipeline<R: RasterReader, E: HdrEncode, W: LinearTiffWriter> {
    reader: R,
    normalizer: RasterNormalizer,
    encoder: E,
    tiff_writer: W,
    config: ConversionConfig,
}

impl RasterToHdrPipeline<VicarReader, HdrEncoder, StandardTiffWriter> {
    pub fn new(config: ConversionConfig) -> Self {
        Self {
            reader: VicarReader,
            normalizer: RasterNormalizer,
            encoder: HdrEncoder::new(),
            tiff_writer: StandardTiffWriter,
            config,
        }
    }
}

impl<R: RasterReader, E: HdrEncode, W: LinearTiffWriter> RasterToHdrPipeline<R, E, W> {
    pub fn with_custom(reader: R, encoder: E, tiff_writer: W, config: ConversionConfig) -> Self {
        Self {
            reader,
            normalizer: RasterNormalizer,
            encoder,
            tiff_writer,
            config,
        }
    }

    fn validate_dimensions(&self, width: usize, height: usize) -> Result<()> {
        if !self.config.validate_dimensions {
            return Ok(());
        }

        if width == 0 || height == 0 {
            return Err(ConversionError::InvalidDimensions(width, height));
        }

        if let Some(max) = self.config.max_dimension {
            if width > max || height > max {
                return Err(ConversionError::InvalidDimensions(width, height));
            }
        }

        Ok(())
    }

    /// Reads and normalizes a raster file, then applies the exposure boost.
    #[instrument(skip(self, input_data), fields(input_size = input_data.len()))]
    pub fn decode(&self, input_data: &[u8]) -> Result<NormalizedImage> {
        let raster = {
            let _span = tracing::info_span!("decode_raster").entered();
            self.reader.read_raster(input_data)?
        };

        {
            let _span = tracing::info_span!("validate_dimensions",
                width = raster.width,
                height = raster.height
            ).entered();
            self.validate_dimensions(raster.width, raster.height)?;
        }

        let image = {
            let _span = tracing::info_span!("normalize").entered();
            self.normalizer.normalize(&raster)?
        };
        drop(raster);

        let boost = self.config.effective_boost();
        if boost == 1.0 {
            return Ok(image);
        }

        debug!("Applying exposure boost {}", boost);
        Ok(image.boosted(boost))
    }

    pub fn encode(&self, image: NormalizedImage) -> Result<EncodedHdr> {
        Ok(self.encoder.encode(image)?)
    }

    #[instrument(skip(self, image, output), fields(width = image.width(), height = image.height()))]
    pub fn export_linear_tiff(&self, image: &NormalizedImage, output: &mut dyn Write) -> Result<()> {
        self.tiff_writer.write_linear_tiff(image, output, self.config.tiff_compression)
    }

    #[instrument(skip(self, input_data, output), fields(input_size = input_data.len()))]
    pub fn convert(&self, input_data: &[u8], output: &mut dyn Write) -> Result<()> {
        info!("Starting raster to HDR conversion");

        let image = self.decode(input_data)?;
        let (width, height) = (image.width(), image.height());

        let encoded = self.encode(image)?;

        {
            let _span = tracing::info_span!("write_output", bytes = encoded.len()).entered();
            output.write_all(encoded.as_bytes())?;
        }

        info!(width, height, "Conversion complete");
        Ok(())
    }

    /// Converts `input_path` to a gain-map JPEG at `output_path`. When
    /// `linear_tiff_path` is given, the boosted linear image is also written
    /// there as a float TIFF. Neither file is created when decoding or
    /// encoding fails.
    #[instrument(skip(self, input_path, output_path, linear_tiff_path))]
    pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: Q,
        linear_tiff_path: Option<&Path>,
    ) -> Result<()> {
        let input_path = input_path.as_ref();
        let output_path = output_path.as_ref();

        info!(
            input = %input_path.display(),
            output = %output_path.display(),
            "Converting file"
        );

        let input_data = {
            let _span = tracing::info_span!("read_input_file").entered();
            std::fs::read(input_path).map_err(|e| {
                ConversionError::InputReadError(format!("{}: {}", input_path.display(), e))
            })?
        };

        let image = self.decode(&input_data)?;
        drop(input_data);

        // Nothing touches the filesystem until the HDR encode has succeeded.
        let linear_tiff = match linear_tiff_path {
            Some(tiff_path) => {
                let mut buffer = Vec::new();
                self.export_linear_tiff(&image, &mut buffer)?;
                Some((tiff_path, buffer))
            }
            None => None,
        };

        let encoded = self.encode(image)?;

        if let Some((tiff_path, buffer)) = linear_tiff {
            write_output(tiff_path, &buffer)?;
        }
        write_output(output_path, encoded.as_bytes())?;

        info!(bytes = encoded.len(), "Conversion complete");
        Ok(())
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ConversionConfig) {
        self.config = config;
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    let _span = tracing::info_span!("write_output_file", path = %path.display(), bytes = bytes.len()).entered();
    std::fs::write(path, bytes).map_err(|e| {
        ConversionError::OutputWriteError(format!("{}: {}", path.display(), e))
    })
}
