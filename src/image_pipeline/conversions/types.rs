//! Conversion configuration types

use tracing::warn;

use crate::image_pipeline::tiff::TiffCompression;

/// Configuration for raster to HDR conversion
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    /// Exposure multiplier applied to the normalized image before encoding
    pub boost: f32,
    /// Whether to validate image dimensions before conversion
    pub validate_dimensions: bool,
    /// Largest accepted width or height when validating
    pub max_dimension: Option<usize>,
    /// Compression for the optional linear TIFF export
    pub tiff_compression: TiffCompression,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            boost: 1.0,
            validate_dimensions: true,
            max_dimension: None,
            tiff_compression: TiffCompression::None,
        }
    }
}

impl ConversionConfig {
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder::default()
    }

    /// The configured boost, or 1.0 when it is not a positive finite number.
    pub fn effective_boost(&self) -> f32 {
        if self.boost.is_finite() && self.boost > 0.0 {
            self.boost
        } else {
            warn!("Ignoring invalid exposure boost {}, using 1.0", self.boost);
            1.0
        }
    }
}

/// Builder for ConversionConfig
#[derive(Default)]
pub struct ConversionConfigBuilder {
    boost: Option<f32>,
    validate_dimensions: Option<bool>,
    max_dimension: Option<Option<usize>>,
    tiff_compression: Option<TiffCompression>,
}

impl ConversionConfigBuilder {
    pub fn boost(mut self, boost: f32) -> Self {
        self.boost = Some(boost);
        self
    }

    pub fn validate_dimensions(mut self, validate: bool) -> Self {
        self.validate_dimensions = Some(validate);
        self
    }

    pub fn max_dimension(mut self, max_dimension: Option<usize>) -> Self {
        self.max_dimension = Some(max_dimension);
        self
    }

    pub fn tiff_compression(mut self, compression: TiffCompression) -> Self {
        self.tiff_compression = Some(compression);
        self
    }

    pub fn build(self) -> ConversionConfig {
        let default = ConversionConfig::default();
        ConversionConfig {
            boost: self.boost.unwrap_or(default.boost),
            validate_dimensions: self.validate_dimensions.unwrap_or(default.validate_dimensions),
            max_dimension: self.max_dimension.unwrap_or(default.max_dimension),
            tiff_compression: self.tiff_compression.unwrap_or(default.tiff_compression),
        }
    }
}
