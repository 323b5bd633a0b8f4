use std::io;
use std::thread;

use tracing::{debug, info, info_span, instrument, Span};

use crate::image_pipeline::common::error::{EncodeStage, EncodingError};
use crate::image_pipeline::hdr::compressor::{Compressor, JpegCompressor};
use crate::image_pipeline::hdr::container::{ContainerEmbedder, UltraHdrEmbedder};
use crate::image_pipeline::hdr::gainmap::{GainMapEncoder, ToneMappedGainMapEncoder};
use crate::image_pipeline::hdr::range::{RangeScanner, TextureRangeScanner};
use crate::image_pipeline::hdr::types::{Bitmap, ChannelExtrema, CompressOptions, EncodedHdr, GainMapEncoding};
use crate::image_pipeline::normalize::NormalizedImage;

type PlaneResults = (anyhow::Result<Vec<u8>>, anyhow::Result<Vec<u8>>);

/// Encodes a normalized image into a gain-map JPEG.
pub trait HdrEncode {
    fn encode(&self, image: NormalizedImage) -> Result<EncodedHdr, EncodingError>;
}

/// Gain-map JPEG encoder built from four collaborators: range discovery,
/// gain map computation, image compression and container embedding.
pub struct HdrEncoder<
    S = TextureRangeScanner,
    G = ToneMappedGainMapEncoder,
    C = JpegCompressor,
    E = UltraHdrEmbedder,
> {
    scanner: S,
    gain_map: G,
    compressor: C,
    embedder: E,
}

impl HdrEncoder {
    pub fn new() -> Self {
        Self {
            scanner: TextureRangeScanner,
            gain_map: ToneMappedGainMapEncoder::default(),
            compressor: JpegCompressor,
            embedder: UltraHdrEmbedder,
        }
    }
}

impl Default for HdrEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, G, C, E> HdrEncoder<S, G, C, E>
where
    S: RangeScanner,
    G: GainMapEncoder,
    C: Compressor,
    E: ContainerEmbedder,
{
    pub fn with_custom(scanner: S, gain_map: G, compressor: C, embedder: E) -> Self {
        Self {
            scanner,
            gain_map,
            compressor,
            embedder,
        }
    }

    /// Compresses both planes concurrently and waits for both. When both fail
    /// the SDR error is reported.
    fn compress_planes(&self, sdr: &Bitmap, gain_map: &Bitmap) -> Result<(Vec<u8>, Vec<u8>), EncodingError> {
        let options = CompressOptions::HDR_PLANE;
        let parent = Span::current();
        // Only the compressor crosses into the worker thread.
        let compressor = &self.compressor;

        let (sdr_result, gain_map_result) = thread::scope(|scope| -> Result<PlaneResults, EncodingError> {
            let gain_map_worker = thread::Builder::new()
                .name("compress_gain_map".to_string())
                .spawn_scoped(scope, || {
                    let _span = info_span!(parent: &parent, "compress_gain_map").entered();
                    compressor.compress(gain_map, &options)
                })
                .map_err(spawn_failed)?;

            let sdr_result = {
                let _span = info_span!("compress_sdr").entered();
                compressor.compress(sdr, &options)
            };
            let gain_map_result = gain_map_worker
                .join()
                .unwrap_or_else(|_| Err(anyhow::anyhow!("gain map compression worker panicked")));

            Ok((sdr_result, gain_map_result))
        })?;

        let sdr_jpeg = sdr_result.map_err(|e| EncodingError::new(EncodeStage::Compression, e))?;
        let gain_map_jpeg = gain_map_result.map_err(|e| EncodingError::new(EncodeStage::Compression, e))?;
        Ok((sdr_jpeg, gain_map_jpeg))
    }
}

fn spawn_failed(err: io::Error) -> EncodingError {
    EncodingError::new(
        EncodeStage::Compression,
        io::Error::new(err.kind(), format!("cannot start gain map compression thread: {}", err)),
    )
}

impl<S, G, C, E> HdrEncode for HdrEncoder<S, G, C, E>
where
    S: RangeScanner,
    G: GainMapEncoder,
    C: Compressor,
    E: ContainerEmbedder,
{
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    fn encode(&self, image: NormalizedImage) -> Result<EncodedHdr, EncodingError> {
        info!("Starting HDR encode");

        let extrema = {
            let _span = info_span!("range_discovery").entered();
            self.scanner
                .scan(&image)
                .map_err(|e| EncodingError::new(EncodeStage::RangeDiscovery, e))?
        };
        let boost = max_content_boost(&extrema);
        debug!("Channel extrema {:?}, max content boost {}", extrema, boost);

        let encoding = {
            let _span = info_span!("gain_map").entered();
            self.gain_map
                .encode(&image, boost)
                .map_err(|e| EncodingError::new(EncodeStage::GainMap, e))?
        };
        drop(image);

        let GainMapEncoding { sdr, gain_map, params } = encoding;
        let sdr = Bitmap::from(sdr);
        let gain_map = Bitmap::from(gain_map);
        let (sdr_jpeg, gain_map_jpeg) = self.compress_planes(&sdr, &gain_map)?;
        debug!(
            "Compressed SDR to {} bytes, gain map to {} bytes",
            sdr_jpeg.len(),
            gain_map_jpeg.len()
        );
        drop((sdr, gain_map));

        let metadata = {
            let _span = info_span!("metadata").entered();
            self.gain_map
                .metadata(&params)
                .map_err(|e| EncodingError::new(EncodeStage::Metadata, e))?
        };

        let bytes = {
            let _span = info_span!("embed").entered();
            self.embedder
                .embed(&params, &metadata, &sdr_jpeg, &gain_map_jpeg)
                .map_err(|e| EncodingError::new(EncodeStage::Embedding, e))?
        };

        info!("HDR encode complete: {} bytes", bytes.len());
        Ok(EncodedHdr::new(bytes))
    }
}

/// Largest channel maximum, or 1.0 when that is zero or NaN.
pub fn max_content_boost(extrema: &ChannelExtrema) -> f32 {
    let peak = extrema.peak();
    if peak == 0.0 || peak.is_nan() { 1.0 } else { peak }
}
