use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use pds_hdr_rs::image_pipeline::{ConversionConfig, RasterToHdrPipeline, TiffCompression};
use pds_hdr_rs::logger;

use tracing::info;

#[derive(Parser)]
#[command(name = "pds-hdr")]
#[command(version, about = "Convert VICAR/PDS rasters into gain-map HDR JPEGs")]
struct Cli {
    /// VICAR file, optionally wrapped in a PDS3 label
    input: PathBuf,

    /// Output JPEG with embedded gain map
    output: PathBuf,

    /// Exposure multiplier applied before HDR encoding
    #[arg(short, long, default_value_t = 1.0)]
    boost: f32,

    /// Also write the linear image as a 32-bit float TIFF
    #[arg(long, value_name = "PATH")]
    linear_tiff: Option<PathBuf>,

    /// Compression for --linear-tiff
    #[arg(long, value_enum, default_value_t = CompressionArg::None)]
    tiff_compression: CompressionArg,

    /// Largest accepted width or height
    #[arg(long)]
    max_dimension: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum CompressionArg {
    None,
    Lzw,
    DeflateFast,
    DeflateBalanced,
    DeflateBest,
}

impl From<CompressionArg> for TiffCompression {
    fn from(arg: CompressionArg) -> Self {
        match arg {
            CompressionArg::None => TiffCompression::None,
            CompressionArg::Lzw => TiffCompression::Lzw,
            CompressionArg::DeflateFast => TiffCompression::DeflateFast,
            CompressionArg::DeflateBalanced => TiffCompression::DeflateBalanced,
            CompressionArg::DeflateBest => TiffCompression::DeflateBest,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    info!("Starting pds-hdr...");

    let config = ConversionConfig::builder()
        .boost(cli.boost)
        .max_dimension(cli.max_dimension)
        .tiff_compression(cli.tiff_compression.into())
        .build();
    let pipeline = RasterToHdrPipeline::new(config);

    info!("Exposure boost: {}", pipeline.config().effective_boost());
    if let Some(path) = &cli.linear_tiff {
        info!(
            "Linear TIFF export: {} ({:?})",
            path.display(),
            pipeline.config().tiff_compression
        );
    }

    pipeline
        .convert_file(&cli.input, &cli.output, cli.linear_tiff.as_deref())
        .with_context(|| format!("failed to convert {}", cli.input.display()))?;

    info!("Conversion successful!");
    Ok(())
}
